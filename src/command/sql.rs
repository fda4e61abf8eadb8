// ABOUTME: SQL commands - generate, edit, debug, and title Postgres SQL.
// ABOUTME: Each forces a single function call and parses its JSON arguments.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::repair::parse_arguments;
use crate::error::CommandError;
use crate::llm::{ChatMessage, LlmClient, Request, ToolDefinition};

const SQL_GUIDELINES: &str = "\
- For primary keys, always use \"id bigint primary key generated always as identity\" (not serial)
- Prefer creating foreign key references in the create statement
- Prefer 'text' over 'varchar'
- Prefer 'timestamp with time zone' over 'date'
- Use vector(384) data type for any embedding/vector related query
- Always use double apostrophe in SQL strings (eg. 'Night''s watch')";

/// Result of [`generate_sql`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenerateSqlResult {
    pub sql: String,
    #[serde(default)]
    pub title: String,
}

/// Result of [`edit_sql`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EditSqlResult {
    pub sql: String,
}

/// Result of [`debug_sql`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DebugSqlResult {
    #[serde(default)]
    pub solution: String,
    pub sql: String,
}

/// Result of [`title_sql`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenerateTitleResult {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

fn string_property(description: &str) -> serde_json::Value {
    serde_json::json!({ "type": "string", "description": description })
}

fn object_schema(properties: &[(&str, String)]) -> serde_json::Value {
    let props: serde_json::Map<String, serde_json::Value> = properties
        .iter()
        .map(|(name, description)| (name.to_string(), string_property(description)))
        .collect();
    let required: Vec<&str> = properties.iter().map(|(name, _)| *name).collect();
    serde_json::json!({
        "type": "object",
        "properties": props,
        "required": required,
        "additionalProperties": false,
    })
}

/// Function definition for generating SQL from a prompt.
pub fn generate_sql_function() -> ToolDefinition {
    ToolDefinition {
        name: "generateSql".to_string(),
        description: "Generates Postgres SQL based on a natural language prompt".to_string(),
        input_schema: object_schema(&[
            (
                "sql",
                format!("The generated SQL (must be valid SQL).\n{}", SQL_GUIDELINES),
            ),
            (
                "title",
                "The title of the SQL.\n- Omit words like 'SQL', 'Postgres', or 'Query'".to_string(),
            ),
        ]),
    }
}

/// Function definition for editing SQL.
pub fn edit_sql_function() -> ToolDefinition {
    ToolDefinition {
        name: "editSql".to_string(),
        description: "Edits a Postgres SQL query based on the user's instructions".to_string(),
        input_schema: object_schema(&[(
            "sql",
            format!(
                "The modified SQL (must be valid SQL).\n- Assume the query hasn't been executed yet\n{}\n- Use real examples when possible\n- Add constraints if requested",
                SQL_GUIDELINES
            ),
        )]),
    }
}

/// Function definition for debugging SQL errors.
pub fn debug_sql_function() -> ToolDefinition {
    ToolDefinition {
        name: "debugSql".to_string(),
        description: format!(
            "Debugs a Postgres SQL error and modifies the SQL to fix it.\n- Create extensions if they are missing (only for valid extensions)\n- Suggest creating tables if they are missing\n- Include all of the original SQL\n{}",
            SQL_GUIDELINES
        ),
        input_schema: object_schema(&[
            (
                "solution",
                "A short suggested solution for the error (as concise as possible).".to_string(),
            ),
            (
                "sql",
                "The SQL rewritten to apply the solution. Includes all the original SQL.".to_string(),
            ),
        ]),
    }
}

/// Function definition for titling a SQL snippet.
pub fn generate_title_function() -> ToolDefinition {
    ToolDefinition {
        name: "generateTitle".to_string(),
        description: "Generates a short title and summarized description for a Postgres SQL snippet.\n\nThe description should describe why this table was created (eg. \"Table to track todos\")".to_string(),
        input_schema: object_schema(&[
            (
                "title",
                "The generated title for the SQL snippet (short and concise).\n- Omit these words: 'SQL', 'Postgres', 'Query', 'Database'".to_string(),
            ),
            (
                "description",
                "The generated description for the SQL snippet.".to_string(),
            ),
        ]),
    }
}

/// User message carrying table definitions, if there are any.
pub fn schema_message(entity_definitions: &[String]) -> Option<ChatMessage> {
    if entity_definitions.is_empty() {
        return None;
    }
    Some(ChatMessage::user(format!(
        "Here is my database schema for reference:\n{}",
        entity_definitions.join("\n\n")
    )))
}

/// Send a request forced onto `function` and parse the call's arguments.
async fn call_function<T: DeserializeOwned>(
    client: &dyn LlmClient,
    model: &str,
    messages: Vec<ChatMessage>,
    function: ToolDefinition,
    max_tokens: u32,
) -> Result<T, CommandError> {
    let name = function.name.clone();
    let request = Request::new(model)
        .messages(messages)
        .tool(function)
        .force_tool(&name)
        .max_tokens(max_tokens)
        .temperature(0.0);

    let response = client.create_message(&request).await?;

    let arguments = response
        .tool_calls
        .iter()
        .find(|call| call.name == name)
        .or_else(|| response.first_tool_call())
        .map(|call| call.arguments.trim())
        .filter(|arguments| !arguments.is_empty())
        .ok_or(CommandError::EmptyResponse)?;

    parse_arguments(arguments)
}

fn require_sql(sql: &str) -> Result<(), CommandError> {
    if sql.trim().is_empty() {
        Err(CommandError::EmptySql)
    } else {
        Ok(())
    }
}

/// Generate a SQL snippet and a title for it from a natural language prompt.
pub async fn generate_sql(
    client: &dyn LlmClient,
    model: &str,
    prompt: &str,
    entity_definitions: &[String],
) -> Result<GenerateSqlResult, CommandError> {
    let mut messages: Vec<ChatMessage> = schema_message(entity_definitions).into_iter().collect();
    messages.push(ChatMessage::user(prompt));

    let result: GenerateSqlResult =
        call_function(client, model, messages, generate_sql_function(), 1024).await?;
    require_sql(&result.sql)?;
    Ok(result)
}

/// Modify an existing SQL snippet following the prompt.
pub async fn edit_sql(
    client: &dyn LlmClient,
    model: &str,
    prompt: &str,
    sql: &str,
    entity_definitions: &[String],
) -> Result<EditSqlResult, CommandError> {
    let mut messages: Vec<ChatMessage> = schema_message(entity_definitions).into_iter().collect();
    messages.push(ChatMessage::user(format!("Here is my current SQL:\n{}", sql)));
    messages.push(ChatMessage::user(prompt));

    let result: EditSqlResult =
        call_function(client, model, messages, edit_sql_function(), 2048).await?;
    require_sql(&result.sql)?;
    Ok(result)
}

/// Suggest a fix for a SQL error, returning the corrected SQL.
pub async fn debug_sql(
    client: &dyn LlmClient,
    model: &str,
    error_message: &str,
    sql: &str,
    entity_definitions: &[String],
) -> Result<DebugSqlResult, CommandError> {
    let mut messages: Vec<ChatMessage> = schema_message(entity_definitions).into_iter().collect();
    messages.push(ChatMessage::user(format!("Here is my current SQL:\n{}", sql)));
    messages.push(ChatMessage::user(format!(
        "Here is the error I am getting:\n{}",
        error_message
    )));

    let result: DebugSqlResult =
        call_function(client, model, messages, debug_sql_function(), 2048).await?;
    require_sql(&result.sql)?;
    Ok(result)
}

/// Generate a title and description for a SQL snippet.
pub async fn title_sql(
    client: &dyn LlmClient,
    model: &str,
    sql: &str,
) -> Result<GenerateTitleResult, CommandError> {
    let messages = vec![ChatMessage::user(sql)];
    call_function(client, model, messages, generate_title_function(), 1024).await
}
