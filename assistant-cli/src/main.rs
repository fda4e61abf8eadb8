// ABOUTME: Interactive SQL assistant - RLS policy chat plus one-shot SQL commands.
// ABOUTME: Demonstrates capping a growing conversation to the model's context window.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use ai_commands::command::{CommandStream, rls_preamble};
use ai_commands::prelude::*;

// ============================================================================
// Input Parsing
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Chat(&'a str),
    Sql(&'a str),
    Title(&'a str),
    Schema(&'a str),
    Tokens,
    Reset,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if !line.starts_with('/') {
        if line == "quit" || line == "exit" {
            return Input::Quit;
        }
        return Input::Chat(line);
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "/sql" if !rest.is_empty() => Input::Sql(rest),
        "/title" if !rest.is_empty() => Input::Title(rest),
        "/schema" if !rest.is_empty() => Input::Schema(rest),
        "/tokens" => Input::Tokens,
        "/reset" => Input::Reset,
        "/help" => Input::Help,
        "/quit" | "/exit" => Input::Quit,
        _ => Input::Unknown(command),
    }
}

/// Split a schema file into table definitions on blank lines.
fn load_definitions(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    Ok(text
        .split("\n\n")
        .map(str::trim)
        .filter(|definition| !definition.is_empty())
        .map(str::to_string)
        .collect())
}

const HELP: &str = "\
Type a message to discuss a row level security policy.
  /sql <prompt>     generate SQL from a description
  /title <sql>      title and describe a SQL snippet
  /schema <file>    load table definitions (separated by blank lines)
  /tokens           show the size of the next request
  /reset            forget the conversation
  /quit             exit";

// ============================================================================
// Session
// ============================================================================

struct Session {
    config: Config,
    client: OpenAIClient,
    tokenizer: Tokenizer<'static>,
    history: Vec<ChatMessage>,
    definitions: Option<Vec<String>>,
}

impl Session {
    fn new(config: Config) -> Result<Self> {
        let tokenizer = Tokenizer::for_profile(&config.profile)?;
        let client = OpenAIClient::new(config.api_key.clone());
        Ok(Self {
            config,
            client,
            tokenizer,
            history: Vec::new(),
            definitions: None,
        })
    }

    async fn chat(&mut self, text: &str) -> Result<()> {
        self.history.push(ChatMessage::user(text));

        let chat = chat_rls_policy(
            &self.client,
            &self.tokenizer,
            &self.config.profile,
            &self.config.model,
            &self.history,
            self.definitions.as_deref(),
            None,
        );
        if chat.evicted > 0 {
            println!("[dropped {} oldest messages to fit the context window]", chat.evicted);
        }

        match stream_reply(chat.stream).await {
            Ok(reply) => {
                self.history.push(ChatMessage::assistant(reply));
                Ok(())
            }
            Err(e) => {
                self.history.pop();
                Err(e.into())
            }
        }
    }

    async fn generate(&self, prompt: &str) -> Result<()> {
        let definitions = self.definitions.clone().unwrap_or_default();
        let result = generate_sql(&self.client, &self.config.model, prompt, &definitions).await?;
        println!("\n-- {}\n{}\n", result.title, result.sql);
        Ok(())
    }

    async fn title(&self, sql: &str) -> Result<()> {
        let result = title_sql(&self.client, &self.config.model, sql).await?;
        println!("\n{}\n{}\n", result.title, result.description);
        Ok(())
    }

    fn tokens(&self) {
        let preamble = rls_preamble(self.definitions.as_deref(), None);
        let capped = cap_messages(
            &self.tokenizer,
            &preamble,
            &self.history,
            ai_commands::command::RLS_MAX_COMPLETION_TOKENS,
            &self.config.profile,
        );
        println!(
            "{} / {} tokens ({} messages kept, {} dropped){}",
            capped.token_count(),
            self.config.profile.max_context_tokens,
            capped.conversation().len(),
            capped.evicted(),
            if capped.fits() { "" } else { " - over budget" }
        );
    }
}

/// Print reply deltas as they arrive and return the full text.
///
/// A reply cut off before the provider finished is an error, so a partial
/// answer never enters the history.
async fn stream_reply(stream: CommandStream) -> Result<String, CommandError> {
    println!();
    let reply = collect_text_with(stream, |text| {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    })
    .await;
    println!("\n");
    reply
}

// ============================================================================
// REPL
// ============================================================================

async fn run(mut session: Session) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!(
        "SQL Assistant ({}) - Type /help for commands, /quit to exit.\n",
        session.config.model
    );

    loop {
        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.trim());

        let outcome = match parse_input(&line) {
            Input::Quit => break,
            Input::Help => {
                println!("{}\n", HELP);
                Ok(())
            }
            Input::Reset => {
                session.history.clear();
                println!("Conversation cleared.\n");
                Ok(())
            }
            Input::Tokens => {
                session.tokens();
                Ok(())
            }
            Input::Schema(path) => load_definitions(Path::new(path)).map(|definitions| {
                println!("Loaded {} table definitions.\n", definitions.len());
                session.definitions = Some(definitions);
            }),
            Input::Sql(prompt) => session.generate(prompt).await,
            Input::Title(sql) => session.title(sql).await,
            Input::Chat(text) => session.chat(text).await,
            Input::Unknown(command) => {
                println!("Unknown command {}. Type /help.\n", command);
                Ok(())
            }
        };

        if let Err(e) = outcome {
            eprintln!("Error: {:#}\n", e);
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env().context("invalid configuration")?;
    tracing::info!(model = %config.model, max_context_tokens = config.profile.max_context_tokens, "starting");

    run(Session::new(config)?).await
}
