// ABOUTME: Integration tests verifying modules work together.
// ABOUTME: Runs the commands end to end against a local stand-in for the completion API.

use ai_commands::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

fn completions_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), COMPLETIONS_PATH)
}

/// Body of the single request the server received.
async fn sent_body(server: &MockServer) -> serde_json::Value {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    requests[0].body_json().unwrap()
}

#[tokio::test]
async fn test_generate_sql_over_http() {
    let body = json!({
        "id": "chatcmpl-1",
        "model": "gpt-3.5-turbo-1106",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {
                        "name": "generateSql",
                        "arguments": "{\"sql\":\"create table todos (id bigint primary key generated always as identity, task text not null);\",\"title\":\"Todos\"}"
                    }
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": {"prompt_tokens": 80, "completion_tokens": 30, "total_tokens": 110}
    });
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo-1106",
            "temperature": 0.0,
            "tool_choice": {"type": "function", "function": {"name": "generateSql"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAIClient::new("sk-test").with_base_url(completions_url(&server));
    let result = generate_sql(&client, "gpt-3.5-turbo-1106", "a todo table", &[])
        .await
        .unwrap();
    assert_eq!(result.title, "Todos");
    assert!(result.sql.contains("create table todos"));

    let sent = sent_body(&server).await;
    assert_eq!(sent["messages"][0]["content"], "a todo table");
    assert_eq!(sent["tools"][0]["function"]["name"], "generateSql");
}

#[tokio::test]
async fn test_context_length_error_over_http() {
    let body = json!({
        "error": {
            "message": "This model's maximum context length is 16385 tokens.",
            "type": "invalid_request_error",
            "param": "messages",
            "code": "context_length_exceeded"
        }
    });
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAIClient::new("sk-test").with_base_url(completions_url(&server));
    let err = title_sql(&client, "gpt-3.5-turbo-1106", "select 1;")
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::ContextLength));
}

#[tokio::test]
async fn test_rls_chat_streams_capped_request() {
    let chunks = [
        "Here is a policy:\\n\\n```sql\\ncreate policy \\\"Users can see their own favorite books\\\"\\n",
        "on favorite_books for select to authenticated\\nusing ((select auth.uid()) = user_id);\\n```",
    ];
    let mut body = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        body.push_str(&format!(
            "data: {{\"id\":\"c1\",\"model\":\"gpt-3.5-turbo-0301\",\"choices\":[{{\"index\":0,\"delta\":{{\"content\":\"{}\"}},\"finish_reason\":null}}]}}\n\n",
            chunk
        ));
        if i == 0 {
            body.push_str(": keep-alive\n\n");
        }
    }
    body.push_str("data: {\"id\":\"c1\",\"model\":\"gpt-3.5-turbo-0301\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n");
    body.push_str("data: [DONE]\n\n");
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let registry = ModelRegistry::builtin();
    let profile = registry.resolve("gpt-3.5-turbo").unwrap();
    let tokenizer = Tokenizer::for_profile(profile).unwrap();

    // Far more history than a 4097-token window can hold.
    let history: Vec<_> = (0..300)
        .map(|i| {
            if i % 2 == 0 {
                ChatMessage::user(format!("Request {}: only owners may read their favorite books", i))
            } else {
                ChatMessage::assistant(format!("Reply {}: use auth.uid() in the USING clause", i))
            }
        })
        .collect();
    let tables = vec![
        "create table favorite_books (id bigint primary key generated always as identity, user_id uuid references auth.users (id) not null, book_id bigint not null);".to_string(),
    ];

    let client = OpenAIClient::new("sk-test").with_base_url(completions_url(&server));
    let chat = chat_rls_policy(
        &client,
        &tokenizer,
        profile,
        "gpt-3.5-turbo-0301",
        &history,
        Some(&tables),
        None,
    );
    assert!(chat.evicted > 0);
    assert!(chat.token_count < profile.max_context_tokens);

    let reply = collect_text(chat.stream).await.unwrap();
    let sql = extract_markdown_sql(&reply);
    assert_eq!(sql.len(), 1);
    assert!(sql[0].contains("to authenticated"));

    let sent = sent_body(&server).await;
    let messages = sent["messages"].as_array().unwrap();
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages.len(), 2 + (history.len() - chat.evicted));
    assert_eq!(
        messages.last().unwrap()["content"],
        history.last().unwrap().content()
    );
}

#[test]
fn test_capped_request_fits_every_builtin_model() {
    let registry = ModelRegistry::builtin();
    let preamble = vec![ChatMessage::system("You write Postgres SQL.")];
    let history: Vec<_> = (0..2000)
        .map(|i| ChatMessage::user(format!("message number {} about tables and indexes", i)))
        .collect();

    for (model, profile) in registry.models() {
        let tokenizer = Tokenizer::for_profile(profile).unwrap();
        let capped = cap_messages(&tokenizer, &preamble, &history, 1024, profile);
        let total = tokenizer.count_request_tokens(capped.messages(), profile) + 1024;
        assert!(total < profile.max_context_tokens, "{} over budget", model);
        assert_eq!(capped.token_count(), total, "{} total mismatch", model);
    }
}

#[tokio::test]
async fn test_rls_chat_error_inside_stream() {
    let body = concat!(
        "data: {\"id\":\"c2\",\"model\":\"gpt-4\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Night\u{2019}s\"},\"finish_reason\":null}]}\n\n",
        "data: {\"error\":{\"message\":\"This model's maximum context length is 8192 tokens.\",\"type\":\"invalid_request_error\",\"code\":\"context_length_exceeded\"}}\n\n",
    );
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let registry = ModelRegistry::builtin();
    let profile = registry.resolve("gpt-4").unwrap();
    let tokenizer = Tokenizer::for_profile(profile).unwrap();
    let client = OpenAIClient::new("sk-test").with_base_url(completions_url(&server));
    let chat = chat_rls_policy(
        &client,
        &tokenizer,
        profile,
        "gpt-4",
        &[ChatMessage::user("Only managers can update salaries")],
        None,
        None,
    );

    let err = collect_text(chat.stream).await.unwrap_err();
    assert!(matches!(err, CommandError::ContextLength));
}
