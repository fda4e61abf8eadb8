// ABOUTME: OpenAI chat-completions client implementation.
// ABOUTME: Implements LlmClient for GPT models, including forced function calls.

use super::client::{EventStream, StreamEvent};
use super::{ChatMessage, Request, Response, StopReason, ToolCall, ToolChoice, ToolDefinition, Usage};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI API request format.
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<OpenAITool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// OpenAI tool call in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: OpenAIFunctionCall,
}

/// OpenAI function call details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIFunctionCall {
    pub name: String,
    pub arguments: String,
}

/// OpenAI tool definition.
#[derive(Debug, Serialize)]
pub struct OpenAITool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: OpenAIFunction,
}

/// OpenAI function definition.
#[derive(Debug, Serialize)]
pub struct OpenAIFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<OpenAIChoice>,
    pub usage: Option<OpenAIUsage>,
}

/// OpenAI response choice.
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub index: usize,
    pub message: OpenAIResponseMessage,
    pub finish_reason: Option<String>,
}

/// OpenAI response message.
#[derive(Debug, Default, Deserialize)]
pub struct OpenAIResponseMessage {
    pub role: Option<String>,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<OpenAIToolCall>>,
}

/// OpenAI usage stats.
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
pub struct OpenAIError {
    pub error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// OpenAI streaming chunk.
#[derive(Debug, Deserialize)]
pub struct OpenAIStreamChunk {
    pub id: String,
    pub model: String,
    pub choices: Vec<OpenAIStreamChoice>,
}

/// OpenAI streaming choice.
#[derive(Debug, Deserialize)]
pub struct OpenAIStreamChoice {
    pub index: usize,
    pub delta: OpenAIDelta,
    pub finish_reason: Option<String>,
}

/// OpenAI streaming delta.
#[derive(Debug, Deserialize)]
pub struct OpenAIDelta {
    pub role: Option<String>,
    pub content: Option<String>,
}

/// Client for the OpenAI API.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENAI_API_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Point the client at a different chat-completions endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl From<&ToolDefinition> for OpenAITool {
    fn from(tool: &ToolDefinition) -> Self {
        OpenAITool {
            tool_type: "function".to_string(),
            function: OpenAIFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        }
    }
}

fn tool_choice_json(choice: &ToolChoice, has_tools: bool) -> Option<serde_json::Value> {
    match choice {
        ToolChoice::Auto if has_tools => Some(serde_json::Value::String("auto".to_string())),
        ToolChoice::Auto => None,
        ToolChoice::Function(name) => Some(serde_json::json!({
            "type": "function",
            "function": { "name": name }
        })),
    }
}

impl From<&Request> for OpenAIRequest {
    fn from(req: &Request) -> Self {
        OpenAIRequest {
            model: req.model.clone(),
            // Capped messages go out verbatim.
            messages: req.messages.clone(),
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            tools: req.tools.iter().map(OpenAITool::from).collect(),
            tool_choice: tool_choice_json(&req.tool_choice, !req.tools.is_empty()),
            stream: None,
        }
    }
}

fn parse_stop_reason(s: Option<&str>) -> StopReason {
    match s {
        Some("stop") => StopReason::EndTurn,
        Some("tool_calls") | Some("function_call") => StopReason::ToolUse,
        Some("length") => StopReason::MaxTokens,
        Some(other) => {
            tracing::warn!(finish_reason = other, "unrecognized finish reason");
            StopReason::EndTurn
        }
        None => StopReason::EndTurn,
    }
}

impl From<OpenAIResponse> for Response {
    fn from(resp: OpenAIResponse) -> Self {
        let choice = resp.choices.into_iter().next();
        let finish_reason = choice.as_ref().and_then(|c| c.finish_reason.clone());
        let message = choice.map(|c| c.message).unwrap_or_default();

        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        let usage = resp
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Response {
            id: resp.id,
            content: message.content.filter(|text| !text.is_empty()),
            tool_calls,
            stop_reason: parse_stop_reason(finish_reason.as_deref()),
            model: resp.model,
            usage,
        }
    }
}

/// Build an API error from a non-success status and its body.
fn api_error(status: u16, body: &str) -> LlmError {
    match serde_json::from_str::<OpenAIError>(body) {
        Ok(error) => LlmError::Api {
            status,
            code: error.error.code,
            message: error.error.message,
        },
        Err(_) => LlmError::Api {
            status,
            code: None,
            message: body.to_string(),
        },
    }
}

/// Parse one SSE line. Keep-alives, `[DONE]` and unknown payloads yield `None`;
/// an in-stream error object becomes [`LlmError::Api`].
fn parse_sse_line(line: &str) -> Result<Option<OpenAIStreamChunk>, LlmError> {
    let Some(data) = line.strip_prefix("data:").map(str::trim_start) else {
        return Ok(None);
    };
    if data == "[DONE]" {
        return Ok(None);
    }

    match serde_json::from_str::<OpenAIStreamChunk>(data) {
        Ok(chunk) => Ok(Some(chunk)),
        Err(err) => match serde_json::from_str::<OpenAIError>(data) {
            Ok(error) => Err(LlmError::Api {
                status: 200,
                code: error.error.code,
                message: error.error.message,
            }),
            Err(_) => {
                tracing::warn!(error = %err, "skipping unparsable stream chunk");
                Ok(None)
            }
        },
    }
}

/// Splits a byte stream into lines, decoding each line only once it is complete.
#[derive(Debug, Default)]
struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    fn next_line(&mut self) -> Option<String> {
        let pos = self.bytes.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.bytes.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }
}

#[async_trait]
impl super::client::LlmClient for OpenAIClient {
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError> {
        let openai_req = OpenAIRequest::from(req);
        tracing::debug!(model = %req.model, messages = req.messages.len(), "creating completion");

        let response = self
            .http
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(api_error(status.as_u16(), &body));
        }

        let openai_resp: OpenAIResponse = response.json().await?;
        Ok(Response::from(openai_resp))
    }

    fn create_message_stream(&self, req: &Request) -> EventStream {
        let mut openai_req = OpenAIRequest::from(req);
        openai_req.stream = Some(true);
        tracing::debug!(model = %req.model, messages = req.messages.len(), "creating streamed completion");

        let api_key = self.api_key.clone();
        let url = self.base_url.clone();
        let http = self.http.clone();

        Box::pin(async_stream::try_stream! {
            let response = http
                .post(&url)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&openai_req)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await?;
                Err::<(), LlmError>(api_error(status.as_u16(), &body))?;
                return;
            }

            let mut stream = response.bytes_stream();
            let mut buffer = LineBuffer::default();
            let mut message_started = false;

            while let Some(chunk) = futures::StreamExt::next(&mut stream).await {
                let chunk = chunk?;
                buffer.push(&chunk);

                while let Some(line) = buffer.next_line() {
                    if line.is_empty() {
                        continue;
                    }

                    if let Some(chunk) = parse_sse_line(&line)? {
                        if !message_started {
                            yield StreamEvent::MessageStart {
                                id: chunk.id.clone(),
                                model: chunk.model.clone(),
                            };
                            message_started = true;
                        }

                        for choice in chunk.choices {
                            if let Some(text) = choice.delta.content {
                                if !text.is_empty() {
                                    yield StreamEvent::TextDelta { text };
                                }
                            }

                            if let Some(reason) = choice.finish_reason {
                                yield StreamEvent::MessageDelta {
                                    stop_reason: Some(parse_stop_reason(Some(&reason))),
                                    usage: Usage::default(),
                                };
                                yield StreamEvent::MessageStop;
                            }
                        }
                    }
                }
            }
        })
    }
}
