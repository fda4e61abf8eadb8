// ABOUTME: Scripted LlmClient for command tests.
// ABOUTME: Replays canned responses and records every request it receives.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::{
    EventStream, LlmClient, Request, Response, StopReason, StreamEvent, ToolCall, Usage,
};

#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<Response, LlmError>>>,
    streams: Mutex<VecDeque<Vec<Result<StreamEvent, LlmError>>>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: Result<Response, LlmError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn stream(self, events: Vec<Result<StreamEvent, LlmError>>) -> Self {
        self.streams.lock().unwrap().push_back(events);
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError> {
        self.requests.lock().unwrap().push(req.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::StreamClosed))
    }

    fn create_message_stream(&self, req: &Request) -> EventStream {
        self.requests.lock().unwrap().push(req.clone());
        let events = self.streams.lock().unwrap().pop_front().unwrap_or_default();
        Box::pin(futures::stream::iter(events))
    }
}

/// A response carrying a single function call.
pub fn tool_response(name: &str, arguments: &str) -> Response {
    Response {
        id: "chatcmpl-test".to_string(),
        content: None,
        tool_calls: vec![ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }],
        stop_reason: StopReason::ToolUse,
        model: "gpt-3.5-turbo-1106".to_string(),
        usage: Usage::default(),
    }
}

/// A plain text response without function calls.
pub fn text_response(text: &str) -> Response {
    Response {
        id: "chatcmpl-test".to_string(),
        content: Some(text.to_string()),
        tool_calls: Vec::new(),
        stop_reason: StopReason::EndTurn,
        model: "gpt-3.5-turbo-1106".to_string(),
        usage: Usage::default(),
    }
}

/// Stream events for a complete text reply.
pub fn text_stream(chunks: &[&str]) -> Vec<Result<StreamEvent, LlmError>> {
    let mut events = vec![Ok(StreamEvent::MessageStart {
        id: "chatcmpl-test".to_string(),
        model: "gpt-3.5-turbo-1106".to_string(),
    })];
    events.extend(chunks.iter().map(|chunk| {
        Ok(StreamEvent::TextDelta {
            text: chunk.to_string(),
        })
    }));
    events.push(Ok(StreamEvent::MessageDelta {
        stop_reason: Some(StopReason::EndTurn),
        usage: Usage::default(),
    }));
    events.push(Ok(StreamEvent::MessageStop));
    events
}

pub fn context_length_error() -> LlmError {
    LlmError::Api {
        status: 400,
        code: Some("context_length_exceeded".to_string()),
        message: "This model's maximum context length is 16385 tokens".to_string(),
    }
}
