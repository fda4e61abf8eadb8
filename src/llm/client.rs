// ABOUTME: Defines the LlmClient trait - the seam between the assistant
// ABOUTME: commands and a hosted chat-completion provider.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use super::{Request, Response, StopReason, Usage};
use crate::error::LlmError;

/// Event types for streaming responses.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Message creation started.
    MessageStart { id: String, model: String },

    /// A chunk of reply text.
    TextDelta { text: String },

    /// Message metadata update.
    MessageDelta {
        stop_reason: Option<StopReason>,
        usage: Usage,
    },

    /// Message complete.
    MessageStop,
}

/// Boxed stream of completion events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Trait for LLM client implementations.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Create a completion (non-streaming).
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError>;

    /// Create a completion with streaming response.
    fn create_message_stream(&self, req: &Request) -> EventStream;
}

/// Drain a stream and return the concatenated reply text.
///
/// Fails with the first error the stream yields. A stream that ends without
/// a `MessageStop` after starting is reported as [`LlmError::StreamClosed`].
pub async fn collect_text<S, E>(stream: S) -> Result<String, E>
where
    S: Stream<Item = Result<StreamEvent, E>> + Unpin,
    E: From<LlmError>,
{
    collect_text_with(stream, |_| {}).await
}

/// Like [`collect_text`], handing each text delta to `on_delta` as it arrives.
pub async fn collect_text_with<S, E, F>(mut stream: S, mut on_delta: F) -> Result<String, E>
where
    S: Stream<Item = Result<StreamEvent, E>> + Unpin,
    E: From<LlmError>,
    F: FnMut(&str),
{
    let mut text = String::new();
    let mut started = false;
    let mut stopped = false;

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::MessageStart { .. } => started = true,
            StreamEvent::TextDelta { text: delta } => {
                on_delta(&delta);
                text.push_str(&delta);
            }
            StreamEvent::MessageDelta { .. } => {}
            StreamEvent::MessageStop => stopped = true,
        }
    }

    if started && !stopped {
        return Err(LlmError::StreamClosed.into());
    }
    Ok(text)
}
