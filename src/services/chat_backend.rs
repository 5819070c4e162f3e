use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{
    errors::AppResult,
    models::domain::{Attachment, Citation, Message},
};

/// One streamed fragment of a model reply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamChunk {
    pub text: String,
    /// Grounding references carried by this fragment, if any.
    pub citations: Option<Vec<Citation>>,
}

impl StreamChunk {
    pub fn text(text: &str) -> Self {
        StreamChunk {
            text: text.to_string(),
            citations: None,
        }
    }
}

/// Fragments arrive in order; dropping the stream cancels the request.
pub type ChunkStream = BoxStream<'static, AppResult<StreamChunk>>;

/// Part of a user turn as submitted to the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutgoingPart {
    Text(String),
    InlineData { mime_type: String, data: String },
}

impl From<Attachment> for OutgoingPart {
    fn from(attachment: Attachment) -> Self {
        OutgoingPart::InlineData {
            mime_type: attachment.mime_type,
            data: attachment.data,
        }
    }
}

/// A stateful multi-turn conversation with the model.
///
/// A turn joins the transcript only after its stream completes successfully.
#[async_trait]
pub trait ChatConnection: Send + Sync {
    async fn send_stream(&self, parts: Vec<OutgoingPart>) -> AppResult<ChunkStream>;
}

pub trait ChatBackend: Send + Sync {
    /// Opens a connection primed with `priming` turns. Performs no I/O.
    fn start_chat(&self, system_instruction: &str, priming: &[Message]) -> Arc<dyn ChatConnection>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    /// Base64 encoded image bytes.
    pub data: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> AppResult<GeneratedImage>;
}
