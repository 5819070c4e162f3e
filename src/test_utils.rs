use crate::models::domain::{LearningContext, UserProfile};

pub use fakes::{GatedImages, Script, ScriptedBackend, StaticImages};

#[cfg(test)]
pub mod fixtures {
    use super::*;

    /// Study material shaped like a synthesized upload
    pub fn test_context() -> LearningContext {
        LearningContext::new(
            "Cell Biology",
            "Cells are the basic unit of life. Mitosis divides one cell into two.",
        )
    }

    pub fn test_profile() -> UserProfile {
        UserProfile::new("Bangladesh", "National Curriculum")
    }
}

#[cfg(test)]
pub mod fakes {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
    };

    use async_trait::async_trait;
    use futures::{stream, StreamExt};
    use tokio::sync::Notify;

    use crate::{
        errors::{AppError, AppResult},
        models::domain::Message,
        services::chat_backend::{
            ChatBackend, ChatConnection, ChunkStream, GeneratedImage, ImageGenerator,
            OutgoingPart, StreamChunk,
        },
    };

    /// How the next turn on any connection of a [`ScriptedBackend`] behaves.
    pub enum Script {
        Reply(Vec<StreamChunk>),
        FailToStart,
        /// Yields the chunks, then breaks with a transport error.
        FailMidStream(Vec<StreamChunk>),
        /// Holds the stream open until the gate is notified.
        Gated(Arc<Notify>, Vec<StreamChunk>),
    }

    #[derive(Default)]
    struct Recorded {
        scripts: Mutex<VecDeque<Script>>,
        started: Mutex<Vec<(String, Vec<Message>)>>,
        sent: Mutex<Vec<Vec<OutgoingPart>>>,
    }

    /// Chat backend that replays queued scripts and records every call.
    #[derive(Clone, Default)]
    pub struct ScriptedBackend {
        recorded: Arc<Recorded>,
    }

    impl ScriptedBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, script: Script) {
            self.recorded.scripts.lock().unwrap().push_back(script);
        }

        /// `(system_instruction, priming)` for each opened connection.
        pub fn started(&self) -> Vec<(String, Vec<Message>)> {
            self.recorded.started.lock().unwrap().clone()
        }

        pub fn sent(&self) -> Vec<Vec<OutgoingPart>> {
            self.recorded.sent.lock().unwrap().clone()
        }
    }

    impl ChatBackend for ScriptedBackend {
        fn start_chat(
            &self,
            system_instruction: &str,
            priming: &[Message],
        ) -> Arc<dyn ChatConnection> {
            self.recorded
                .started
                .lock()
                .unwrap()
                .push((system_instruction.to_string(), priming.to_vec()));
            Arc::new(self.clone())
        }
    }

    fn chunks(chunks: Vec<StreamChunk>) -> impl futures::Stream<Item = AppResult<StreamChunk>> {
        stream::iter(chunks.into_iter().map(Ok))
    }

    #[async_trait]
    impl ChatConnection for ScriptedBackend {
        async fn send_stream(&self, parts: Vec<OutgoingPart>) -> AppResult<ChunkStream> {
            self.recorded.sent.lock().unwrap().push(parts);
            let script = self
                .recorded
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Script::Reply(vec![StreamChunk::text("ok")]));

            match script {
                Script::Reply(replies) => Ok(chunks(replies).boxed()),
                Script::FailToStart => Err(AppError::UpstreamError("connection refused".to_string())),
                Script::FailMidStream(replies) => Ok(chunks(replies)
                    .chain(stream::once(async {
                        Err(AppError::UpstreamError("stream reset".to_string()))
                    }))
                    .boxed()),
                Script::Gated(gate, replies) => {
                    let wait = stream::once(async move { gate.notified().await })
                        .filter_map(|_| async { None::<AppResult<StreamChunk>> });
                    Ok(wait.chain(chunks(replies)).boxed())
                }
            }
        }
    }

    /// Image generator that always returns the same tiny JPEG.
    #[derive(Clone, Default)]
    pub struct StaticImages;

    #[async_trait]
    impl ImageGenerator for StaticImages {
        async fn generate(&self, _prompt: &str) -> AppResult<GeneratedImage> {
            Ok(GeneratedImage {
                mime_type: "image/jpeg".to_string(),
                data: "/9j/".to_string(),
            })
        }
    }

    /// Image generator whose requests block until the gate is notified.
    pub struct GatedImages {
        gate: Arc<Notify>,
        calls: AtomicUsize,
    }

    impl GatedImages {
        pub fn new(gate: Arc<Notify>) -> Self {
            Self {
                gate,
                calls: AtomicUsize::new(0),
            }
        }

        /// Requests started so far, including those still waiting on the gate.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageGenerator for GatedImages {
        async fn generate(&self, _prompt: &str) -> AppResult<GeneratedImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(GeneratedImage {
                mime_type: "image/jpeg".to_string(),
                data: "/9j/".to_string(),
            })
        }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use actix_web::http::StatusCode;

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }

    /// Asserts that a status code represents success (2xx)
    pub fn assert_success_status(status: StatusCode) {
        assert!(
            status.is_success(),
            "Expected success status, got: {}",
            status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::services::chat_backend::{ChatBackend, ChatConnection, StreamChunk};
    use futures::StreamExt;

    #[test]
    fn test_fixtures_context_has_seed() {
        let context = test_context();
        assert!(context.seed_context().is_some());
        assert!(test_profile().is_complete());
    }

    #[tokio::test]
    async fn scripted_backend_replays_in_order() {
        let backend = ScriptedBackend::new();
        backend.push(Script::Reply(vec![StreamChunk::text("a"), StreamChunk::text("b")]));

        let connection = backend.start_chat("instruction", &[]);
        let stream = connection.send_stream(vec![]).await.unwrap();
        let texts: Vec<String> = stream.map(|c| c.unwrap().text).collect().await;

        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(backend.started()[0].0, "instruction");
        assert_eq!(backend.sent().len(), 1);
    }
}
