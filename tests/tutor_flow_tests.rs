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

use tento_tutor::{
    errors::{AppError, AppResult},
    models::domain::{ChartKind, ContentSegment, ImageContent, Locale, Message, Persona, Role},
    services::{
        chat_backend::{
            ChatBackend, ChatConnection, ChunkStream, GeneratedImage, ImageGenerator,
            OutgoingPart, StreamChunk,
        },
        tutor_session::{SendOutcome, TutorEngine},
    },
};

/// Replies with queued texts, one streamed chunk per line.
#[derive(Clone, Default)]
struct QueuedReplies {
    replies: Arc<Mutex<VecDeque<String>>>,
}

impl QueuedReplies {
    fn with(replies: &[&str]) -> Self {
        let queue = Self::default();
        queue
            .replies
            .lock()
            .unwrap()
            .extend(replies.iter().map(|r| r.to_string()));
        queue
    }
}

impl ChatBackend for QueuedReplies {
    fn start_chat(&self, _system_instruction: &str, _priming: &[Message]) -> Arc<dyn ChatConnection> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl ChatConnection for QueuedReplies {
    async fn send_stream(&self, _parts: Vec<OutgoingPart>) -> AppResult<ChunkStream> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::UpstreamError("no reply queued".to_string()))?;

        let chunks: Vec<AppResult<StreamChunk>> = reply
            .split_inclusive('\n')
            .map(|line| Ok(StreamChunk::text(line)))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }
}

/// Counts requests; prompts containing "fail" are rejected.
#[derive(Default)]
struct CountingImages {
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl CountingImages {
    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate: Some(gate),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for CountingImages {
    async fn generate(&self, prompt: &str) -> AppResult<GeneratedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if prompt.contains("fail") {
            return Err(AppError::UpstreamError("safety filter".to_string()));
        }
        Ok(GeneratedImage {
            mime_type: "image/jpeg".to_string(),
            data: "/9j/4AAQ".to_string(),
        })
    }
}

fn kind(segment: &ContentSegment) -> &'static str {
    match segment {
        ContentSegment::Text { .. } => "text",
        ContentSegment::Image { image: ImageContent::Placeholder { .. } } => "placeholder",
        ContentSegment::Image { image: ImageContent::Resolved { .. } } => "image",
        ContentSegment::Chart { .. } => "chart",
        ContentSegment::Flowchart { .. } => "flowchart",
    }
}

const RICH_REPLY: &str = concat!(
    "A <def term=\"Cell\">basic unit of life</def> divides.\n",
    "```html\n<div style=\"width:100%\">G1 → S → G2 → M</div>\n```\n",
    "Time per phase:\n",
    "```json-chart\n{\"type\":\"bar\",\"data\":[{\"phase\":\"G1\",\"hours\":11}],\"dataKey\":\"hours\",\"nameKey\":\"phase\"}\n```\n",
    "[GENERATE_IMAGE: \"a cell in anaphase\"]\n",
    "Remember <formula name=\"Doubling\">N = 2^n</formula>."
);

#[tokio::test]
async fn rich_reply_is_rendered_as_ordered_segments() {
    let images = Arc::new(CountingImages::default());
    let engine = TutorEngine::new(Arc::new(QueuedReplies::with(&[RICH_REPLY])), images.clone());
    let session = engine.create_session(Some("Mitosis notes"), Locale::En, Persona::Science, None);

    let outcome = engine.send(&session, "Explain mitosis", None).await;
    assert!(matches!(outcome, SendOutcome::Completed { .. }));
    session.settle_assets().await;

    let history = session.history().await;
    let reply = history.last().unwrap();
    assert_eq!(reply.role, Role::Assistant);

    let kinds: Vec<&str> = reply.parts.iter().map(kind).collect();
    assert_eq!(
        kinds,
        vec!["text", "flowchart", "text", "chart", "text", "image", "text"]
    );
    assert_eq!(
        reply.parts[0],
        ContentSegment::text("A basic unit of life divides.\n")
    );
    match &reply.parts[3] {
        ContentSegment::Chart { chart } => {
            assert_eq!(chart.kind, ChartKind::Bar);
            assert_eq!(chart.name_key.as_deref(), Some("phase"));
        }
        other => panic!("expected chart, got {:?}", other),
    }

    let extractions = reply.extractions.as_ref().unwrap();
    assert_eq!(extractions.definitions[0].term, "Cell");
    assert_eq!(extractions.formulas[0].expression, "N = 2^n");
    assert!(reply.sources.is_none());
    assert_eq!(images.calls(), 1);

    // Nothing left for a second pass.
    engine.resolver().resolve_session(&session).await;
    assert_eq!(images.calls(), 1);
}

#[tokio::test]
async fn failed_image_is_replaced_by_notice_in_place() {
    let images = Arc::new(CountingImages::default());
    let engine = TutorEngine::new(
        Arc::new(QueuedReplies::with(&[
            "[GENERATE_IMAGE: \"ok volcano\"] and [GENERATE_IMAGE: \"fail glacier\"]",
        ])),
        images.clone(),
    );
    let session = engine.create_session(None, Locale::En, Persona::Science, None);

    engine.send(&session, "show me", None).await;
    session.settle_assets().await;

    let reply = session.history().await.pop().unwrap();
    let kinds: Vec<&str> = reply.parts.iter().map(kind).collect();
    assert_eq!(kinds, vec!["image", "text", "text"]);
    assert_eq!(reply.parts[2], ContentSegment::text("(Image generation failed)"));
    assert_eq!(images.calls(), 2);
}

#[tokio::test]
async fn resolver_merge_keeps_turns_appended_meanwhile() {
    let gate = Arc::new(Notify::new());
    let images = Arc::new(CountingImages::gated(Arc::clone(&gate)));
    let engine = TutorEngine::new(
        Arc::new(QueuedReplies::with(&[
            "Look: [GENERATE_IMAGE: \"a plant cell\"]",
            "Chloroplasts hold chlorophyll.",
        ])),
        images.clone(),
    );
    let session = engine.create_session(None, Locale::En, Persona::Science, None);

    engine.send(&session, "draw a plant cell", None).await;
    let outcome = engine.send(&session, "what is green?", None).await;
    assert!(matches!(outcome, SendOutcome::Completed { .. }));

    gate.notify_one();
    let reports = session.settle_assets().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].applied, 1);

    let history = session.history().await;
    assert_eq!(history.len(), 5);
    assert_eq!(kind(&history[2].parts[1]), "image");
    assert_eq!(history[3].plain_text(), "what is green?");
    assert_eq!(history[4].plain_text(), "Chloroplasts hold chlorophyll.");
}

#[tokio::test]
async fn persona_change_drops_pending_images() {
    let gate = Arc::new(Notify::new());
    let images = Arc::new(CountingImages::gated(Arc::clone(&gate)));
    let engine = TutorEngine::new(
        Arc::new(QueuedReplies::with(&["[GENERATE_IMAGE: \"a plant cell\"]"])),
        images.clone(),
    );
    let session = engine.create_session(Some("Botany"), Locale::En, Persona::Science, None);

    engine.send(&session, "draw", None).await;
    engine
        .reset_session(&session, Some(Persona::General), None)
        .await;
    gate.notify_one();
    session.settle_assets().await;

    let history = session.history().await;
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|m| !m.parts.iter().any(|p| kind(p) == "image")));
    assert_eq!(session.persona().await, Persona::General);
}

#[tokio::test]
async fn transport_error_notice_follows_locale() {
    let engine = TutorEngine::new(
        Arc::new(QueuedReplies::default()),
        Arc::new(CountingImages::default()),
    );
    let session = engine.create_session(None, Locale::Zh, Persona::General, None);

    assert_eq!(engine.send(&session, "你好", None).await, SendOutcome::Failed);

    let history = session.history().await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].role, Role::Assistant);
    assert!(!session.is_busy().await);
}

#[tokio::test]
async fn persistable_history_has_no_placeholders() {
    let gate = Arc::new(Notify::new());
    let engine = TutorEngine::new(
        Arc::new(QueuedReplies::with(&["See [GENERATE_IMAGE: \"a leaf\"]"])),
        Arc::new(CountingImages::gated(Arc::clone(&gate))),
    );
    let session = engine.create_session(None, Locale::En, Persona::Science, None);

    engine.send(&session, "leaf?", None).await;
    let snapshot: Vec<Message> = session
        .history()
        .await
        .iter()
        .map(Message::persistable)
        .collect();

    assert!(snapshot.iter().all(|m| !m.has_placeholders()));
    assert_eq!(
        snapshot.last().unwrap().parts[1],
        ContentSegment::text("[GENERATE_IMAGE: \"a leaf\"]")
    );

    gate.notify_one();
    session.settle_assets().await;
}
