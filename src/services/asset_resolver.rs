use std::sync::Arc;

use futures::future::join_all;
use uuid::Uuid;

use crate::{
    constants::prompts::IMAGE_GENERATION_FAILED,
    models::domain::{ContentSegment, Message},
    services::{chat_backend::ImageGenerator, tutor_session::TutorSession},
};

/// Location of an unresolved image placeholder inside a history snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaceholderRef {
    pub message_index: usize,
    pub message_id: Uuid,
    pub segment_index: usize,
    pub prompt: String,
}

impl PlaceholderRef {
    pub(crate) fn key(&self) -> (Uuid, usize) {
        (self.message_id, self.segment_index)
    }
}

/// Positional replacement for one placeholder.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentPatch {
    pub target: PlaceholderRef,
    pub replacement: ContentSegment,
}

impl SegmentPatch {
    pub fn is_failure(&self) -> bool {
        matches!(self.replacement, ContentSegment::Text { .. })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub requested: usize,
    pub failed: usize,
    pub applied: usize,
    /// The session changed identity while images were generating.
    pub discarded: bool,
}

pub fn find_placeholders(history: &[Message]) -> Vec<PlaceholderRef> {
    history
        .iter()
        .enumerate()
        .filter(|(_, message)| message.is_assistant())
        .flat_map(|(message_index, message)| {
            message
                .parts
                .iter()
                .enumerate()
                .filter_map(move |(segment_index, part)| {
                    part.placeholder_prompt().map(|prompt| PlaceholderRef {
                        message_index,
                        message_id: message.id,
                        segment_index,
                        prompt: prompt.to_string(),
                    })
                })
        })
        .collect()
}

/// Applies patches to messages that still hold the same placeholder.
///
/// Messages are matched by id, so turns appended after the snapshot are never touched.
pub fn apply_patches(history: &mut [Message], patches: &[SegmentPatch]) -> usize {
    let mut applied = 0;

    for patch in patches {
        let target = &patch.target;
        let index = if history
            .get(target.message_index)
            .is_some_and(|m| m.id == target.message_id)
        {
            Some(target.message_index)
        } else {
            history.iter().position(|m| m.id == target.message_id)
        };

        let Some(message) = index.and_then(|i| history.get_mut(i)) else {
            continue;
        };

        match message.parts.get_mut(target.segment_index) {
            Some(segment) if segment.placeholder_prompt() == Some(target.prompt.as_str()) => {
                *segment = patch.replacement.clone();
                applied += 1;
            }
            _ => {}
        }
    }

    applied
}

/// Backfills `[GENERATE_IMAGE]` placeholders with generated images.
#[derive(Clone)]
pub struct AssetResolver {
    generator: Arc<dyn ImageGenerator>,
}

impl AssetResolver {
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        Self { generator }
    }

    async fn generate_patch(&self, target: PlaceholderRef) -> SegmentPatch {
        let replacement = match self.generator.generate(&target.prompt).await {
            Ok(image) => {
                log::info!("Generated tutor image for prompt '{}'", target.prompt);
                ContentSegment::image(&image.mime_type, &image.data)
            }
            Err(err) => {
                log::warn!("Image generation failed for prompt '{}': {}", target.prompt, err);
                ContentSegment::text(IMAGE_GENERATION_FAILED)
            }
        };

        SegmentPatch {
            target,
            replacement,
        }
    }

    pub async fn generate_patches(&self, targets: Vec<PlaceholderRef>) -> Vec<SegmentPatch> {
        join_all(targets.into_iter().map(|target| self.generate_patch(target))).await
    }

    /// Returns a copy of `history` with every placeholder resolved or replaced by a notice.
    pub async fn resolve_placeholders(&self, history: &[Message]) -> Vec<Message> {
        let patches = self.generate_patches(find_placeholders(history)).await;

        let mut updated = history.to_vec();
        apply_patches(&mut updated, &patches);
        updated
    }

    /// Resolves the session's unclaimed placeholders and merges them in one update.
    pub async fn resolve_session(&self, session: &TutorSession) -> ResolveReport {
        let (session_id, targets) = {
            let mut guard = session.state.write().await;
            let state = &mut *guard;
            if state.discarded {
                return ResolveReport {
                    discarded: true,
                    ..ResolveReport::default()
                };
            }

            let targets: Vec<PlaceholderRef> = find_placeholders(&state.history)
                .into_iter()
                .filter(|target| state.claimed.insert(target.key()))
                .collect();
            (state.session_id, targets)
        };

        if targets.is_empty() {
            return ResolveReport::default();
        }

        let requested = targets.len();
        let patches = self.generate_patches(targets).await;
        let failed = patches.iter().filter(|p| p.is_failure()).count();

        let mut state = session.state.write().await;
        if state.session_id != session_id {
            log::debug!(
                "Discarding {} image result(s) for replaced session {}",
                patches.len(),
                session_id
            );
            return ResolveReport {
                requested,
                failed,
                applied: 0,
                discarded: true,
            };
        }

        for patch in &patches {
            state.claimed.remove(&patch.target.key());
        }
        let applied = apply_patches(&mut state.history, &patches);
        log::info!(
            "Merged {} resolved image segment(s) into session {}",
            applied,
            session_id
        );

        ResolveReport {
            requested,
            failed,
            applied,
            discarded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::AppError,
        models::domain::{ImageContent, Locale, Persona},
        services::{
            chat_backend::{GeneratedImage, MockImageGenerator},
            tutor_session::TutorEngine,
        },
        test_utils::{GatedImages, ScriptedBackend},
    };
    use tokio::sync::Notify;

    fn jpeg(data: &str) -> GeneratedImage {
        GeneratedImage {
            mime_type: "image/jpeg".to_string(),
            data: data.to_string(),
        }
    }

    fn history_with_placeholder() -> Vec<Message> {
        vec![
            Message::user_text("Show me a cell"),
            Message::assistant(vec![
                ContentSegment::text("Here it is:"),
                ContentSegment::image_placeholder("a labeled cell"),
                ContentSegment::text("Any questions?"),
            ]),
        ]
    }

    #[test]
    fn find_placeholders_skips_user_turns() {
        let mut history = history_with_placeholder();
        history[0].parts.push(ContentSegment::image_placeholder("ignored"));

        let found = find_placeholders(&history);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].message_index, 1);
        assert_eq!(found[0].segment_index, 1);
        assert_eq!(found[0].prompt, "a labeled cell");
    }

    #[tokio::test]
    async fn successful_generation_replaces_segment_in_place() {
        let mut generator = MockImageGenerator::new();
        generator
            .expect_generate()
            .withf(|prompt| prompt == "a labeled cell")
            .times(1)
            .returning(|_| Ok(jpeg("Y2VsbA==")));
        let resolver = AssetResolver::new(Arc::new(generator));

        let history = history_with_placeholder();
        let updated = resolver.resolve_placeholders(&history).await;

        assert_eq!(updated[1].parts.len(), 3);
        assert_eq!(updated[1].parts[0], history[1].parts[0]);
        assert_eq!(
            updated[1].parts[1],
            ContentSegment::Image {
                image: ImageContent::Resolved {
                    mime_type: "image/jpeg".to_string(),
                    data: "Y2VsbA==".to_string(),
                }
            }
        );
        assert_eq!(updated[1].parts[2], history[1].parts[2]);
    }

    #[tokio::test]
    async fn failed_generation_becomes_text_notice_at_same_index() {
        let mut generator = MockImageGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Err(AppError::UpstreamError("quota".to_string())));
        let resolver = AssetResolver::new(Arc::new(generator));

        let updated = resolver.resolve_placeholders(&history_with_placeholder()).await;

        assert_eq!(updated[1].parts.len(), 3);
        assert_eq!(
            updated[1].parts[1],
            ContentSegment::text(IMAGE_GENERATION_FAILED)
        );
    }

    #[tokio::test]
    async fn resolving_twice_issues_no_duplicate_requests() {
        let mut generator = MockImageGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Ok(jpeg("AA==")));
        let resolver = AssetResolver::new(Arc::new(generator));

        let once = resolver.resolve_placeholders(&history_with_placeholder()).await;
        let twice = resolver.resolve_placeholders(&once).await;

        assert_eq!(once, twice);
    }

    #[test]
    fn patches_follow_message_identity_not_position() {
        let history = history_with_placeholder();
        let target = find_placeholders(&history).remove(0);
        let patch = SegmentPatch {
            target,
            replacement: ContentSegment::image("image/png", "AA=="),
        };

        let mut shifted = vec![Message::assistant_text("inserted earlier")];
        shifted.extend(history.clone());
        shifted.push(Message::user_text("appended later"));

        assert_eq!(apply_patches(&mut shifted, &[patch.clone()]), 1);
        assert_eq!(shifted[2].parts[1], patch.replacement);
        assert_eq!(shifted[3].plain_text(), "appended later");
    }

    #[test]
    fn patches_skip_already_resolved_segments() {
        let mut history = history_with_placeholder();
        let target = find_placeholders(&history).remove(0);
        history[1].parts[1] = ContentSegment::image("image/png", "first");

        let patch = SegmentPatch {
            target,
            replacement: ContentSegment::image("image/png", "second"),
        };

        assert_eq!(apply_patches(&mut history, &[patch]), 0);
        assert_eq!(history[1].parts[1], ContentSegment::image("image/png", "first"));
    }

    #[test]
    fn patches_for_missing_messages_are_ignored() {
        let history = history_with_placeholder();
        let patch = SegmentPatch {
            target: find_placeholders(&history).remove(0),
            replacement: ContentSegment::image("image/png", "AA=="),
        };

        let mut fresh = vec![Message::assistant_text("new session")];
        assert_eq!(apply_patches(&mut fresh, &[patch]), 0);
        assert_eq!(fresh[0].plain_text(), "new session");
    }

    #[tokio::test]
    async fn results_for_a_reset_session_are_discarded() {
        let gate = Arc::new(Notify::new());
        let images = Arc::new(GatedImages::new(Arc::clone(&gate)));
        let engine = TutorEngine::new(Arc::new(ScriptedBackend::new()), images.clone());
        let session = engine.create_session(Some("notes"), Locale::En, Persona::Science, None);
        session
            .state
            .write()
            .await
            .history
            .extend(history_with_placeholder());

        let task = {
            let resolver = engine.resolver().clone();
            let session = session.clone();
            tokio::spawn(async move { resolver.resolve_session(&session).await })
        };
        while images.calls() == 0 {
            tokio::task::yield_now().await;
        }

        engine
            .reset_session(&session, Some(Persona::General), None)
            .await;
        let fresh = session.history().await;
        gate.notify_one();
        let report = task.await.unwrap();

        assert!(report.discarded);
        assert_eq!(report.requested, 1);
        assert_eq!(report.applied, 0);
        assert_eq!(session.history().await, fresh);
        assert!(!fresh.iter().any(Message::has_placeholders));
        assert!(session.state.read().await.claimed.is_empty());
    }
}
