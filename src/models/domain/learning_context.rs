use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Synthesized study material a tutor session is grounded on.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct LearningContext {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl LearningContext {
    pub fn new(title: &str, content: &str) -> Self {
        LearningContext {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            content: content.to_string(),
            created_at: Some(Utc::now()),
        }
    }

    /// Seed text for a tutor session; blank material means no seed.
    pub fn seed_context(&self) -> Option<&str> {
        let trimmed = self.content.trim();
        (!trimmed.is_empty()).then_some(self.content.as_str())
    }
}
