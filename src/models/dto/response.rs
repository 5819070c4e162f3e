use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::domain::{LearningContext, Locale, Message, Persona};

/// Everything a renderer needs to draw the tutor panel.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub persona: Persona,
    pub locale: Locale,
    pub is_busy: bool,
    pub streaming_text: String,
    pub history: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearningContextDto {
    pub id: String,
    pub title: String,
    pub content_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<LearningContext> for LearningContextDto {
    fn from(context: LearningContext) -> Self {
        LearningContextDto {
            content_length: context.content.chars().count(),
            id: context.id,
            title: context.title,
            created_at: context.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteContextResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_dto_counts_characters() {
        let context = LearningContext::new("বাংলা", "কোষ");
        let dto: LearningContextDto = context.clone().into();

        assert_eq!(dto.id, context.id);
        assert_eq!(dto.content_length, 3);
    }

    #[test]
    fn test_session_view_serializes_wire_ids() {
        let view = SessionView {
            session_id: Uuid::new_v4(),
            persona: Persona::Mathematics,
            locale: Locale::Bn,
            is_busy: false,
            streaming_text: String::new(),
            history: vec![Message::assistant_text("hi")],
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["persona"], "math");
        assert_eq!(json["locale"], "bn");
        assert_eq!(json["history"][0]["role"], "assistant");
        assert_eq!(json["history"][0]["parts"][0]["type"], "text");
    }
}
