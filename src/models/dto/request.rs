use serde::Deserialize;
use validator::Validate;

use crate::{
    errors::AppResult,
    models::domain::{Attachment, Locale, Persona, UserProfile},
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLearningContextRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Synthesized study material; may be empty for a context-free tutor.
    #[serde(default)]
    #[validate(length(max = 2000000))]
    pub content: String,
}

/// Query parameters for opening a tutor session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TutorQuery {
    pub locale: Option<Locale>,
    pub country: Option<String>,
    pub curriculum: Option<String>,
}

impl TutorQuery {
    pub fn profile(&self) -> Option<UserProfile> {
        let profile = UserProfile::new(
            self.country.as_deref().unwrap_or_default(),
            self.curriculum.as_deref().unwrap_or_default(),
        );
        profile.is_complete().then_some(profile)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AttachmentPayload {
    #[validate(length(min = 1, max = 100))]
    pub mime_type: String,

    /// Base64 content, optionally as a `data:` URL.
    #[validate(length(min = 1))]
    pub data: String,
}

impl AttachmentPayload {
    pub fn into_attachment(self) -> AppResult<Attachment> {
        Attachment::from_base64(&self.mime_type, &self.data)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub text: String,

    #[validate(nested)]
    pub attachment: Option<AttachmentPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePersonaRequest {
    pub persona: Persona,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AskConceptRequest {
    #[validate(length(min = 1, max = 200))]
    pub concept: String,
}
