use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{Locale, Persona, UserProfile},
        dto::{
            request::{AskConceptRequest, SendMessageRequest},
            response::SessionView,
        },
    },
    services::{
        learning_context_service::LearningContextService,
        tutor_session::{concept_prompt, PendingTurn, TutorEngine, TutorSession},
    },
};

/// One tutor session per learning context, created on first use.
pub struct TutorService {
    engine: TutorEngine,
    contexts: Arc<LearningContextService>,
    sessions: RwLock<HashMap<String, TutorSession>>,
    default_persona: Persona,
}

impl TutorService {
    pub fn new(
        engine: TutorEngine,
        contexts: Arc<LearningContextService>,
        default_persona: Persona,
    ) -> Self {
        Self {
            engine,
            contexts,
            sessions: RwLock::new(HashMap::new()),
            default_persona,
        }
    }

    pub fn engine(&self) -> &TutorEngine {
        &self.engine
    }

    /// Returns the context's session, creating it on first access.
    ///
    /// A different `locale` or `profile` on an existing session rebuilds it with them.
    pub async fn session_for(
        &self,
        context_id: &str,
        locale: Option<Locale>,
        profile: Option<UserProfile>,
    ) -> AppResult<TutorSession> {
        let existing = self.sessions.read().await.get(context_id).cloned();
        if let Some(session) = existing {
            self.engine.localize_session(&session, locale, profile).await;
            return Ok(session);
        }

        let context = self.contexts.get_context(context_id).await?;

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(context_id) {
            return Ok(session.clone());
        }
        let session = self.engine.create_session(
            context.seed_context(),
            locale.unwrap_or_default(),
            self.default_persona,
            profile,
        );
        sessions.insert(context_id.to_string(), session.clone());
        Ok(session)
    }

    pub async fn view(
        &self,
        context_id: &str,
        locale: Option<Locale>,
        profile: Option<UserProfile>,
    ) -> AppResult<SessionView> {
        let session = self.session_for(context_id, locale, profile).await?;
        Ok(session.view().await)
    }

    /// "New chat": same persona and locale, fresh history.
    pub async fn new_chat(&self, context_id: &str) -> AppResult<SessionView> {
        let session = self.session_for(context_id, None, None).await?;
        self.engine.reset_session(&session, None, None).await;
        Ok(session.view().await)
    }

    pub async fn change_persona(&self, context_id: &str, persona: Persona) -> AppResult<SessionView> {
        let session = self.session_for(context_id, None, None).await?;
        if session.persona().await != persona {
            self.engine
                .reset_session(&session, Some(persona), None)
                .await;
        }
        Ok(session.view().await)
    }

    /// Accepts a user turn and finishes it in the background.
    ///
    /// The returned view already holds the user turn and shows the session busy.
    pub async fn send_message(
        &self,
        context_id: &str,
        request: SendMessageRequest,
    ) -> AppResult<SessionView> {
        request.validate()?;
        let attachment = request
            .attachment
            .map(|payload| payload.into_attachment())
            .transpose()?;
        if request.text.trim().is_empty() && attachment.is_none() {
            return Err(AppError::ValidationError(
                "Message needs text or an attachment".to_string(),
            ));
        }

        let session = self.session_for(context_id, None, None).await?;
        let pending = self
            .engine
            .begin_send(&session, &request.text, attachment)
            .await;
        self.dispatch(&session, pending).await
    }

    pub async fn ask_about_concept(
        &self,
        context_id: &str,
        request: AskConceptRequest,
    ) -> AppResult<SessionView> {
        request.validate()?;
        if request.concept.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Concept cannot be blank".to_string(),
            ));
        }

        let session = self.session_for(context_id, None, None).await?;
        let prompt = concept_prompt(session.locale().await, &request.concept);
        let pending = self.engine.begin_send(&session, &prompt, None).await;
        self.dispatch(&session, pending).await
    }

    async fn dispatch(
        &self,
        session: &TutorSession,
        pending: Option<PendingTurn>,
    ) -> AppResult<SessionView> {
        let Some(pending) = pending else {
            return Err(AppError::Conflict(
                "Tutor is still answering the previous message".to_string(),
            ));
        };

        let engine = self.engine.clone();
        let handle = session.clone();
        tokio::spawn(async move {
            let session_id = pending.session_id();
            let outcome = engine.complete_send(&handle, pending).await;
            log::debug!("Tutor turn on session {} finished: {:?}", session_id, outcome);
        });

        Ok(session.view().await)
    }

    /// Deletes the learning context and tears down its tutor session.
    pub async fn discard_context(&self, context_id: &str) -> AppResult<()> {
        self.contexts.delete_context(context_id).await?;

        let removed = self.sessions.write().await.remove(context_id);
        if let Some(session) = removed {
            self.engine.discard_session(&session).await;
        }
        Ok(())
    }
}
