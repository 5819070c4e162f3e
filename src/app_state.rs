use std::sync::Arc;

use crate::{
    config::Config,
    errors::AppResult,
    repositories::InMemoryLearningContextRepository,
    services::{
        chat_backend::{ChatBackend, ImageGenerator},
        gemini_client::GeminiClient,
        learning_context_service::LearningContextService,
        tutor_service::TutorService,
        tutor_session::TutorEngine,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub context_service: Arc<LearningContextService>,
    pub tutor_service: Arc<TutorService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> AppResult<Self> {
        let gemini = Arc::new(GeminiClient::new(&config)?);
        Ok(Self::with_backends(config, gemini.clone(), gemini))
    }

    /// Wires the services around the given model capabilities.
    pub fn with_backends(
        config: Config,
        chat: Arc<dyn ChatBackend>,
        images: Arc<dyn ImageGenerator>,
    ) -> Self {
        let context_repository = Arc::new(InMemoryLearningContextRepository::new());
        let context_service = Arc::new(LearningContextService::new(context_repository));

        let engine = TutorEngine::new(chat, images);
        let tutor_service = Arc::new(TutorService::new(
            engine,
            Arc::clone(&context_service),
            config.default_persona,
        ));

        Self {
            context_service,
            tutor_service,
            config: Arc::new(config),
        }
    }
}
