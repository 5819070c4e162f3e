use std::sync::Arc;

use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{domain::LearningContext, dto::request::CreateLearningContextRequest},
    repositories::LearningContextRepository,
};

pub struct LearningContextService {
    repository: Arc<dyn LearningContextRepository>,
}

impl LearningContextService {
    pub fn new(repository: Arc<dyn LearningContextRepository>) -> Self {
        Self { repository }
    }

    pub async fn create_context(
        &self,
        request: CreateLearningContextRequest,
    ) -> AppResult<LearningContext> {
        request.validate()?;

        let context = LearningContext::new(request.title.trim(), &request.content);
        let context = self.repository.create(context).await?;
        log::info!(
            "Created learning context {} ({} chars)",
            context.id,
            context.content.len()
        );
        Ok(context)
    }

    pub async fn get_context(&self, id: &str) -> AppResult<LearningContext> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Learning context with id '{}' not found", id)))
    }

    pub async fn list_contexts(&self) -> AppResult<Vec<LearningContext>> {
        self.repository.find_all().await
    }

    pub async fn delete_context(&self, id: &str) -> AppResult<()> {
        self.repository.delete(id).await?;
        log::info!("Deleted learning context {}", id);
        Ok(())
    }
}
