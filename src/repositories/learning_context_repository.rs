use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    errors::{AppError, AppResult},
    models::domain::LearningContext,
};

#[async_trait]
pub trait LearningContextRepository: Send + Sync {
    async fn create(&self, context: LearningContext) -> AppResult<LearningContext>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<LearningContext>>;
    async fn find_all(&self) -> AppResult<Vec<LearningContext>>;
    async fn delete(&self, id: &str) -> AppResult<()>;
}

/// Process-local store; contexts live as long as the server.
#[derive(Clone, Default)]
pub struct InMemoryLearningContextRepository {
    contexts: Arc<RwLock<HashMap<String, LearningContext>>>,
}

impl InMemoryLearningContextRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LearningContextRepository for InMemoryLearningContextRepository {
    async fn create(&self, context: LearningContext) -> AppResult<LearningContext> {
        let mut contexts = self.contexts.write().await;
        if contexts.contains_key(&context.id) {
            return Err(AppError::Conflict(format!(
                "Learning context with id '{}' already exists",
                context.id
            )));
        }
        contexts.insert(context.id.clone(), context.clone());
        Ok(context)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<LearningContext>> {
        let contexts = self.contexts.read().await;
        Ok(contexts.get(id).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<LearningContext>> {
        let contexts = self.contexts.read().await;
        let mut items: Vec<_> = contexts.values().cloned().collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut contexts = self.contexts.write().await;
        if contexts.remove(id).is_none() {
            return Err(AppError::NotFound(format!(
                "Learning context with id '{}' not found",
                id
            )));
        }
        Ok(())
    }
}
