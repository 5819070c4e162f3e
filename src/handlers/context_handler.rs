use std::sync::Arc;

use actix_web::{delete, get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::{
        request::CreateLearningContextRequest,
        response::{DeleteContextResponse, LearningContextDto},
    },
};

#[post("/api/contexts")]
pub async fn create_context(
    state: web::Data<Arc<AppState>>,
    request: web::Json<CreateLearningContextRequest>,
) -> Result<HttpResponse, AppError> {
    let context = state
        .context_service
        .create_context(request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(LearningContextDto::from(context)))
}

#[get("/api/contexts")]
pub async fn list_contexts(state: web::Data<Arc<AppState>>) -> Result<HttpResponse, AppError> {
    let contexts: Vec<LearningContextDto> = state
        .context_service
        .list_contexts()
        .await?
        .into_iter()
        .map(LearningContextDto::from)
        .collect();
    Ok(HttpResponse::Ok().json(contexts))
}

#[get("/api/contexts/{id}")]
pub async fn get_context(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let context = state.context_service.get_context(&id).await?;
    Ok(HttpResponse::Ok().json(LearningContextDto::from(context)))
}

/// Starting a new upload discards the old context together with its tutor.
#[delete("/api/contexts/{id}")]
pub async fn delete_context(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    state.tutor_service.discard_context(&id).await?;
    Ok(HttpResponse::Ok().json(DeleteContextResponse {
        message: format!("Learning context '{}' deleted", id),
    }))
}

#[get("/health")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
