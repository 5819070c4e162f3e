use std::sync::Arc;

use actix_web::{get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::request::{
        AskConceptRequest, ChangePersonaRequest, SendMessageRequest, TutorQuery,
    },
};

#[get("/api/contexts/{id}/tutor")]
pub async fn get_tutor(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    query: web::Query<TutorQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let view = state
        .tutor_service
        .view(&id, query.locale, query.profile())
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

#[post("/api/contexts/{id}/tutor/reset")]
pub async fn new_chat(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let view = state.tutor_service.new_chat(&id).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[put("/api/contexts/{id}/tutor/persona")]
pub async fn change_persona(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    request: web::Json<ChangePersonaRequest>,
) -> Result<HttpResponse, AppError> {
    let view = state
        .tutor_service
        .change_persona(&id, request.into_inner().persona)
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Returns as soon as the user turn is recorded; poll the tutor view for the reply.
#[post("/api/contexts/{id}/tutor/messages")]
pub async fn send_message(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    request: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let view = state
        .tutor_service
        .send_message(&id, request.into_inner())
        .await?;
    Ok(HttpResponse::Accepted().json(view))
}

#[post("/api/contexts/{id}/tutor/concepts")]
pub async fn ask_about_concept(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    request: web::Json<AskConceptRequest>,
) -> Result<HttpResponse, AppError> {
    let view = state
        .tutor_service
        .ask_about_concept(&id, request.into_inner())
        .await?;
    Ok(HttpResponse::Accepted().json(view))
}
