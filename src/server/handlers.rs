use actix_web::{http::StatusCode, web, HttpResponse};

use super::{page, AppState};
use crate::{
    error::StudioError,
    models::{ErrorResponse, GenerationRequest, HealthResponse, TemplateListResponse},
    templates::TemplateLibrary,
};

pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    let templates = state.service.templates().list().await;
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(page::render_index(&templates))
}

pub async fn list_templates(state: web::Data<AppState>) -> HttpResponse {
    let templates = state.service.templates().list().await;
    HttpResponse::Ok().json(TemplateListResponse { templates })
}

pub async fn template_file(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let name = path.into_inner();
    if let Err(e) = TemplateLibrary::validate_name(&name) {
        log::warn!("⚠️  {}", e);
        return HttpResponse::BadRequest().json(ErrorResponse::new("Invalid template name"));
    }

    match state.service.templates().read(&name).await {
        Ok((bytes, mime)) => HttpResponse::Ok().content_type(mime).body(bytes),
        Err(StudioError::TemplateError(_)) => {
            HttpResponse::NotFound().json(ErrorResponse::new("Template not found"))
        }
        Err(e) => {
            log::error!("❌ Failed to read template {}: {}", name, e);
            HttpResponse::InternalServerError().json(ErrorResponse::new("Failed to read template"))
        }
    }
}

pub async fn create_prediction(
    state: web::Data<AppState>,
    payload: web::Json<GenerationRequest>,
) -> HttpResponse {
    let reply = state.service.handle(payload.into_inner()).await;
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(reply.body)
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let provider = state.service.provider();
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        provider: provider.name().to_string(),
        configured: provider.is_configured(),
    })
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::new("Not found"))
}
