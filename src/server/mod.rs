pub mod handlers;
pub mod page;

use actix_web::{dev::Server, error, middleware, web, App, HttpResponse, HttpServer};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::{
    config::StudioConfig,
    gateway::PredictionService,
    models::ErrorResponse,
    provider::ImageProvider,
    templates::TemplateLibrary,
};

/// Base64 selfies and templates inflate request bodies well past the
/// default JSON limit.
pub const MAX_JSON_BODY: usize = 25 * 1024 * 1024;

pub struct AppState {
    pub service: PredictionService,
}

impl AppState {
    pub fn new(provider: Arc<dyn ImageProvider>, templates: TemplateLibrary) -> Self {
        Self {
            service: PredictionService::new(provider, templates),
        }
    }
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_JSON_BODY)
        .error_handler(|err, _req| {
            log::warn!("⚠️  Rejected prediction body: {}", err);
            error::InternalError::from_response(
                err,
                HttpResponse::BadRequest().json(ErrorResponse::new("Invalid JSON body.")),
            )
            .into()
        })
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(handlers::index))
        .route("/health", web::get().to(handlers::health))
        .route("/templates/{name}", web::get().to(handlers::template_file))
        .route("/api/templates", web::get().to(handlers::list_templates))
        .route("/api/predictions", web::post().to(handlers::create_prediction))
        .default_service(web::to(handlers::not_found));
}

/// Binds the studio and returns the running server with its bound addresses.
pub fn start_server(
    state: web::Data<AppState>,
    host: &str,
    port: u16,
) -> std::io::Result<(Server, Vec<SocketAddr>)> {
    let http_server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::new("%r %s %Dms"))
            .app_data(state.clone())
            .configure(routes)
    })
    .bind((host, port))?;
    let addrs = http_server.addrs();

    Ok((http_server.run(), addrs))
}

pub async fn run_server(
    config: &StudioConfig,
    provider: Arc<dyn ImageProvider>,
) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(
        provider,
        TemplateLibrary::new(&config.templates_dir),
    ));
    let (server, addrs) = start_server(state, &config.host, config.port)?;
    for addr in addrs {
        log::info!("✅ Listening on http://{}", addr);
    }
    server.await
}
