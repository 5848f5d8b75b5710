pub mod action;
pub mod auth;
pub mod inspection;
pub mod location;
pub mod rider;
pub mod user;

use std::sync::Arc;

use crate::{config::cors::CorsConfig, utils::upload::UPLOAD_ROUTE, ServiceState};
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::warn;

pub fn create_router(state: Arc<ServiceState>) -> Router {
    let router = Router::new();
    let router = auth::add_routers(router);
    let router = user::add_routers(router);
    let router = rider::add_routers(router);
    let router = inspection::add_routers(router, state.config.upload.max_bytes);
    let router = action::add_routers(router);
    let router = location::add_routers(router);

    router
        .nest_service(UPLOAD_ROUTE, ServeDir::new(&state.config.upload.dir))
        .layer(cors_layer(&state.config.cors))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
}

/// Listed origins get credentialed CORS (the refresh cookie); no list means
/// any origin without credentials.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    if config.allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
