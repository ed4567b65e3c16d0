//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: adapter selection, the replenishment service, the stock worker
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use medcamp_infra::BackendConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &BackendConfig) -> Result<Router, services::StartupError> {
    let services = services::build_services(config).await?;
    Ok(router_with(Arc::new(services)))
}

/// Router over already-wired services.
pub fn router_with(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(Extension(services)))
}

pub use services::AppServices;
