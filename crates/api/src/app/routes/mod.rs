use axum::{Router, routing::get};

pub mod orders;
pub mod system;

/// Router for every endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .nest("/orders", orders::router())
        .route("/warehouses/:id/stock", get(system::warehouse_stock))
}
