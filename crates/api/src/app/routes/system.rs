use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use medcamp_core::WarehouseId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Stock booked from received goods.
pub async fn warehouse_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let warehouse_id: WarehouseId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let inventory = services.warehouse_stock(&warehouse_id);
    (StatusCode::OK, Json(dto::stock_to_json(&inventory))).into_response()
}
