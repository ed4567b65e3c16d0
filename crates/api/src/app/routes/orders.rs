use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use medcamp_core::{OrderId, SupplierId, WarehouseId};
use medcamp_infra::EditOutcome;
use medcamp_replenishment::{OrderEditor, ReceiptSubmission};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

type Response = axum::response::Response;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order))
        .route("/editor", post(open_new_editor))
        .route("/:id", get(get_order).delete(cancel_order))
        .route("/:id/editor", get(open_editor))
        .route("/:id/items", put(update_items))
        .route("/:id/send", post(send_order))
        .route("/:id/receive", post(receive_goods))
        .route("/:id/fulfilment", get(get_fulfilment))
}

macro_rules! try_resp {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(resp) => return resp,
        }
    };
}

macro_rules! try_service {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(err) => return errors::service_error_to_response(err),
        }
    };
}

/// Editor for a new order: every medicine of the supplier at zero.
pub async fn open_new_editor(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::OpenEditorRequest>,
) -> Response {
    let warehouse_id: WarehouseId = try_resp!(errors::parse_id(&body.warehouse_id));
    let supplier_id: SupplierId = try_resp!(errors::parse_id(&body.supplier_id));

    let editor = try_service!(services.orders.open_new(warehouse_id, supplier_id).await);
    (StatusCode::OK, Json(dto::editor_to_json(&editor))).into_response()
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateOrderRequest>,
) -> Response {
    let warehouse_id: WarehouseId = try_resp!(errors::parse_id(&body.warehouse_id));
    let supplier_id: SupplierId = try_resp!(errors::parse_id(&body.supplier_id));
    let status = try_resp!(dto::parse_initial_status(body.status.as_deref()));
    let quantities = try_resp!(dto::parse_quantities(&body.items));

    let mut editor = try_service!(services.orders.open_new(warehouse_id, supplier_id).await);
    try_resp!(set_quantities(&mut editor, &quantities));

    let order = try_service!(services.orders.create(&editor, status).await);
    (StatusCode::CREATED, Json(dto::order_to_json(&order))).into_response()
}

pub async fn get_order(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> Response {
    let order_id: OrderId = try_resp!(errors::parse_id(&id));
    let order = try_service!(services.orders.fetch(order_id).await);
    (StatusCode::OK, Json(dto::order_to_json(&order))).into_response()
}

pub async fn open_editor(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> Response {
    let order_id: OrderId = try_resp!(errors::parse_id(&id));
    let editor = try_service!(services.orders.open(order_id).await);
    (StatusCode::OK, Json(dto::editor_to_json(&editor))).into_response()
}

/// Save edited quantities. Lines not mentioned keep their current quantity.
pub async fn update_items(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateItemsRequest>,
) -> Response {
    let order_id: OrderId = try_resp!(errors::parse_id(&id));
    let quantities = try_resp!(dto::parse_quantities(&body.items));

    let mut editor = try_service!(services.orders.open(order_id).await);
    try_resp!(set_quantities(&mut editor, &quantities));

    match try_service!(services.orders.apply_edit(&editor).await) {
        EditOutcome::Updated(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        EditOutcome::NoChanges => (StatusCode::OK, Json(json!({ "status": "no_changes" }))).into_response(),
    }
}

pub async fn send_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::SendOrderRequest>,
) -> Response {
    let order_id: OrderId = try_resp!(errors::parse_id(&id));
    let quantities = try_resp!(dto::parse_quantities(&body.items));

    let mut editor = try_service!(services.orders.open(order_id).await);
    try_resp!(set_quantities(&mut editor, &quantities));

    let order = try_service!(services.orders.send(&editor, body.confirmed).await);
    (StatusCode::OK, Json(dto::order_to_json(&order))).into_response()
}

pub async fn receive_goods(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReceiveGoodsRequest>,
) -> Response {
    let order_id: OrderId = try_resp!(errors::parse_id(&id));

    let result = if body.all_outstanding {
        services.orders.receive_all_outstanding(order_id).await
    } else {
        let submission: ReceiptSubmission = try_resp!(dto::parse_submission(&body.lines));
        services.orders.receive(order_id, submission).await
    };
    let order = try_service!(result);
    (StatusCode::OK, Json(dto::order_to_json(&order))).into_response()
}

pub async fn cancel_order(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> Response {
    let order_id: OrderId = try_resp!(errors::parse_id(&id));
    try_service!(services.orders.cancel(order_id).await);
    StatusCode::NO_CONTENT.into_response()
}

pub async fn get_fulfilment(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> Response {
    let order_id: OrderId = try_resp!(errors::parse_id(&id));
    let fulfilment = try_service!(services.orders.fulfilment(order_id).await);
    (
        StatusCode::OK,
        Json(json!({
            "total_requested": fulfilment.total_requested,
            "total_received": fulfilment.total_received,
            "total_outstanding": fulfilment.total_outstanding,
            "fill_ratio": fulfilment.fill_ratio(),
            "lines": fulfilment.lines,
        })),
    )
        .into_response()
}

fn set_quantities(editor: &mut OrderEditor, quantities: &[(medcamp_core::MedicineId, i64)]) -> Result<(), Response> {
    editor
        .set_quantities(quantities)
        .map_err(errors::domain_error_to_response)
}
