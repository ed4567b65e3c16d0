use serde::Deserialize;
use serde_json::json;

use medcamp_catalog::WarehouseInventory;
use medcamp_core::{DomainError, MedicineId};
use medcamp_replenishment::{InitialStatus, Order, OrderEditor, OrderStatus, ReceiptSubmission};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct OpenEditorRequest {
    pub warehouse_id: String,
    pub supplier_id: String,
}

/// One `(medicine, quantity)` pair, for requested or received quantities.
#[derive(Debug, Deserialize)]
pub struct LineQuantityRequest {
    pub medicine_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub warehouse_id: String,
    pub supplier_id: String,
    /// `DRAFT` (default) or `PENDING` to send on creation.
    pub status: Option<String>,
    #[serde(default)]
    pub items: Vec<LineQuantityRequest>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemsRequest {
    pub items: Vec<LineQuantityRequest>,
}

#[derive(Debug, Deserialize)]
pub struct SendOrderRequest {
    #[serde(default)]
    pub confirmed: bool,
    /// Last edits to apply before sending.
    #[serde(default)]
    pub items: Vec<LineQuantityRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveGoodsRequest {
    #[serde(default)]
    pub lines: Vec<LineQuantityRequest>,
    /// Receive everything outstanding; `lines` is ignored.
    #[serde(default)]
    pub all_outstanding: bool,
}

// -------------------------
// Request mapping
// -------------------------

pub fn parse_quantities(lines: &[LineQuantityRequest]) -> Result<Vec<(MedicineId, i64)>, axum::response::Response> {
    lines
        .iter()
        .map(|l| Ok((errors::parse_id::<MedicineId>(&l.medicine_id)?, l.quantity)))
        .collect()
}

pub fn parse_submission(lines: &[LineQuantityRequest]) -> Result<ReceiptSubmission, axum::response::Response> {
    Ok(parse_quantities(lines)?
        .into_iter()
        .fold(ReceiptSubmission::new(), |s, (id, qty)| s.with(id, qty)))
}

pub fn parse_initial_status(raw: Option<&str>) -> Result<InitialStatus, axum::response::Response> {
    let Some(raw) = raw else {
        return Ok(InitialStatus::Draft);
    };
    match raw.parse::<OrderStatus>() {
        Ok(OrderStatus::Draft) => Ok(InitialStatus::Draft),
        Ok(OrderStatus::Pending) => Ok(InitialStatus::Pending),
        Ok(other) => Err(errors::domain_error_to_response(DomainError::illegal_transition(
            other, "create",
        ))),
        Err(e) => Err(errors::domain_error_to_response(e)),
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn order_to_json(order: &Order) -> serde_json::Value {
    let record = order.to_record();
    json!({
        "id": record.id.to_string(),
        "warehouse_id": record.warehouse_id.to_string(),
        "supplier_id": record.supplier_id.to_string(),
        "status": record.status,
        "created_at": record.created_at.to_rfc3339(),
        "items": record.items,
        "fulfilment": order.fulfilment(),
    })
}

pub fn editor_to_json(editor: &OrderEditor) -> serde_json::Value {
    json!({
        "order_id": editor.order().map(|o| o.id_typed().to_string()),
        "status": editor.status(),
        "warehouse_id": editor.warehouse_id().to_string(),
        "supplier_id": editor.supplier_id().to_string(),
        "dirty": editor.is_dirty(),
        "lines": editor.lines(),
    })
}

pub fn stock_to_json(inventory: &WarehouseInventory) -> serde_json::Value {
    let items = inventory
        .iter()
        .map(|(medicine_id, on_hand)| json!({ "medicine_id": medicine_id.to_string(), "on_hand": on_hand }))
        .collect::<Vec<_>>();
    json!({
        "warehouse_id": inventory.warehouse_id().to_string(),
        "items": items,
    })
}
