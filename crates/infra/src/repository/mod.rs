//! Order repository port and adapters.
//!
//! The repository is the system of record for orders. It assigns ids and
//! creation times, and applies each update atomically: an update either lands
//! completely or leaves the order untouched. It does not check versions;
//! concurrent updates to the same order are last-write-wins.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use medcamp_core::{OrderId, SupplierId, WarehouseId};
use medcamp_replenishment::{
    InitialStatus, ItemDiff, OrderEvent, OrderItemSet, OrderPlaced, OrderRecord, OrderStatus, ReceivedLine,
};

pub mod http;
pub mod in_memory;

pub use http::HttpOrderRepository;
pub use in_memory::InMemoryOrderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("repository transport failure: {0}")]
    Transport(String),

    #[error("repository rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to decode repository response: {0}")]
    Decode(String),

    #[error("repository lock poisoned")]
    Poisoned,
}

/// Payload of `create_order`: the full non-zero item set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub warehouse_id: WarehouseId,
    pub supplier_id: SupplierId,
    pub status: InitialStatus,
    pub items: OrderItemSet,
}

impl From<&OrderPlaced> for NewOrder {
    fn from(e: &OrderPlaced) -> Self {
        Self {
            warehouse_id: e.warehouse_id,
            supplier_id: e.supplier_id,
            status: e.status,
            items: e.items.clone(),
        }
    }
}

/// Payload of `update_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderUpdate {
    /// Draft update in place: only the changed lines, zero meaning removal.
    ReviseLines { changes: ItemDiff },
    /// Replace every line (pending revision, send).
    ReplaceLines { items: OrderItemSet, status: OrderStatus },
    /// Record a delivery. Lines carry cumulative received quantities.
    RecordReceipt { lines: Vec<ReceivedLine>, status: OrderStatus },
}

impl OrderUpdate {
    /// Repository update for a decided event, if the event changes the record.
    pub fn from_event(event: &OrderEvent) -> Option<Self> {
        match event {
            OrderEvent::DraftRevised(e) => Some(OrderUpdate::ReviseLines { changes: e.diff.clone() }),
            OrderEvent::PendingRevised(e) => Some(OrderUpdate::ReplaceLines {
                items: e.items.clone(),
                status: OrderStatus::Pending,
            }),
            OrderEvent::OrderSent(e) => Some(OrderUpdate::ReplaceLines {
                items: e.items.clone(),
                status: OrderStatus::Pending,
            }),
            OrderEvent::GoodsReceived(e) => Some(OrderUpdate::RecordReceipt {
                lines: e.lines.clone(),
                status: e.status,
            }),
            OrderEvent::OrderPlaced(_) | OrderEvent::OrderCancelled(_) => None,
        }
    }

    /// Status the update moves the order to, when it changes status.
    pub fn status(&self) -> Option<OrderStatus> {
        match self {
            OrderUpdate::ReviseLines { .. } => None,
            OrderUpdate::ReplaceLines { status, .. } | OrderUpdate::RecordReceipt { status, .. } => Some(*status),
        }
    }
}

/// Order persistence port.
#[async_trait::async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create_order(&self, order: NewOrder) -> Result<OrderRecord, RepositoryError>;

    /// Full item set, received quantities included.
    async fn fetch_order(&self, order_id: OrderId) -> Result<OrderRecord, RepositoryError>;

    async fn update_order(&self, order_id: OrderId, update: OrderUpdate) -> Result<OrderRecord, RepositoryError>;

    /// Callers verify nothing was received before deleting.
    async fn delete_order(&self, order_id: OrderId) -> Result<(), RepositoryError>;
}

#[async_trait::async_trait]
impl<R> OrderRepository for Arc<R>
where
    R: OrderRepository + ?Sized,
{
    async fn create_order(&self, order: NewOrder) -> Result<OrderRecord, RepositoryError> {
        (**self).create_order(order).await
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<OrderRecord, RepositoryError> {
        (**self).fetch_order(order_id).await
    }

    async fn update_order(&self, order_id: OrderId, update: OrderUpdate) -> Result<OrderRecord, RepositoryError> {
        (**self).update_order(order_id, update).await
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<(), RepositoryError> {
        (**self).delete_order(order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use medcamp_core::MedicineId;
    use medcamp_replenishment::{GoodsReceived, OrderCancelled, OrderLineItem};

    #[test]
    fn update_payload_is_tagged_by_kind() {
        let items = OrderItemSet::from_items(vec![OrderLineItem::new(MedicineId::new(), "ORS", 4)]).unwrap();
        let json = serde_json::to_value(OrderUpdate::ReplaceLines {
            items,
            status: OrderStatus::Pending,
        })
        .unwrap();

        assert_eq!(json["kind"], "replace_lines");
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["items"][0]["requested_quantity"], 4);
    }

    #[test]
    fn receipts_map_to_status_changing_updates() {
        let order_id = OrderId::new();
        let update = OrderUpdate::from_event(&OrderEvent::GoodsReceived(GoodsReceived {
            order_id,
            warehouse_id: WarehouseId::new(),
            lines: vec![],
            status: OrderStatus::Partial,
            occurred_at: Utc::now(),
        }))
        .unwrap();
        assert_eq!(update.status(), Some(OrderStatus::Partial));

        let cancelled = OrderEvent::OrderCancelled(OrderCancelled {
            order_id,
            occurred_at: Utc::now(),
        });
        assert!(OrderUpdate::from_event(&cancelled).is_none());
    }
}
