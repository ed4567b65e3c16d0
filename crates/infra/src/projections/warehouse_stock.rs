use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use uuid::Uuid;

use medcamp_core::{DomainError, MedicineId, WarehouseId};
use medcamp_events::EventEnvelope;
use medcamp_replenishment::OrderEvent;

use crate::catalog::InMemoryCatalog;

/// Where received stock is booked.
pub trait StockLedger: Send + Sync {
    /// Add `delta` to the warehouse's on-hand quantity; returns the new total.
    fn add_received(
        &self,
        warehouse_id: WarehouseId,
        medicine_id: MedicineId,
        delta: i64,
    ) -> Result<i64, DomainError>;
}

impl<S> StockLedger for Arc<S>
where
    S: StockLedger + ?Sized,
{
    fn add_received(
        &self,
        warehouse_id: WarehouseId,
        medicine_id: MedicineId,
        delta: i64,
    ) -> Result<i64, DomainError> {
        (**self).add_received(warehouse_id, medicine_id, delta)
    }
}

impl StockLedger for InMemoryCatalog {
    fn add_received(
        &self,
        warehouse_id: WarehouseId,
        medicine_id: MedicineId,
        delta: i64,
    ) -> Result<i64, DomainError> {
        InMemoryCatalog::add_received(self, warehouse_id, medicine_id, delta)
    }
}

#[derive(Debug, Error)]
pub enum StockProjectionError {
    #[error("event order_id does not match envelope order_id")]
    OrderMismatch,

    #[error("failed to book received stock: {0}")]
    Ledger(#[from] DomainError),

    #[error("projection state lock poisoned")]
    Poisoned,
}

/// Warehouse stock projection.
///
/// Consumes published `GoodsReceived` envelopes and books each line's delta
/// into the ledger. Other events are ignored. Redelivered envelopes are
/// skipped by `event_id`, so delivery may be at-least-once.
#[derive(Debug)]
pub struct WarehouseStockProjection<S>
where
    S: StockLedger,
{
    ledger: S,
    applied: RwLock<HashSet<Uuid>>,
}

impl<S> WarehouseStockProjection<S>
where
    S: StockLedger,
{
    pub fn new(ledger: S) -> Self {
        Self {
            ledger,
            applied: RwLock::new(HashSet::new()),
        }
    }

    pub fn ledger(&self) -> &S {
        &self.ledger
    }

    /// Number of receipt envelopes booked so far.
    pub fn applied_count(&self) -> usize {
        self.applied.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<OrderEvent>) -> Result<(), StockProjectionError> {
        let OrderEvent::GoodsReceived(received) = envelope.payload() else {
            return Ok(());
        };
        if received.order_id != envelope.order_id() {
            return Err(StockProjectionError::OrderMismatch);
        }

        let mut applied = self.applied.write().map_err(|_| StockProjectionError::Poisoned)?;
        if applied.contains(&envelope.event_id()) {
            // Duplicate delivery; already booked.
            return Ok(());
        }

        for line in received.lines.iter().filter(|l| l.delta > 0) {
            let on_hand = self
                .ledger
                .add_received(received.warehouse_id, line.medicine_id, line.delta)?;
            tracing::debug!(
                warehouse_id = %received.warehouse_id,
                medicine = %line.medicine_name,
                delta = line.delta,
                on_hand,
                "received stock booked"
            );
        }

        applied.insert(envelope.event_id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use medcamp_core::OrderId;
    use medcamp_replenishment::{GoodsReceived, OrderCancelled, OrderStatus, ReceivedLine};

    fn receipt(order_id: OrderId, warehouse_id: WarehouseId, medicine_id: MedicineId, delta: i64) -> OrderEvent {
        OrderEvent::GoodsReceived(GoodsReceived {
            order_id,
            warehouse_id,
            lines: vec![ReceivedLine {
                medicine_id,
                medicine_name: "Paracetamol".into(),
                requested_quantity: 100,
                delta,
                received_quantity: delta,
            }],
            status: OrderStatus::Partial,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn receipts_increment_on_hand_once_per_envelope() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let projection = WarehouseStockProjection::new(catalog.clone());
        let (order_id, warehouse, para) = (OrderId::new(), WarehouseId::new(), MedicineId::new());
        catalog.set_on_hand(warehouse, para, 5).unwrap();

        let env = EventEnvelope::wrap(order_id, "replenishment.order", receipt(order_id, warehouse, para, 60));
        projection.apply_envelope(&env).unwrap();
        projection.apply_envelope(&env).unwrap();

        assert_eq!(catalog.inventory(&warehouse).unwrap().on_hand(&para), 65);
        assert_eq!(projection.applied_count(), 1);

        let next = EventEnvelope::wrap(order_id, "replenishment.order", receipt(order_id, warehouse, para, 40));
        projection.apply_envelope(&next).unwrap();
        assert_eq!(catalog.inventory(&warehouse).unwrap().on_hand(&para), 105);
    }

    #[test]
    fn other_events_are_ignored() {
        let projection = WarehouseStockProjection::new(InMemoryCatalog::new());
        let order_id = OrderId::new();
        let env = EventEnvelope::wrap(
            order_id,
            "replenishment.order",
            OrderEvent::OrderCancelled(OrderCancelled {
                order_id,
                occurred_at: Utc::now(),
            }),
        );
        projection.apply_envelope(&env).unwrap();
        assert_eq!(projection.applied_count(), 0);
    }

    #[test]
    fn mismatched_envelope_is_rejected() {
        let projection = WarehouseStockProjection::new(InMemoryCatalog::new());
        let env = EventEnvelope::wrap(
            OrderId::new(),
            "replenishment.order",
            receipt(OrderId::new(), WarehouseId::new(), MedicineId::new(), 1),
        );
        assert!(matches!(
            projection.apply_envelope(&env),
            Err(StockProjectionError::OrderMismatch)
        ));
    }
}
