use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use medcamp_core::{DomainError, OrderId};
use medcamp_replenishment::{apply_diff, Order, OrderRecord, OrderStatus};

use super::{NewOrder, OrderRepository, OrderUpdate, RepositoryError};

/// In-memory order repository for tests/dev.
///
/// Applies the same line invariants a real backend enforces and rejects
/// updates that would leave the record in a state the lifecycle cannot
/// produce. Rejections leave the stored record unchanged.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    inner: RwLock<HashMap<OrderId, OrderRecord>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn rejected(err: DomainError) -> RepositoryError {
    RepositoryError::Rejected {
        status: 422,
        body: err.to_string(),
    }
}

/// Line edits only reach orders nothing was received for.
fn ensure_lines_editable(record: &OrderRecord) -> Result<(), DomainError> {
    if !record.status.is_editable() || record.items.has_receipts() {
        return Err(DomainError::illegal_transition(record.status, "replace lines of"));
    }
    Ok(())
}

fn apply_update(record: &OrderRecord, update: OrderUpdate) -> Result<OrderRecord, DomainError> {
    let mut next = record.clone();
    match update {
        OrderUpdate::ReviseLines { changes } => {
            ensure_lines_editable(record)?;
            next.items = apply_diff(&record.items, &changes)?;
        }
        OrderUpdate::ReplaceLines { items, status } => {
            ensure_lines_editable(record)?;
            next.items = items;
            next.status = status;
        }
        OrderUpdate::RecordReceipt { lines, status } => {
            for line in &lines {
                let current = record
                    .items
                    .get(&line.medicine_id)
                    .map(|l| l.received_quantity)
                    .ok_or_else(|| DomainError::UnknownLine(line.medicine_name.clone()))?;
                if line.received_quantity < current {
                    return Err(DomainError::invariant(format!(
                        "received quantity for {} cannot decrease",
                        line.medicine_name
                    )));
                }
                next.items.set_received_quantity(&line.medicine_id, line.received_quantity)?;
            }
            next.status = status;
        }
    }

    // Status and quantities must agree.
    Order::try_from(next.clone())?;
    Ok(next)
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create_order(&self, order: NewOrder) -> Result<OrderRecord, RepositoryError> {
        if order.items.non_zero_items().is_empty() {
            return Err(rejected(DomainError::EmptyOrder));
        }
        let record = OrderRecord {
            id: OrderId::new(),
            warehouse_id: order.warehouse_id,
            supplier_id: order.supplier_id,
            status: OrderStatus::from(order.status),
            items: order.items.non_zero_items(),
            created_at: Utc::now(),
        };

        let mut map = self.inner.write().map_err(|_| RepositoryError::Poisoned)?;
        map.insert(record.id, record.clone());
        Ok(record)
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<OrderRecord, RepositoryError> {
        let map = self.inner.read().map_err(|_| RepositoryError::Poisoned)?;
        map.get(&order_id).cloned().ok_or(RepositoryError::NotFound(order_id))
    }

    async fn update_order(&self, order_id: OrderId, update: OrderUpdate) -> Result<OrderRecord, RepositoryError> {
        // Single write lock: updates on the same order apply in submission order.
        let mut map = self.inner.write().map_err(|_| RepositoryError::Poisoned)?;
        let record = map.get(&order_id).ok_or(RepositoryError::NotFound(order_id))?;

        let next = apply_update(record, update).map_err(rejected)?;
        map.insert(order_id, next.clone());
        Ok(next)
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(|_| RepositoryError::Poisoned)?;
        map.remove(&order_id).map(|_| ()).ok_or(RepositoryError::NotFound(order_id))
    }
}
