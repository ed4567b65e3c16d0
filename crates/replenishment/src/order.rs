use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medcamp_core::{Aggregate, AggregateRoot, DomainError, DomainResult, OrderId, SupplierId, WarehouseId};
use medcamp_events::Event;

use crate::diff::{apply_diff, diff, diff_for_update, ItemDiff};
use crate::item_set::OrderItemSet;
use crate::receipt::{Fulfilment, ReceiptSubmission, ReceivedLine};

/// Replenishment order status lifecycle.
///
/// ```text
/// DRAFT --send--> PENDING --receive--> PARTIAL --receive--> RECEIVED
///   |               |   \_____________receive______________/^
///   +--cancel--+----+
/// ```
///
/// There is no cancelled state: cancelling deletes the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OrderStatus {
    Draft,
    Pending,
    Partial,
    Received,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "DRAFT",
            OrderStatus::Pending => "PENDING",
            OrderStatus::Partial => "PARTIAL",
            OrderStatus::Received => "RECEIVED",
        }
    }

    /// Line quantities may still be edited.
    pub fn is_editable(&self) -> bool {
        matches!(self, OrderStatus::Draft | OrderStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Received)
    }

    pub fn accepts_receipts(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Partial)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    /// Backends are inconsistent about casing; anything outside the four
    /// states is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(OrderStatus::Draft),
            "PENDING" => Ok(OrderStatus::Pending),
            "PARTIAL" => Ok(OrderStatus::Partial),
            "RECEIVED" => Ok(OrderStatus::Received),
            _ => Err(DomainError::invariant(format!("unknown order status {s:?}"))),
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Statuses an order may be created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InitialStatus {
    Draft,
    Pending,
}

impl From<InitialStatus> for OrderStatus {
    fn from(status: InitialStatus) -> Self {
        match status {
            InitialStatus::Draft => OrderStatus::Draft,
            InitialStatus::Pending => OrderStatus::Pending,
        }
    }
}

/// Persisted shape of an order as the repository returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub warehouse_id: WarehouseId,
    pub supplier_id: SupplierId,
    pub status: OrderStatus,
    pub items: OrderItemSet,
    pub created_at: DateTime<Utc>,
}

/// Aggregate root: a replenishment order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    warehouse_id: WarehouseId,
    supplier_id: SupplierId,
    status: OrderStatus,
    items: OrderItemSet,
    created_at: DateTime<Utc>,
    version: u64,
}

impl Order {
    /// Decide the creation of a new order. The id is assigned on persistence.
    pub fn place(cmd: &PlaceOrder) -> DomainResult<OrderPlaced> {
        let items = cmd.items.require_non_zero()?;
        Ok(OrderPlaced {
            warehouse_id: cmd.warehouse_id,
            supplier_id: cmd.supplier_id,
            status: cmd.status,
            items,
            occurred_at: cmd.occurred_at,
        })
    }

    /// In-memory order for a creation the repository accepted.
    pub fn placed(id: OrderId, created_at: DateTime<Utc>, event: &OrderPlaced) -> Self {
        Self {
            id,
            warehouse_id: event.warehouse_id,
            supplier_id: event.supplier_id,
            status: event.status.into(),
            items: event.items.clone(),
            created_at,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &OrderItemSet {
        &self.items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn fulfilment(&self) -> Fulfilment {
        Fulfilment::of(&self.items)
    }

    pub fn to_record(&self) -> OrderRecord {
        OrderRecord {
            id: self.id,
            warehouse_id: self.warehouse_id,
            supplier_id: self.supplier_id,
            status: self.status,
            items: self.items.clone(),
            created_at: self.created_at,
        }
    }
}

impl TryFrom<OrderRecord> for Order {
    type Error = DomainError;

    /// Rehydrate from a repository record, refusing status/quantity
    /// combinations the lifecycle cannot produce.
    fn try_from(record: OrderRecord) -> Result<Self, Self::Error> {
        let items = &record.items;
        let consistent = match record.status {
            OrderStatus::Draft | OrderStatus::Pending => !items.has_receipts(),
            OrderStatus::Partial => items.has_receipts() && !items.is_fully_received(),
            OrderStatus::Received => items.is_fully_received(),
        };
        if !consistent {
            return Err(DomainError::invariant(format!(
                "order {} is {} but its received quantities disagree",
                record.id, record.status
            )));
        }

        Ok(Self {
            id: record.id,
            warehouse_id: record.warehouse_id,
            supplier_id: record.supplier_id,
            status: record.status,
            items: record.items,
            created_at: record.created_at,
            version: 0,
        })
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: create an order as a draft or send it straight away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub warehouse_id: WarehouseId,
    pub supplier_id: SupplierId,
    pub status: InitialStatus,
    pub items: OrderItemSet,
    pub occurred_at: DateTime<Utc>,
}

/// Command: save edited quantities.
///
/// `edited` is the editor's whole item set, zero lines included. A draft is
/// updated with the diff against its loaded lines; a pending order has its
/// lines replaced with the non-zero set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyEdit {
    pub order_id: OrderId,
    pub edited: OrderItemSet,
    pub occurred_at: DateTime<Utc>,
}

/// Command: send a draft to the supplier (DRAFT -> PENDING).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOrder {
    pub order_id: OrderId,
    pub edited: OrderItemSet,
    pub confirmed: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: record a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveGoods {
    pub order_id: OrderId,
    pub submission: ReceiptSubmission,
    pub occurred_at: DateTime<Utc>,
}

/// Command: cancel (delete) an order nothing was received for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    ApplyEdit(ApplyEdit),
    Send(SendOrder),
    Receive(ReceiveGoods),
    Cancel(CancelOrder),
}

/// Event: an order was created with its full non-zero item set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub warehouse_id: WarehouseId,
    pub supplier_id: SupplierId,
    pub status: InitialStatus,
    pub items: OrderItemSet,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a draft was updated in place with a line diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRevised {
    pub order_id: OrderId,
    pub diff: ItemDiff,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a pending order's lines were replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRevised {
    pub order_id: OrderId,
    pub items: OrderItemSet,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a draft was sent with its full non-zero item set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSent {
    pub order_id: OrderId,
    pub items: OrderItemSet,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GoodsReceived.
///
/// Carries per-line deltas so the warehouse inventory can be incremented by
/// exactly what arrived, and the resulting status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceived {
    pub order_id: OrderId,
    pub warehouse_id: WarehouseId,
    pub lines: Vec<ReceivedLine>,
    pub status: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: the order was cancelled and its record deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    DraftRevised(DraftRevised),
    PendingRevised(PendingRevised),
    OrderSent(OrderSent),
    GoodsReceived(GoodsReceived),
    OrderCancelled(OrderCancelled),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "replenishment.order.placed",
            OrderEvent::DraftRevised(_) => "replenishment.order.draft_revised",
            OrderEvent::PendingRevised(_) => "replenishment.order.pending_revised",
            OrderEvent::OrderSent(_) => "replenishment.order.sent",
            OrderEvent::GoodsReceived(_) => "replenishment.order.goods_received",
            OrderEvent::OrderCancelled(_) => "replenishment.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::DraftRevised(e) => e.occurred_at,
            OrderEvent::PendingRevised(e) => e.occurred_at,
            OrderEvent::OrderSent(e) => e.occurred_at,
            OrderEvent::GoodsReceived(e) => e.occurred_at,
            OrderEvent::OrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.warehouse_id = e.warehouse_id;
                self.supplier_id = e.supplier_id;
                self.status = e.status.into();
                self.items = e.items.clone();
            }
            OrderEvent::DraftRevised(e) => match apply_diff(&self.items, &e.diff) {
                Ok(next) => self.items = next,
                // Decided against these items, so only a foreign diff can fail;
                // it is not applied and does not count as a transition.
                Err(_) => return,
            },
            OrderEvent::PendingRevised(e) => {
                self.items = e.items.clone();
            }
            OrderEvent::OrderSent(e) => {
                self.items = e.items.clone();
                self.status = OrderStatus::Pending;
            }
            OrderEvent::GoodsReceived(e) => {
                for line in &e.lines {
                    self.items.record_received(&line.medicine_id, line.received_quantity);
                }
                self.status = e.status;
            }
            OrderEvent::OrderCancelled(_) => {}
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::ApplyEdit(cmd) => self.handle_apply_edit(cmd),
            OrderCommand::Send(cmd) => self.handle_send(cmd),
            OrderCommand::Receive(cmd) => self.handle_receive(cmd),
            OrderCommand::Cancel(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl Order {
    fn ensure_order_id(&self, order_id: OrderId) -> DomainResult<()> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_apply_edit(&self, cmd: &ApplyEdit) -> DomainResult<Vec<OrderEvent>> {
        self.ensure_order_id(cmd.order_id)?;

        match self.status {
            OrderStatus::Draft => {
                cmd.edited.require_non_zero()?;
                let diff = diff_for_update(&self.items, &cmd.edited)?;
                // Catch removals of received lines before they reach the repository.
                apply_diff(&self.items, &diff)?;
                Ok(vec![OrderEvent::DraftRevised(DraftRevised {
                    order_id: cmd.order_id,
                    diff,
                    occurred_at: cmd.occurred_at,
                })])
            }
            OrderStatus::Pending => {
                let items = cmd.edited.require_non_zero()?;
                if diff(&self.items, &cmd.edited).is_empty() {
                    return Err(DomainError::NoChanges);
                }
                Ok(vec![OrderEvent::PendingRevised(PendingRevised {
                    order_id: cmd.order_id,
                    items,
                    occurred_at: cmd.occurred_at,
                })])
            }
            status => Err(DomainError::illegal_transition(status, "edit")),
        }
    }

    fn handle_send(&self, cmd: &SendOrder) -> DomainResult<Vec<OrderEvent>> {
        self.ensure_order_id(cmd.order_id)?;

        if self.status != OrderStatus::Draft {
            return Err(DomainError::illegal_transition(self.status, "send"));
        }
        let items = cmd.edited.require_non_zero()?;
        if !cmd.confirmed {
            return Err(DomainError::ConfirmationRequired);
        }

        Ok(vec![OrderEvent::OrderSent(OrderSent {
            order_id: cmd.order_id,
            items,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(&self, cmd: &ReceiveGoods) -> DomainResult<Vec<OrderEvent>> {
        self.ensure_order_id(cmd.order_id)?;

        if !self.status.accepts_receipts() {
            return Err(DomainError::illegal_transition(self.status, "receive goods for"));
        }
        let plan = cmd.submission.evaluate(&self.items)?;

        Ok(vec![OrderEvent::GoodsReceived(GoodsReceived {
            order_id: cmd.order_id,
            warehouse_id: self.warehouse_id,
            lines: plan.lines,
            status: plan.status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> DomainResult<Vec<OrderEvent>> {
        self.ensure_order_id(cmd.order_id)?;

        // Received stock cannot be un-received, so neither can the order.
        if self.items.has_receipts() || !self.status.is_editable() {
            let lines = self
                .items
                .iter()
                .filter(|l| l.received_quantity > 0)
                .map(|l| l.medicine_name.clone())
                .collect();
            return Err(DomainError::IllegalCancellation { lines });
        }

        Ok(vec![OrderEvent::OrderCancelled(OrderCancelled {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
