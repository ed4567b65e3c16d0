//! Replenishment orchestration (application-level).
//!
//! Every transition runs the same pipeline:
//!
//! ```text
//! acquire edit lock (refuse if the order is already in flight)
//!   ↓
//! decide: Order::handle(command) plus catalog checks (no IO on the order)
//!   ↓
//! persist: one repository call per decided event
//!   ↓
//! publish the accepted events on the bus
//! ```
//!
//! All validation happens before the repository is called, so a refused
//! transition leaves the persisted order untouched. Repository failures are
//! passed through and never retried.

use chrono::Utc;
use thiserror::Error;

use medcamp_core::{Aggregate, DomainError, OrderId, SupplierId, WarehouseId};
use medcamp_events::{EventBus, EventEnvelope};
use medcamp_replenishment::{
    CancelOrder, Fulfilment, InitialStatus, Order, OrderCommand, OrderEditor, OrderEvent, OrderItemSet,
    OrderLineItem, ReceiptSubmission, ReceiveGoods,
};

use crate::catalog::{CatalogError, CatalogLookup};
use crate::edit_lock::{EditGuard, EditLocks};
use crate::repository::{NewOrder, OrderRepository, OrderUpdate, RepositoryError};

/// Aggregate type stamped on every published envelope.
pub const AGGREGATE_TYPE: &str = "replenishment.order";

pub type OrderEnvelope = EventEnvelope<OrderEvent>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("order {0} already has a transition in flight")]
    EditInProgress(OrderId),

    /// The transition was persisted but could not be published.
    #[error("transition persisted but publishing failed: {0}")]
    Publish(String),
}

impl ServiceError {
    pub fn is_soft(&self) -> bool {
        matches!(self, ServiceError::Domain(e) if e.is_soft())
    }
}

/// Result of saving an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Updated(Order),
    /// Nothing differed from the loaded order; nothing was sent.
    NoChanges,
}

/// Replenishment order service over a repository, a catalog and a bus.
#[derive(Debug)]
pub struct ReplenishmentService<R, C, B> {
    repository: R,
    catalog: C,
    bus: B,
    locks: EditLocks,
}

impl<R, C, B> ReplenishmentService<R, C, B> {
    pub fn new(repository: R, catalog: C, bus: B) -> Self {
        Self {
            repository,
            catalog,
            bus,
            locks: EditLocks::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn is_in_flight(&self, order_id: &OrderId) -> bool {
        self.locks.is_locked(order_id)
    }

    fn lock(&self, order_id: OrderId) -> Result<EditGuard<'_>, ServiceError> {
        self.locks.try_acquire(order_id).ok_or_else(|| {
            tracing::warn!(%order_id, "transition refused: order already in flight");
            ServiceError::EditInProgress(order_id)
        })
    }
}

impl<R, C, B> ReplenishmentService<R, C, B>
where
    R: OrderRepository,
    C: CatalogLookup,
    B: EventBus<OrderEnvelope>,
{
    /// Editor for a new order: every supplier medicine at zero.
    #[tracing::instrument(skip(self))]
    pub async fn open_new(
        &self,
        warehouse_id: WarehouseId,
        supplier_id: SupplierId,
    ) -> Result<OrderEditor, ServiceError> {
        let medicines = self.catalog.medicines_for_supplier(supplier_id).await?;
        let on_hand = self.catalog.on_hand_for(warehouse_id, &medicines).await?;
        Ok(OrderEditor::for_new(warehouse_id, supplier_id, &medicines, on_hand)?)
    }

    /// Editor for a persisted order, seeded with its lines and the rest of
    /// the supplier catalog at zero.
    #[tracing::instrument(skip(self))]
    pub async fn open(&self, order_id: OrderId) -> Result<OrderEditor, ServiceError> {
        let order = self.fetch(order_id).await?;
        let medicines = self.catalog.medicines_for_supplier(order.supplier_id()).await?;
        let on_hand = self.catalog.on_hand_for(order.warehouse_id(), &medicines).await?;
        Ok(OrderEditor::for_order(order, &medicines, on_hand)?)
    }

    pub async fn fetch(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        let record = self.repository.fetch_order(order_id).await?;
        Ok(Order::try_from(record)?)
    }

    pub async fn fulfilment(&self, order_id: OrderId) -> Result<Fulfilment, ServiceError> {
        Ok(self.fetch(order_id).await?.fulfilment())
    }

    /// Persist a new order as a draft, or send it straight away.
    #[tracing::instrument(skip_all, fields(warehouse_id = %editor.warehouse_id(), supplier_id = %editor.supplier_id(), ?status))]
    pub async fn create(&self, editor: &OrderEditor, status: InitialStatus) -> Result<Order, ServiceError> {
        let cmd = editor.place_command(status, Utc::now())?;
        let placed = Order::place(&cmd).inspect_err(|e| warn_refused("create", e))?;
        self.ensure_supplied(editor.supplier_id(), &placed.items).await?;

        let record = self
            .repository
            .create_order(NewOrder::from(&placed))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "create_order failed"))?;
        let order = Order::try_from(record)?;

        tracing::info!(
            order_id = %order.id_typed(),
            status = %order.status(),
            lines = order.items().len(),
            "order created"
        );
        self.publish(order.id_typed(), OrderEvent::OrderPlaced(placed))?;
        Ok(order)
    }

    /// Save the editor's quantities: a diff for drafts, the full set for
    /// pending orders.
    ///
    /// Decided against a fresh read of the order. Requested quantities follow
    /// the last save, but an editor opened before a status change or a
    /// receipt is refused rather than overwriting it.
    #[tracing::instrument(skip_all)]
    pub async fn apply_edit(&self, editor: &OrderEditor) -> Result<EditOutcome, ServiceError> {
        let snapshot = editor.order().ok_or(DomainError::NotFound)?;
        let _guard = self.lock(snapshot.id_typed())?;
        let order = self.reload_unchanged(snapshot, "edit").await?;

        let cmd = editor.apply_edit_command(Utc::now())?;
        let events = match order.handle(&cmd) {
            Ok(events) => events,
            Err(DomainError::NoChanges) => {
                tracing::info!(order_id = %order.id_typed(), "edit has no changes; nothing sent");
                return Ok(EditOutcome::NoChanges);
            }
            Err(e) => {
                warn_refused("edit", &e);
                return Err(e.into());
            }
        };
        self.ensure_supplied(order.supplier_id(), editor.items()).await?;

        let updated = self.persist(&order, events).await?;
        tracing::info!(
            order_id = %updated.id_typed(),
            status = %updated.status(),
            lines = updated.items().len(),
            "order edited"
        );
        Ok(EditOutcome::Updated(updated))
    }

    /// Send a draft to the supplier with its complete non-zero item set.
    #[tracing::instrument(skip(self, editor))]
    pub async fn send(&self, editor: &OrderEditor, confirmed: bool) -> Result<Order, ServiceError> {
        let snapshot = editor.order().ok_or(DomainError::NotFound)?;
        let _guard = self.lock(snapshot.id_typed())?;
        let order = self.reload_unchanged(snapshot, "send").await?;

        let cmd = editor.send_command(confirmed, Utc::now())?;
        let events = order.handle(&cmd).inspect_err(|e| warn_refused("send", e))?;
        self.ensure_supplied(order.supplier_id(), editor.items()).await?;

        let sent = self.persist(&order, events).await?;
        tracing::info!(order_id = %sent.id_typed(), lines = sent.items().len(), "order sent");
        Ok(sent)
    }

    /// Record a delivery against the order's current received quantities.
    #[tracing::instrument(skip(self, submission), fields(entries = submission.entries().len()))]
    pub async fn receive(&self, order_id: OrderId, submission: ReceiptSubmission) -> Result<Order, ServiceError> {
        let _guard = self.lock(order_id)?;

        // Receipts are cumulative, so decide against a fresh read.
        let order = self.fetch(order_id).await?;
        let cmd = OrderCommand::Receive(ReceiveGoods {
            order_id,
            submission,
            occurred_at: Utc::now(),
        });
        let events = order.handle(&cmd).inspect_err(|e| warn_refused("receive", e))?;

        let received = self.persist(&order, events).await?;
        tracing::info!(
            %order_id,
            status = %received.status(),
            received = received.items().total_received(),
            requested = received.items().total_requested(),
            "goods received"
        );
        Ok(received)
    }

    /// Receive everything still outstanding in one delivery.
    pub async fn receive_all_outstanding(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        let order = self.fetch(order_id).await?;
        self.receive(order_id, ReceiptSubmission::outstanding_of(order.items()))
            .await
    }

    /// Cancel (delete) an order nothing was received for.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<(), ServiceError> {
        let _guard = self.lock(order_id)?;

        let order = self.fetch(order_id).await?;
        let events = order
            .handle(&OrderCommand::Cancel(CancelOrder {
                order_id,
                occurred_at: Utc::now(),
            }))
            .inspect_err(|e| warn_refused("cancel", e))?;

        self.repository
            .delete_order(order_id)
            .await
            .inspect_err(|e| tracing::error!(%order_id, error = %e, "delete_order failed"))?;
        tracing::info!(%order_id, "order cancelled");

        for event in events {
            self.publish(order_id, event)?;
        }
        Ok(())
    }

    /// Re-read the order an editor was opened on. Refused when its status or
    /// any received quantity moved since the editor loaded it.
    async fn reload_unchanged(&self, snapshot: &Order, action: &'static str) -> Result<Order, ServiceError> {
        let current = self.fetch(snapshot.id_typed()).await?;
        let received = |order: &Order, line: &OrderLineItem| {
            order
                .items()
                .get(&line.medicine_id)
                .map_or(0, |l| l.received_quantity)
        };
        let receipts_moved = current
            .items()
            .iter()
            .chain(snapshot.items().iter())
            .any(|line| received(&current, line) != received(snapshot, line));

        if current.status() != snapshot.status() || receipts_moved {
            let err = DomainError::illegal_transition(current.status(), action);
            warn_refused(action, &err);
            return Err(err.into());
        }
        Ok(current)
    }

    async fn ensure_supplied(&self, supplier_id: SupplierId, items: &OrderItemSet) -> Result<(), ServiceError> {
        let medicines = self.catalog.medicines_for_supplier(supplier_id).await?;
        items
            .ensure_supplied_by(&medicines)
            .inspect_err(|e| warn_refused("save", e))?;
        Ok(())
    }

    /// Send each decided event to the repository, then publish them all.
    async fn persist(&self, order: &Order, events: Vec<OrderEvent>) -> Result<Order, ServiceError> {
        let order_id = order.id_typed();
        let mut current = order.clone();

        for event in &events {
            let Some(update) = OrderUpdate::from_event(event) else {
                current.apply(event);
                continue;
            };
            let record = self
                .repository
                .update_order(order_id, update)
                .await
                .inspect_err(|e| tracing::error!(%order_id, error = %e, "update_order failed"))?;
            current = Order::try_from(record)?;
        }

        for event in events {
            self.publish(order_id, event)?;
        }
        Ok(current)
    }

    fn publish(&self, order_id: OrderId, event: OrderEvent) -> Result<(), ServiceError> {
        let envelope = EventEnvelope::wrap(order_id, AGGREGATE_TYPE, event);
        let event_type = envelope.event_type().to_string();
        self.bus.publish(envelope).map_err(|e| {
            tracing::error!(%order_id, %event_type, error = ?e, "event publish failed");
            ServiceError::Publish(format!("{e:?}"))
        })
    }
}

fn warn_refused(action: &str, err: &DomainError) {
    if err.is_soft() {
        return;
    }
    tracing::warn!(action, error = %err, lines = ?err.lines(), "transition refused");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::repository::InMemoryOrderRepository;
    use medcamp_catalog::{Medicine, MedicineKind, Supplier};
    use medcamp_core::MedicineId;
    use medcamp_events::InMemoryEventBus;
    use medcamp_replenishment::OrderStatus;

    type TestService = ReplenishmentService<
        Arc<InMemoryOrderRepository>,
        Arc<InMemoryCatalog>,
        Arc<InMemoryEventBus<OrderEnvelope>>,
    >;

    struct Fixture {
        service: TestService,
        warehouse: WarehouseId,
        supplier: Supplier,
    }

    impl Fixture {
        fn new(names: &[&str]) -> Self {
            medcamp_observability::tracing::init_for_tests();
            let supplier = names.iter().fold(Supplier::new(SupplierId::new(), "Camp Pharma"), |s, n| {
                s.with_medicine(Medicine::new(MedicineId::new(), *n, MedicineKind::Tablet))
            });
            let catalog = Arc::new(InMemoryCatalog::new());
            catalog.upsert_supplier(supplier.clone());
            let service = ReplenishmentService::new(
                Arc::new(InMemoryOrderRepository::new()),
                catalog,
                Arc::new(InMemoryEventBus::new()),
            );
            Self {
                service,
                warehouse: WarehouseId::new(),
                supplier,
            }
        }

        fn med(&self, idx: usize) -> MedicineId {
            self.supplier.medicines()[idx].id
        }

        async fn create(&self, quantities: &[(usize, i64)], status: InitialStatus) -> Order {
            let mut editor = self
                .service
                .open_new(self.warehouse, self.supplier.id_typed())
                .await
                .unwrap();
            for (idx, qty) in quantities {
                editor.set_requested(&self.med(*idx), *qty).unwrap();
            }
            self.service.create(&editor, status).await.unwrap()
        }
    }

    #[tokio::test]
    async fn partial_then_full_receipt_publishes_deltas() {
        let fx = Fixture::new(&["Paracetamol"]);
        let sub = fx.service.bus().subscribe();
        let order = fx.create(&[(0, 100)], InitialStatus::Pending).await;
        let para = fx.med(0);

        let partial = fx
            .service
            .receive(order.id_typed(), ReceiptSubmission::new().with(para, 60))
            .await
            .unwrap();
        assert_eq!(partial.status(), OrderStatus::Partial);

        let done = fx.service.receive_all_outstanding(order.id_typed()).await.unwrap();
        assert_eq!(done.status(), OrderStatus::Received);

        let deltas: Vec<i64> = sub
            .drain()
            .into_iter()
            .filter_map(|env| match env.into_payload() {
                OrderEvent::GoodsReceived(e) => Some(e.lines[0].delta),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec![60, 40]);
    }

    #[tokio::test]
    async fn over_receipt_fails_before_the_repository() {
        let fx = Fixture::new(&["Paracetamol"]);
        let order = fx.create(&[(0, 100)], InitialStatus::Pending).await;

        let err = fx
            .service
            .receive(order.id_typed(), ReceiptSubmission::new().with(fx.med(0), 150))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::QuantityExceedsRequested { ref lines }) if lines == &["Paracetamol"]
        ));
        let stored = fx.service.fetch(order.id_typed()).await.unwrap();
        assert_eq!(stored.status(), OrderStatus::Pending);
        assert_eq!(stored.items().total_received(), 0);
    }

    #[tokio::test]
    async fn draft_edit_round_trip_and_no_changes() {
        let fx = Fixture::new(&["A", "B", "C"]);
        let order = fx.create(&[(0, 10), (1, 5)], InitialStatus::Draft).await;

        let mut editor = fx.service.open(order.id_typed()).await.unwrap();
        assert_eq!(editor.lines().len(), 3);
        editor.set_requested(&fx.med(1), 0).unwrap();
        editor.set_requested(&fx.med(2), 3).unwrap();

        let EditOutcome::Updated(updated) = fx.service.apply_edit(&editor).await.unwrap() else {
            panic!("expected an update");
        };
        assert!(updated.items().get(&fx.med(1)).is_none());
        assert_eq!(updated.items().get(&fx.med(2)).unwrap().requested_quantity, 3);

        let reopened = fx.service.open(order.id_typed()).await.unwrap();
        assert_eq!(fx.service.apply_edit(&reopened).await.unwrap(), EditOutcome::NoChanges);
    }

    #[tokio::test]
    async fn send_moves_draft_to_pending() {
        let fx = Fixture::new(&["A"]);
        let order = fx.create(&[(0, 4)], InitialStatus::Draft).await;
        let editor = fx.service.open(order.id_typed()).await.unwrap();

        let err = fx.service.send(&editor, false).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::ConfirmationRequired)));

        let sent = fx.service.send(&editor, true).await.unwrap();
        assert_eq!(sent.status(), OrderStatus::Pending);
        assert!(!fx.service.is_in_flight(&order.id_typed()));
    }

    #[tokio::test]
    async fn empty_order_is_never_created() {
        let fx = Fixture::new(&["A"]);
        let editor = fx
            .service
            .open_new(fx.warehouse, fx.supplier.id_typed())
            .await
            .unwrap();

        let err = fx.service.create(&editor, InitialStatus::Draft).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::EmptyOrder)));
        assert!(fx.service.repository().is_empty());
    }

    #[tokio::test]
    async fn medicines_dropped_by_supplier_are_refused() {
        let fx = Fixture::new(&["A", "B"]);
        let mut editor = fx
            .service
            .open_new(fx.warehouse, fx.supplier.id_typed())
            .await
            .unwrap();
        editor.set_requested(&fx.med(1), 2).unwrap();

        // Supplier stops carrying B while the editor is open.
        let mut shrunk = fx.supplier.clone();
        shrunk.remove_medicine(&fx.med(1));
        fx.service.catalog().upsert_supplier(shrunk);

        let err = fx.service.create(&editor, InitialStatus::Pending).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::MedicineNotSupplied { ref lines }) if lines == &["B"]
        ));
    }

    #[tokio::test]
    async fn cancel_deletes_unreceived_orders_only() {
        let fx = Fixture::new(&["A", "B"]);
        let draft = fx.create(&[(0, 3)], InitialStatus::Draft).await;
        fx.service.cancel(draft.id_typed()).await.unwrap();
        assert!(matches!(
            fx.service.fetch(draft.id_typed()).await,
            Err(ServiceError::Repository(RepositoryError::NotFound(_)))
        ));

        let pending = fx.create(&[(0, 10), (1, 1)], InitialStatus::Pending).await;
        fx.service
            .receive(pending.id_typed(), ReceiptSubmission::new().with(fx.med(0), 2))
            .await
            .unwrap();
        let err = fx.service.cancel(pending.id_typed()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::IllegalCancellation { .. })));
        assert!(fx.service.fetch(pending.id_typed()).await.is_ok());
    }

    #[tokio::test]
    async fn in_flight_orders_refuse_a_second_transition() {
        let fx = Fixture::new(&["A"]);
        let order = fx.create(&[(0, 3)], InitialStatus::Pending).await;

        let _held = fx.service.lock(order.id_typed()).unwrap();
        let err = fx.service.cancel(order.id_typed()).await.unwrap_err();
        assert!(matches!(err, ServiceError::EditInProgress(id) if id == order.id_typed()));
    }

    #[tokio::test]
    async fn edit_opened_before_a_receipt_is_refused() {
        let fx = Fixture::new(&["Paracetamol"]);
        let order = fx.create(&[(0, 100)], InitialStatus::Pending).await;
        let mut editor = fx.service.open(order.id_typed()).await.unwrap();

        fx.service
            .receive(order.id_typed(), ReceiptSubmission::new().with(fx.med(0), 60))
            .await
            .unwrap();
        editor.set_requested(&fx.med(0), 120).unwrap();

        let err = fx.service.apply_edit(&editor).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::IllegalTransition { .. })));
        let stored = fx.service.fetch(order.id_typed()).await.unwrap();
        assert_eq!(stored.status(), OrderStatus::Partial);
        assert_eq!(stored.items().total_received(), 60);
        assert_eq!(stored.items().total_requested(), 100);
        assert!(!fx.service.is_in_flight(&order.id_typed()));
    }

    #[tokio::test]
    async fn draft_sent_elsewhere_cannot_be_sent_again() {
        let fx = Fixture::new(&["A"]);
        let order = fx.create(&[(0, 4)], InitialStatus::Draft).await;
        let first = fx.service.open(order.id_typed()).await.unwrap();
        let second = fx.service.open(order.id_typed()).await.unwrap();

        fx.service.send(&first, true).await.unwrap();
        let err = fx.service.send(&second, true).await.unwrap_err();

        assert!(matches!(err, ServiceError::Domain(DomainError::IllegalTransition { .. })));
        assert_eq!(
            fx.service.fetch(order.id_typed()).await.unwrap().status(),
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn later_pending_edit_wins_over_an_earlier_one() {
        let fx = Fixture::new(&["A"]);
        let order = fx.create(&[(0, 4)], InitialStatus::Pending).await;
        let mut first = fx.service.open(order.id_typed()).await.unwrap();
        let mut second = fx.service.open(order.id_typed()).await.unwrap();
        first.set_requested(&fx.med(0), 6).unwrap();
        second.set_requested(&fx.med(0), 9).unwrap();

        fx.service.apply_edit(&first).await.unwrap();
        let EditOutcome::Updated(last) = fx.service.apply_edit(&second).await.unwrap() else {
            panic!("expected an update");
        };
        assert_eq!(last.items().get(&fx.med(0)).unwrap().requested_quantity, 9);
    }
}
