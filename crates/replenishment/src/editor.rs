//! Editing surface for a new or re-opened order.
//!
//! The editor holds the working item set the actor changes quantities on. It
//! is seeded with every medicine the supplier can fulfil so that medicines not
//! yet on the order can be added by raising their quantity from zero.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medcamp_catalog::Medicine;
use medcamp_core::{DomainError, DomainResult, MedicineId, SupplierId, WarehouseId};

use crate::diff::{diff, ItemDiff};
use crate::item_set::OrderItemSet;
use crate::order::{ApplyEdit, InitialStatus, Order, OrderCommand, OrderStatus, PlaceOrder, SendOrder};

/// One row of the editor as shown to the actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorLine {
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub requested_quantity: i64,
    pub received_quantity: i64,
    /// Warehouse stock, for display only.
    pub on_hand: i64,
    /// The line is part of the persisted order.
    pub on_order: bool,
}

#[derive(Debug, Clone)]
pub struct OrderEditor {
    loaded: Option<Order>,
    warehouse_id: WarehouseId,
    supplier_id: SupplierId,
    baseline: OrderItemSet,
    items: OrderItemSet,
    on_hand: BTreeMap<MedicineId, i64>,
}

impl OrderEditor {
    /// Editor for an order that does not exist yet: every supplier medicine at zero.
    pub fn for_new(
        warehouse_id: WarehouseId,
        supplier_id: SupplierId,
        medicines: &[Medicine],
        on_hand: BTreeMap<MedicineId, i64>,
    ) -> DomainResult<Self> {
        let mut items = OrderItemSet::new();
        for medicine in medicines {
            items.add_or_init_item(medicine, 0)?;
        }
        Ok(Self {
            loaded: None,
            warehouse_id,
            supplier_id,
            baseline: items.clone(),
            items,
            on_hand,
        })
    }

    /// Editor for a persisted order: its lines at persisted quantities, then
    /// every other supplier medicine at zero.
    pub fn for_order(
        order: Order,
        medicines: &[Medicine],
        on_hand: BTreeMap<MedicineId, i64>,
    ) -> DomainResult<Self> {
        let mut items = order.items().clone();
        for medicine in medicines {
            items.add_or_init_item(medicine, 0)?;
        }
        Ok(Self {
            warehouse_id: order.warehouse_id(),
            supplier_id: order.supplier_id(),
            loaded: Some(order),
            baseline: items.clone(),
            items,
            on_hand,
        })
    }

    /// The order this editor was opened on, as loaded.
    pub fn order(&self) -> Option<&Order> {
        self.loaded.as_ref()
    }

    pub fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn status(&self) -> Option<OrderStatus> {
        self.loaded.as_ref().map(Order::status)
    }

    pub fn items(&self) -> &OrderItemSet {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut OrderItemSet {
        &mut self.items
    }

    pub fn set_requested(&mut self, medicine_id: &MedicineId, quantity: i64) -> DomainResult<()> {
        self.items.set_requested_quantity(medicine_id, quantity)
    }

    /// Replace quantities from a list of `(medicine, requested)` pairs.
    ///
    /// Applied in order; the first invalid entry aborts and leaves earlier
    /// entries applied.
    pub fn set_quantities(&mut self, quantities: &[(MedicineId, i64)]) -> DomainResult<()> {
        for (medicine_id, quantity) in quantities {
            self.items.set_requested_quantity(medicine_id, *quantity)?;
        }
        Ok(())
    }

    pub fn lines(&self) -> Vec<EditorLine> {
        let on_order = |id: &MedicineId| {
            self.loaded
                .as_ref()
                .is_some_and(|o| o.items().get(id).is_some_and(|l| l.requested_quantity > 0))
        };
        self.items
            .iter()
            .map(|l| EditorLine {
                medicine_id: l.medicine_id,
                medicine_name: l.medicine_name.clone(),
                requested_quantity: l.requested_quantity,
                received_quantity: l.received_quantity,
                on_hand: self.on_hand.get(&l.medicine_id).copied().unwrap_or(0),
                on_order: on_order(&l.medicine_id),
            })
            .collect()
    }

    /// Changes made since the editor was opened.
    pub fn pending_changes(&self) -> ItemDiff {
        diff(&self.baseline, &self.items)
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending_changes().is_empty()
    }

    /// Creation command for a new order.
    pub fn place_command(&self, status: InitialStatus, occurred_at: DateTime<Utc>) -> DomainResult<PlaceOrder> {
        if self.loaded.is_some() {
            return Err(DomainError::invariant("order already exists"));
        }
        Ok(PlaceOrder {
            warehouse_id: self.warehouse_id,
            supplier_id: self.supplier_id,
            status,
            items: self.items.clone(),
            occurred_at,
        })
    }

    pub fn apply_edit_command(&self, occurred_at: DateTime<Utc>) -> DomainResult<OrderCommand> {
        let order = self.loaded()?;
        Ok(OrderCommand::ApplyEdit(ApplyEdit {
            order_id: order.id_typed(),
            edited: self.items.clone(),
            occurred_at,
        }))
    }

    pub fn send_command(&self, confirmed: bool, occurred_at: DateTime<Utc>) -> DomainResult<OrderCommand> {
        let order = self.loaded()?;
        Ok(OrderCommand::Send(SendOrder {
            order_id: order.id_typed(),
            edited: self.items.clone(),
            confirmed,
            occurred_at,
        }))
    }

    fn loaded(&self) -> DomainResult<&Order> {
        self.loaded.as_ref().ok_or(DomainError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderPlaced;
    use medcamp_catalog::MedicineKind;
    use medcamp_core::{Aggregate, OrderId};

    fn med(name: &str) -> Medicine {
        Medicine::new(MedicineId::new(), name, MedicineKind::Tablet)
    }

    fn draft_with(lines: &[(&Medicine, i64)]) -> Order {
        let mut items = OrderItemSet::new();
        for (m, q) in lines {
            items.add_or_init_item(m, *q).unwrap();
        }
        let event = OrderPlaced {
            warehouse_id: WarehouseId::new(),
            supplier_id: SupplierId::new(),
            status: InitialStatus::Draft,
            items,
            occurred_at: Utc::now(),
        };
        Order::placed(OrderId::new(), Utc::now(), &event)
    }

    #[test]
    fn new_editor_seeds_every_medicine_at_zero() {
        let catalog = vec![med("Amoxicillin"), med("ORS")];
        let mut on_hand = BTreeMap::new();
        on_hand.insert(catalog[1].id, 12);

        let editor = OrderEditor::for_new(WarehouseId::new(), SupplierId::new(), &catalog, on_hand).unwrap();

        let lines = editor.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.requested_quantity == 0 && !l.on_order));
        assert_eq!(lines[1].on_hand, 12);
        assert!(!editor.is_dirty());
        assert!(editor.status().is_none());
    }

    #[test]
    fn reopened_editor_keeps_persisted_lines_first() {
        let (a, b, c) = (med("A"), med("B"), med("C"));
        let order = draft_with(&[(&b, 5)]);

        let editor =
            OrderEditor::for_order(order, &[a.clone(), b.clone(), c.clone()], BTreeMap::new()).unwrap();

        let names: Vec<_> = editor.lines().iter().map(|l| (l.medicine_name.clone(), l.requested_quantity, l.on_order)).collect();
        assert_eq!(
            names,
            vec![
                ("B".to_string(), 5, true),
                ("A".to_string(), 0, false),
                ("C".to_string(), 0, false),
            ]
        );
    }

    #[test]
    fn edits_flow_through_the_loaded_order() {
        let (a, b, c) = (med("A"), med("B"), med("C"));
        let order = draft_with(&[(&a, 10), (&b, 5)]);
        let mut editor =
            OrderEditor::for_order(order.clone(), &[a.clone(), b.clone(), c.clone()], BTreeMap::new()).unwrap();

        editor.set_quantities(&[(b.id, 0), (c.id, 3)]).unwrap();
        assert_eq!(editor.pending_changes().len(), 2);

        let cmd = editor.apply_edit_command(Utc::now()).unwrap();
        let events = order.handle(&cmd).unwrap();
        let mut saved = order.clone();
        saved.apply(&events[0]);

        assert!(saved.items().get(&b.id).is_none());
        assert_eq!(saved.items().get(&c.id).unwrap().requested_quantity, 3);
    }

    #[test]
    fn negative_entry_is_rejected() {
        let a = med("A");
        let mut editor =
            OrderEditor::for_new(WarehouseId::new(), SupplierId::new(), std::slice::from_ref(&a), BTreeMap::new())
                .unwrap();
        assert!(matches!(
            editor.set_requested(&a.id, -4),
            Err(DomainError::InvalidQuantity { quantity: -4, .. })
        ));
    }

    #[test]
    fn new_editor_has_no_order_to_edit_or_send() {
        let editor = OrderEditor::for_new(WarehouseId::new(), SupplierId::new(), &[med("A")], BTreeMap::new()).unwrap();
        assert_eq!(editor.apply_edit_command(Utc::now()).unwrap_err(), DomainError::NotFound);
        assert_eq!(editor.send_command(true, Utc::now()).unwrap_err(), DomainError::NotFound);
        assert!(editor.place_command(InitialStatus::Draft, Utc::now()).is_ok());
    }
}
