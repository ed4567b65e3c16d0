//! Order line items and the working item set an editor operates on.

use serde::{Deserialize, Serialize};

use medcamp_catalog::Medicine;
use medcamp_core::{DomainError, DomainResult, MedicineId};

/// One (medicine, requested, received) record of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub requested_quantity: i64,
    #[serde(default)]
    pub received_quantity: i64,
}

impl OrderLineItem {
    pub fn new(medicine_id: MedicineId, medicine_name: impl Into<String>, requested_quantity: i64) -> Self {
        Self {
            medicine_id,
            medicine_name: medicine_name.into(),
            requested_quantity,
            received_quantity: 0,
        }
    }

    /// Quantity still expected from the supplier.
    pub fn outstanding(&self) -> i64 {
        (self.requested_quantity - self.received_quantity).max(0)
    }

    pub fn is_fully_received(&self) -> bool {
        self.received_quantity == self.requested_quantity
    }

    /// Check the per-line quantity invariants.
    pub fn check(&self) -> DomainResult<()> {
        if self.requested_quantity < 0 {
            return Err(DomainError::invalid_quantity(&self.medicine_name, self.requested_quantity));
        }
        if self.received_quantity < 0 {
            return Err(DomainError::invalid_quantity(&self.medicine_name, self.received_quantity));
        }
        if self.received_quantity > self.requested_quantity {
            return Err(DomainError::exceeds_requested(vec![self.medicine_name.clone()]));
        }
        Ok(())
    }
}

/// Ordered collection of line items, unique by medicine.
///
/// Every line satisfies `0 <= received_quantity <= requested_quantity`; the
/// mutators refuse any change that would break this. Deserialization goes
/// through the same checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<OrderLineItem>", into = "Vec<OrderLineItem>")]
pub struct OrderItemSet {
    items: Vec<OrderLineItem>,
}

impl OrderItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from persisted lines, validating uniqueness and quantities.
    pub fn from_items(items: Vec<OrderLineItem>) -> DomainResult<Self> {
        let mut set = Self::new();
        for item in items {
            item.check()?;
            if set.contains(&item.medicine_id) {
                return Err(DomainError::DuplicateLine(item.medicine_name));
            }
            set.items.push(item);
        }
        Ok(set)
    }

    /// Insert a line for `medicine` unless one already exists.
    ///
    /// Never overwrites an existing line. Returns whether a line was inserted.
    pub fn add_or_init_item(&mut self, medicine: &Medicine, requested_quantity: i64) -> DomainResult<bool> {
        self.add_or_init(medicine.id, &medicine.name, requested_quantity)
    }

    pub(crate) fn add_or_init(
        &mut self,
        medicine_id: MedicineId,
        medicine_name: &str,
        requested_quantity: i64,
    ) -> DomainResult<bool> {
        if requested_quantity < 0 {
            return Err(DomainError::invalid_quantity(medicine_name, requested_quantity));
        }
        if self.contains(&medicine_id) {
            return Ok(false);
        }
        self.items
            .push(OrderLineItem::new(medicine_id, medicine_name, requested_quantity));
        Ok(true)
    }

    pub fn set_requested_quantity(&mut self, medicine_id: &MedicineId, quantity: i64) -> DomainResult<()> {
        let line = self.line_mut(medicine_id)?;
        if quantity < 0 {
            return Err(DomainError::invalid_quantity(&line.medicine_name, quantity));
        }
        // Lowering below what was already delivered would break received <= requested.
        if line.received_quantity > quantity {
            return Err(DomainError::exceeds_requested(vec![line.medicine_name.clone()]));
        }
        line.requested_quantity = quantity;
        Ok(())
    }

    pub fn set_received_quantity(&mut self, medicine_id: &MedicineId, quantity: i64) -> DomainResult<()> {
        let line = self.line_mut(medicine_id)?;
        if quantity < 0 {
            return Err(DomainError::invalid_quantity(&line.medicine_name, quantity));
        }
        if quantity > line.requested_quantity {
            return Err(DomainError::exceeds_requested(vec![line.medicine_name.clone()]));
        }
        line.received_quantity = quantity;
        Ok(())
    }

    /// Drop a line entirely.
    pub fn remove(&mut self, medicine_id: &MedicineId) -> Option<OrderLineItem> {
        let idx = self.items.iter().position(|l| &l.medicine_id == medicine_id)?;
        Some(self.items.remove(idx))
    }

    /// Lines with a requested quantity greater than zero.
    pub fn non_zero_items(&self) -> OrderItemSet {
        Self {
            items: self
                .items
                .iter()
                .filter(|l| l.requested_quantity > 0)
                .cloned()
                .collect(),
        }
    }

    /// [`non_zero_items`](Self::non_zero_items), failing with `EmptyOrder`
    /// when nothing is requested.
    pub fn require_non_zero(&self) -> DomainResult<OrderItemSet> {
        let non_zero = self.non_zero_items();
        if non_zero.is_empty() {
            return Err(DomainError::EmptyOrder);
        }
        Ok(non_zero)
    }

    /// Every requested line must be supplied by the order's supplier.
    pub fn ensure_supplied_by(&self, medicines: &[Medicine]) -> DomainResult<()> {
        let missing: Vec<String> = self
            .items
            .iter()
            .filter(|l| l.requested_quantity > 0)
            .filter(|l| !medicines.iter().any(|m| m.id == l.medicine_id))
            .map(|l| l.medicine_name.clone())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::MedicineNotSupplied { lines: missing })
        }
    }

    pub fn get(&self, medicine_id: &MedicineId) -> Option<&OrderLineItem> {
        self.items.iter().find(|l| &l.medicine_id == medicine_id)
    }

    pub fn contains(&self, medicine_id: &MedicineId) -> bool {
        self.get(medicine_id).is_some()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, OrderLineItem> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[OrderLineItem] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<OrderLineItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_receipts(&self) -> bool {
        self.items.iter().any(|l| l.received_quantity > 0)
    }

    pub fn is_fully_received(&self) -> bool {
        self.items.iter().all(OrderLineItem::is_fully_received)
    }

    /// Saturates at `i64::MAX`.
    pub fn total_requested(&self) -> i64 {
        self.items.iter().fold(0i64, |acc, l| acc.saturating_add(l.requested_quantity))
    }

    /// Saturates at `i64::MAX`.
    pub fn total_received(&self) -> i64 {
        self.items.iter().fold(0i64, |acc, l| acc.saturating_add(l.received_quantity))
    }

    /// Overwrite a line's received quantity without re-validating.
    ///
    /// Only for replaying receipts that were validated when decided.
    pub(crate) fn record_received(&mut self, medicine_id: &MedicineId, received_quantity: i64) {
        if let Some(line) = self.items.iter_mut().find(|l| &l.medicine_id == medicine_id) {
            line.received_quantity = received_quantity;
        }
    }

    fn line_mut(&mut self, medicine_id: &MedicineId) -> DomainResult<&mut OrderLineItem> {
        self.items
            .iter_mut()
            .find(|l| &l.medicine_id == medicine_id)
            .ok_or_else(|| DomainError::UnknownLine(medicine_id.to_string()))
    }
}

impl TryFrom<Vec<OrderLineItem>> for OrderItemSet {
    type Error = DomainError;

    fn try_from(items: Vec<OrderLineItem>) -> Result<Self, Self::Error> {
        Self::from_items(items)
    }
}

impl From<OrderItemSet> for Vec<OrderLineItem> {
    fn from(set: OrderItemSet) -> Self {
        set.items
    }
}

impl<'a> IntoIterator for &'a OrderItemSet {
    type Item = &'a OrderLineItem;
    type IntoIter = core::slice::Iter<'a, OrderLineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medcamp_catalog::MedicineKind;
    use proptest::prelude::*;

    fn med(name: &str) -> Medicine {
        Medicine::new(MedicineId::new(), name, MedicineKind::Tablet)
    }

    #[test]
    fn add_or_init_does_not_overwrite_existing_line() {
        let para = med("Paracetamol");
        let mut set = OrderItemSet::new();

        assert!(set.add_or_init_item(&para, 10).unwrap());
        assert!(!set.add_or_init_item(&para, 0).unwrap());

        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&para.id).unwrap().requested_quantity, 10);
    }

    #[test]
    fn negative_requested_quantity_is_invalid() {
        let para = med("Paracetamol");
        let mut set = OrderItemSet::new();
        set.add_or_init_item(&para, 0).unwrap();

        let err = set.set_requested_quantity(&para.id, -1).unwrap_err();
        assert_eq!(err, DomainError::invalid_quantity("Paracetamol", -1));
        assert_eq!(set.get(&para.id).unwrap().requested_quantity, 0);
    }

    #[test]
    fn received_quantity_cannot_exceed_requested() {
        let para = med("Paracetamol");
        let mut set = OrderItemSet::new();
        set.add_or_init_item(&para, 100).unwrap();

        let err = set.set_received_quantity(&para.id, 150).unwrap_err();
        assert_eq!(err, DomainError::exceeds_requested(vec!["Paracetamol".into()]));

        let err = set.set_received_quantity(&para.id, -5).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity { quantity: -5, .. }));

        set.set_received_quantity(&para.id, 100).unwrap();
        assert!(set.is_fully_received());
    }

    #[test]
    fn requested_cannot_drop_below_received() {
        let para = med("Paracetamol");
        let mut set = OrderItemSet::new();
        set.add_or_init_item(&para, 100).unwrap();
        set.set_received_quantity(&para.id, 60).unwrap();

        assert!(matches!(
            set.set_requested_quantity(&para.id, 50),
            Err(DomainError::QuantityExceedsRequested { .. })
        ));
        set.set_requested_quantity(&para.id, 60).unwrap();
    }

    #[test]
    fn unknown_medicine_is_reported() {
        let mut set = OrderItemSet::new();
        let id = MedicineId::new();
        assert_eq!(
            set.set_requested_quantity(&id, 3).unwrap_err(),
            DomainError::UnknownLine(id.to_string())
        );
    }

    #[test]
    fn non_zero_items_filters_and_empty_order_is_rejected() {
        let a = med("A");
        let b = med("B");
        let mut set = OrderItemSet::new();
        set.add_or_init_item(&a, 0).unwrap();
        set.add_or_init_item(&b, 4).unwrap();

        let nz = set.non_zero_items();
        assert_eq!(nz.len(), 1);
        assert!(nz.contains(&b.id));

        set.set_requested_quantity(&b.id, 0).unwrap();
        assert_eq!(set.require_non_zero().unwrap_err(), DomainError::EmptyOrder);
    }

    #[test]
    fn supplier_membership_only_checks_requested_lines() {
        let a = med("A");
        let b = med("B");
        let mut set = OrderItemSet::new();
        set.add_or_init_item(&a, 5).unwrap();
        set.add_or_init_item(&b, 0).unwrap();

        set.ensure_supplied_by(std::slice::from_ref(&a)).unwrap();

        set.set_requested_quantity(&b.id, 1).unwrap();
        assert_eq!(
            set.ensure_supplied_by(std::slice::from_ref(&a)).unwrap_err(),
            DomainError::MedicineNotSupplied { lines: vec!["B".into()] }
        );
    }

    #[test]
    fn deserialization_rejects_duplicates_and_broken_lines() {
        let id = MedicineId::new();
        let dup = serde_json::json!([
            { "medicine_id": id, "medicine_name": "A", "requested_quantity": 1 },
            { "medicine_id": id, "medicine_name": "A", "requested_quantity": 2 },
        ]);
        assert!(serde_json::from_value::<OrderItemSet>(dup).is_err());

        let over = serde_json::json!([
            { "medicine_id": id, "medicine_name": "A", "requested_quantity": 1, "received_quantity": 2 },
        ]);
        assert!(serde_json::from_value::<OrderItemSet>(over).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: no sequence of accepted edits breaks received <= requested.
        #[test]
        fn received_never_exceeds_requested(
            ops in prop::collection::vec((any::<bool>(), -20i64..200i64), 1..40)
        ) {
            let m = med("Paracetamol");
            let mut set = OrderItemSet::new();
            set.add_or_init_item(&m, 0).unwrap();

            for (is_received, qty) in ops {
                let _ = if is_received {
                    set.set_received_quantity(&m.id, qty)
                } else {
                    set.set_requested_quantity(&m.id, qty)
                };
                let line = set.get(&m.id).unwrap();
                prop_assert!(line.received_quantity >= 0);
                prop_assert!(line.received_quantity <= line.requested_quantity);
            }
        }
    }
}
