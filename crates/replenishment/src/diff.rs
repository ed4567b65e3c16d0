//! Line-level diff between a loaded item set and an edited one.
//!
//! Used only for the draft update path: a re-opened draft is edited against
//! the lines it was loaded with, and only genuine changes are transmitted.
//! Lines are keyed by medicine; a zero (or missing) quantity counts as "not on
//! the order".

use serde::{Deserialize, Serialize};

use medcamp_core::{DomainError, DomainResult, MedicineId};

use crate::item_set::{OrderItemSet, OrderLineItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Medicine was not on the order (or at zero) and now has a quantity.
    Added,
    /// Medicine stays on the order with a different quantity.
    Changed,
    /// Medicine was on the order and is now at zero.
    Removed,
}

/// One transmitted line change. `Removed` always carries a zero quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub requested_quantity: i64,
    pub kind: ChangeKind,
}

/// Minimal set of line changes, in edited-set order followed by lines that
/// vanished from the edited set altogether.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemDiff {
    changes: Vec<LineChange>,
}

impl ItemDiff {
    pub fn from_changes(changes: Vec<LineChange>) -> Self {
        Self { changes }
    }

    pub fn changes(&self) -> &[LineChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn get(&self, medicine_id: &MedicineId) -> Option<&LineChange> {
        self.changes.iter().find(|c| &c.medicine_id == medicine_id)
    }

    /// Repository payload: one line per change, nothing received.
    pub fn to_line_items(&self) -> Vec<OrderLineItem> {
        self.changes
            .iter()
            .map(|c| OrderLineItem::new(c.medicine_id, c.medicine_name.clone(), c.requested_quantity))
            .collect()
    }

    /// Keep only the changes that actually differ from `original`.
    pub fn genuine_against(&self, original: &OrderItemSet) -> ItemDiff {
        let changes = self
            .changes
            .iter()
            .filter(|c| requested_in(original, &c.medicine_id) != c.requested_quantity)
            .cloned()
            .collect();
        ItemDiff { changes }
    }
}

/// Compute the changes needed to turn `original` into `edited`.
pub fn diff(original: &OrderItemSet, edited: &OrderItemSet) -> ItemDiff {
    let mut changes = Vec::new();

    for line in edited {
        let before = requested_in(original, &line.medicine_id);
        let after = line.requested_quantity;

        let kind = match (before > 0, after > 0) {
            (false, true) => ChangeKind::Added,
            (true, true) if before != after => ChangeKind::Changed,
            (true, false) => ChangeKind::Removed,
            _ => continue,
        };

        changes.push(LineChange {
            medicine_id: line.medicine_id,
            medicine_name: line.medicine_name.clone(),
            requested_quantity: if kind == ChangeKind::Removed { 0 } else { after },
            kind,
        });
    }

    for line in original {
        if line.requested_quantity > 0 && !edited.contains(&line.medicine_id) {
            changes.push(LineChange {
                medicine_id: line.medicine_id,
                medicine_name: line.medicine_name.clone(),
                requested_quantity: 0,
                kind: ChangeKind::Removed,
            });
        }
    }

    ItemDiff { changes }
}

/// [`diff`], failing with the soft `NoChanges` signal when nothing changed.
pub fn diff_for_update(original: &OrderItemSet, edited: &OrderItemSet) -> DomainResult<ItemDiff> {
    let d = diff(original, edited);
    if d.is_empty() {
        return Err(DomainError::NoChanges);
    }
    Ok(d)
}

/// Apply a diff to `original`, the way the repository applies a draft update.
///
/// Zero quantities remove the line; new medicines are appended.
pub fn apply_diff(original: &OrderItemSet, diff: &ItemDiff) -> DomainResult<OrderItemSet> {
    let mut next = original.clone();
    for change in diff.changes() {
        let qty = change.requested_quantity;
        if qty < 0 {
            return Err(DomainError::invalid_quantity(&change.medicine_name, qty));
        }
        if qty == 0 {
            if let Some(line) = next.get(&change.medicine_id) {
                if line.received_quantity > 0 {
                    return Err(DomainError::exceeds_requested(vec![line.medicine_name.clone()]));
                }
            }
            next.remove(&change.medicine_id);
        } else if next.contains(&change.medicine_id) {
            next.set_requested_quantity(&change.medicine_id, qty)?;
        } else {
            next.add_or_init(change.medicine_id, &change.medicine_name, qty)?;
        }
    }
    Ok(next)
}

fn requested_in(set: &OrderItemSet, medicine_id: &MedicineId) -> i64 {
    set.get(medicine_id).map(|l| l.requested_quantity).unwrap_or(0)
}
