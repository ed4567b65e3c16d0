//! Receipt submissions and fulfilment accounting.

use serde::{Deserialize, Serialize};

use medcamp_core::{DomainError, DomainResult, MedicineId};

use crate::item_set::OrderItemSet;
use crate::order::OrderStatus;

/// Quantity delivered for one line in this delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptEntry {
    pub medicine_id: MedicineId,
    pub quantity: i64,
}

/// One delivery's worth of received quantities.
///
/// Entries are increments on top of what the order already recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptSubmission {
    entries: Vec<ReceiptEntry>,
}

impl ReceiptSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<ReceiptEntry>) -> Self {
        Self { entries }
    }

    pub fn with(mut self, medicine_id: MedicineId, quantity: i64) -> Self {
        self.entries.push(ReceiptEntry { medicine_id, quantity });
        self
    }

    /// A submission that receives everything still outstanding.
    pub fn outstanding_of(items: &OrderItemSet) -> Self {
        Self {
            entries: items
                .iter()
                .filter(|l| l.outstanding() > 0)
                .map(|l| ReceiptEntry {
                    medicine_id: l.medicine_id,
                    quantity: l.outstanding(),
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[ReceiptEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate against the order's current lines and work out the outcome.
    ///
    /// Fails fast in this order: malformed entries (negative, unknown,
    /// duplicated), nothing received, then every line that would exceed its
    /// requested quantity.
    pub(crate) fn evaluate(&self, items: &OrderItemSet) -> DomainResult<ReceiptPlan> {
        let mut seen: Vec<MedicineId> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let line = items
                .get(&entry.medicine_id)
                .ok_or_else(|| DomainError::UnknownLine(entry.medicine_id.to_string()))?;
            if entry.quantity < 0 {
                return Err(DomainError::invalid_quantity(&line.medicine_name, entry.quantity));
            }
            if seen.contains(&entry.medicine_id) {
                return Err(DomainError::DuplicateLine(line.medicine_name.clone()));
            }
            seen.push(entry.medicine_id);
        }

        if !self.entries.iter().any(|e| e.quantity > 0) {
            return Err(DomainError::NoReceivedQuantity);
        }

        let mut exceeded = Vec::new();
        let mut lines = Vec::new();
        for entry in self.entries.iter().filter(|e| e.quantity > 0) {
            let Some(line) = items.get(&entry.medicine_id) else {
                continue;
            };
            let total = match line.received_quantity.checked_add(entry.quantity) {
                Some(total) if total <= line.requested_quantity => total,
                _ => {
                    exceeded.push(line.medicine_name.clone());
                    continue;
                }
            };
            lines.push(ReceivedLine {
                medicine_id: line.medicine_id,
                medicine_name: line.medicine_name.clone(),
                requested_quantity: line.requested_quantity,
                delta: entry.quantity,
                received_quantity: total,
            });
        }
        if !exceeded.is_empty() {
            return Err(DomainError::exceeds_requested(exceeded));
        }

        let mut after = items.clone();
        for line in &lines {
            after.record_received(&line.medicine_id, line.received_quantity);
        }
        let status = if after.is_fully_received() {
            OrderStatus::Received
        } else {
            OrderStatus::Partial
        };

        Ok(ReceiptPlan { lines, status })
    }
}

/// A line's receipt as recorded: the increment and the new cumulative total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedLine {
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub requested_quantity: i64,
    /// Received in this delivery; what the warehouse stock grows by.
    pub delta: i64,
    /// Received in total after this delivery.
    pub received_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReceiptPlan {
    pub lines: Vec<ReceivedLine>,
    pub status: OrderStatus,
}

/// Per-line fulfilment progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineFulfilment {
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub requested_quantity: i64,
    pub received_quantity: i64,
    pub outstanding_quantity: i64,
}

/// Order-level fulfilment progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fulfilment {
    pub total_requested: i64,
    pub total_received: i64,
    pub total_outstanding: i64,
    pub lines: Vec<LineFulfilment>,
}

impl Fulfilment {
    pub fn of(items: &OrderItemSet) -> Self {
        let lines: Vec<LineFulfilment> = items
            .iter()
            .map(|l| LineFulfilment {
                medicine_id: l.medicine_id,
                medicine_name: l.medicine_name.clone(),
                requested_quantity: l.requested_quantity,
                received_quantity: l.received_quantity,
                outstanding_quantity: l.outstanding(),
            })
            .collect();
        Self {
            total_requested: items.total_requested(),
            total_received: items.total_received(),
            total_outstanding: lines.iter().fold(0i64, |acc, l| acc.saturating_add(l.outstanding_quantity)),
            lines,
        }
    }

    /// Share of the requested quantity received so far, in `[0, 1]`.
    pub fn fill_ratio(&self) -> f64 {
        if self.total_requested == 0 {
            return 0.0;
        }
        self.total_received as f64 / self.total_requested as f64
    }

    /// Lines still waiting on the supplier.
    pub fn outstanding_lines(&self) -> impl Iterator<Item = &LineFulfilment> {
        self.lines.iter().filter(|l| l.outstanding_quantity > 0)
    }
}
