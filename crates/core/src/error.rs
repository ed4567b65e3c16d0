//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, illegal transitions). Transport and persistence concerns belong
/// to the infrastructure layer.
///
/// Variants that concern specific line items carry the medicine display names
/// so a caller can point at the lines to correct.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A requested or received quantity was negative.
    #[error("invalid quantity {quantity} for {line}")]
    InvalidQuantity { line: String, quantity: i64 },

    /// A received quantity would exceed the requested quantity.
    #[error("received quantity exceeds requested quantity for: {}", .lines.join(", "))]
    QuantityExceedsRequested { lines: Vec<String> },

    /// A create, send or draft update has no line with a requested quantity.
    #[error("order has no line item with a requested quantity")]
    EmptyOrder,

    /// A receive submission recorded nothing.
    #[error("receive submission has no line item with a received quantity")]
    NoReceivedQuantity,

    /// A draft update carries no change against the loaded order.
    ///
    /// This is a soft signal; see [`DomainError::is_soft`].
    #[error("no changes to submit")]
    NoChanges,

    /// Cancelling an order that already recorded receipts (or is terminal).
    #[error("order cannot be cancelled once goods were received: {}", .lines.join(", "))]
    IllegalCancellation { lines: Vec<String> },

    /// The requested transition is not legal from the current status.
    #[error("cannot {action} an order in status {status}")]
    IllegalTransition { status: String, action: &'static str },

    /// Sending an order requires explicit confirmation from the actor.
    #[error("sending an order requires confirmation")]
    ConfirmationRequired,

    /// A submission referenced a medicine that is not a line of the order.
    #[error("no line item for {0}")]
    UnknownLine(String),

    /// The same medicine appeared twice where lines must be unique.
    #[error("duplicate line item for {0}")]
    DuplicateLine(String),

    /// A line references a medicine the order's supplier does not supply.
    #[error("supplier does not supply: {}", .lines.join(", "))]
    MedicineNotSupplied { lines: Vec<String> },

    /// A domain invariant was violated (e.g. inconsistent persisted data).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,
}

impl DomainError {
    pub fn invalid_quantity(line: impl Into<String>, quantity: i64) -> Self {
        Self::InvalidQuantity {
            line: line.into(),
            quantity,
        }
    }

    pub fn exceeds_requested(lines: Vec<String>) -> Self {
        Self::QuantityExceedsRequested { lines }
    }

    pub fn illegal_transition(status: impl core::fmt::Display, action: &'static str) -> Self {
        Self::IllegalTransition {
            status: status.to_string(),
            action,
        }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Soft outcomes are no-ops rather than failures and need not be shown to
    /// the end user as errors.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::NoChanges)
    }

    /// Display names of the line items that caused the failure, if any.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::InvalidQuantity { line, .. } => vec![line.clone()],
            Self::QuantityExceedsRequested { lines }
            | Self::IllegalCancellation { lines }
            | Self::MedicineNotSupplied { lines } => lines.clone(),
            Self::UnknownLine(line) | Self::DuplicateLine(line) => vec![line.clone()],
            _ => Vec::new(),
        }
    }
}
