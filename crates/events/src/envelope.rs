use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use medcamp_core::OrderId;

use crate::event::Event;

/// Envelope for a published event, carrying stream metadata.
///
/// Notes:
/// - An envelope is only built for a transition the repository already
///   accepted; failed transitions never produce one.
/// - `event_id` is unique per envelope so consumers can de-duplicate
///   redeliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    order_id: OrderId,
    aggregate_type: String,
    event_type: String,
    occurred_at: DateTime<Utc>,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        order_id: OrderId,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            order_id,
            aggregate_type: aggregate_type.into(),
            event_type: event_type.into(),
            occurred_at,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap a typed event, deriving type and time from the event itself.
    pub fn wrap(order_id: OrderId, aggregate_type: impl Into<String>, payload: E) -> Self {
        Self::new(
            Uuid::now_v7(),
            order_id,
            aggregate_type,
            payload.event_type(),
            payload.occurred_at(),
            payload,
        )
    }
}
