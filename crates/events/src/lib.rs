//! Domain events and their in-process distribution.
//!
//! Replenishment transitions are described as events; once the repository has
//! persisted a transition, the event is wrapped in an [`EventEnvelope`] and
//! published on an [`EventBus`] for downstream consumers (e.g. the warehouse
//! stock projection that applies received quantities).

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
