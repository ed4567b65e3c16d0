//! Infrastructure layer: order repository and catalog adapters, the
//! replenishment service that drives transitions through them, and the
//! consumers of published events.

pub mod catalog;
pub mod config;
pub mod edit_lock;
pub mod projections;
pub mod repository;
pub mod service;
pub mod workers;

pub use catalog::{CatalogError, CatalogLookup, CatalogSeed, HttpCatalog, InMemoryCatalog};
pub use config::BackendConfig;
pub use edit_lock::{EditGuard, EditLocks};
pub use projections::{StockLedger, StockProjectionError, WarehouseStockProjection};
pub use repository::{
    HttpOrderRepository, InMemoryOrderRepository, NewOrder, OrderRepository, OrderUpdate, RepositoryError,
};
pub use service::{AGGREGATE_TYPE, EditOutcome, OrderEnvelope, ReplenishmentService, ServiceError};
pub use workers::{ProjectionWorker, WorkerHandle};
