//! Projection implementations (read model builders).
//!
//! Projections consume published order events. They are idempotent, so
//! at-least-once delivery is safe.

pub mod warehouse_stock;

pub use warehouse_stock::{StockLedger, StockProjectionError, WarehouseStockProjection};
