//! Catalog reference data (medicines, suppliers, warehouse stock).
//!
//! Pure value types with no IO. Lookups against a live catalog are an
//! infrastructure concern (see `medcamp-infra`'s `catalog` module).

pub mod inventory;
pub mod medicine;
pub mod supplier;

pub use inventory::WarehouseInventory;
pub use medicine::{Medicine, MedicineKind};
pub use supplier::Supplier;
