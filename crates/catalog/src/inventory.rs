use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use medcamp_core::{DomainError, MedicineId, WarehouseId};

/// On-hand stock of one warehouse, per medicine.
///
/// Quantities are never negative. Unknown medicines read as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseInventory {
    warehouse_id: WarehouseId,
    on_hand: BTreeMap<MedicineId, i64>,
}

impl WarehouseInventory {
    pub fn new(warehouse_id: WarehouseId) -> Self {
        Self {
            warehouse_id,
            on_hand: BTreeMap::new(),
        }
    }

    pub fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }

    pub fn on_hand(&self, medicine_id: &MedicineId) -> i64 {
        self.on_hand.get(medicine_id).copied().unwrap_or(0)
    }

    /// Overwrite the on-hand quantity (stock count / seeding).
    pub fn set_on_hand(&mut self, medicine_id: MedicineId, quantity: i64) -> Result<(), DomainError> {
        if quantity < 0 {
            return Err(DomainError::invalid_quantity(medicine_id.to_string(), quantity));
        }
        self.on_hand.insert(medicine_id, quantity);
        Ok(())
    }

    /// Add delivered stock. Returns the new on-hand quantity.
    pub fn add_received(&mut self, medicine_id: MedicineId, delta: i64) -> Result<i64, DomainError> {
        if delta < 0 {
            return Err(DomainError::invalid_quantity(medicine_id.to_string(), delta));
        }
        let current = self.on_hand(&medicine_id);
        let next = current
            .checked_add(delta)
            .ok_or_else(|| DomainError::invalid_quantity(medicine_id.to_string(), delta))?;
        self.on_hand.insert(medicine_id, next);
        Ok(next)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MedicineId, &i64)> {
        self.on_hand.iter()
    }
}
