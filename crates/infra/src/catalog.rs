//! Catalog lookup port and adapters.
//!
//! Read-only reference data: which medicines a supplier can fulfil, and how
//! much of each a warehouse has on hand. On-hand quantities are shown next to
//! editor lines; they never constrain requested or received quantities.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use medcamp_catalog::{Medicine, Supplier, WarehouseInventory};
use medcamp_core::{DomainError, MedicineId, SupplierId, WarehouseId};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("supplier {0} not found")]
    SupplierNotFound(SupplierId),

    #[error("catalog transport failure: {0}")]
    Transport(String),

    #[error("failed to decode catalog response: {0}")]
    Decode(String),

    #[error("invalid catalog seed: {0}")]
    Seed(String),

    #[error("catalog lock poisoned")]
    Poisoned,
}

#[async_trait::async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Medicines the supplier can fulfil, in catalog order.
    async fn medicines_for_supplier(&self, supplier_id: SupplierId) -> Result<Vec<Medicine>, CatalogError>;

    /// On-hand quantity, zero for medicines the warehouse never stocked.
    async fn on_hand_quantity(
        &self,
        warehouse_id: WarehouseId,
        medicine_id: MedicineId,
    ) -> Result<i64, CatalogError>;

    /// On-hand quantities for every medicine in `medicines`.
    async fn on_hand_for(
        &self,
        warehouse_id: WarehouseId,
        medicines: &[Medicine],
    ) -> Result<BTreeMap<MedicineId, i64>, CatalogError> {
        let mut out = BTreeMap::new();
        for medicine in medicines {
            out.insert(medicine.id, self.on_hand_quantity(warehouse_id, medicine.id).await?);
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl<C> CatalogLookup for Arc<C>
where
    C: CatalogLookup + ?Sized,
{
    async fn medicines_for_supplier(&self, supplier_id: SupplierId) -> Result<Vec<Medicine>, CatalogError> {
        (**self).medicines_for_supplier(supplier_id).await
    }

    async fn on_hand_quantity(
        &self,
        warehouse_id: WarehouseId,
        medicine_id: MedicineId,
    ) -> Result<i64, CatalogError> {
        (**self).on_hand_quantity(warehouse_id, medicine_id).await
    }

    async fn on_hand_for(
        &self,
        warehouse_id: WarehouseId,
        medicines: &[Medicine],
    ) -> Result<BTreeMap<MedicineId, i64>, CatalogError> {
        (**self).on_hand_for(warehouse_id, medicines).await
    }
}

/// Seed file contents for [`InMemoryCatalog`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub suppliers: Vec<Supplier>,
    #[serde(default)]
    pub warehouses: Vec<WarehouseInventory>,
}

/// In-memory catalog for tests/dev. Also keeps warehouse stock, so it can
/// act as the inventory that received goods are booked into.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    suppliers: RwLock<HashMap<SupplierId, Supplier>>,
    inventories: RwLock<HashMap<WarehouseId, WarehouseInventory>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Self {
        let catalog = Self::new();
        for supplier in seed.suppliers {
            catalog.upsert_supplier(supplier);
        }
        for inventory in seed.warehouses {
            if let Ok(mut inv) = catalog.inventories.write() {
                inv.insert(inventory.warehouse_id(), inventory);
            }
        }
        catalog
    }

    /// Load a JSON [`CatalogSeed`] from disk.
    pub async fn load_seed(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CatalogError::Seed(format!("{}: {e}", path.display())))?;
        let seed: CatalogSeed =
            serde_json::from_slice(&bytes).map_err(|e| CatalogError::Seed(format!("{}: {e}", path.display())))?;
        tracing::info!(
            suppliers = seed.suppliers.len(),
            warehouses = seed.warehouses.len(),
            "catalog seed loaded"
        );
        Ok(Self::from_seed(seed))
    }

    pub fn upsert_supplier(&self, supplier: Supplier) {
        if let Ok(mut map) = self.suppliers.write() {
            map.insert(supplier.id_typed(), supplier);
        }
    }

    pub fn supplier(&self, supplier_id: &SupplierId) -> Option<Supplier> {
        self.suppliers.read().ok()?.get(supplier_id).cloned()
    }

    pub fn set_on_hand(
        &self,
        warehouse_id: WarehouseId,
        medicine_id: MedicineId,
        quantity: i64,
    ) -> Result<(), DomainError> {
        let mut map = self
            .inventories
            .write()
            .map_err(|_| DomainError::invariant("inventory lock poisoned"))?;
        map.entry(warehouse_id)
            .or_insert_with(|| WarehouseInventory::new(warehouse_id))
            .set_on_hand(medicine_id, quantity)
    }

    /// Book received stock. Returns the new on-hand quantity.
    pub fn add_received(
        &self,
        warehouse_id: WarehouseId,
        medicine_id: MedicineId,
        delta: i64,
    ) -> Result<i64, DomainError> {
        let mut map = self
            .inventories
            .write()
            .map_err(|_| DomainError::invariant("inventory lock poisoned"))?;
        map.entry(warehouse_id)
            .or_insert_with(|| WarehouseInventory::new(warehouse_id))
            .add_received(medicine_id, delta)
    }

    pub fn inventory(&self, warehouse_id: &WarehouseId) -> Option<WarehouseInventory> {
        self.inventories.read().ok()?.get(warehouse_id).cloned()
    }
}

#[async_trait::async_trait]
impl CatalogLookup for InMemoryCatalog {
    async fn medicines_for_supplier(&self, supplier_id: SupplierId) -> Result<Vec<Medicine>, CatalogError> {
        let map = self.suppliers.read().map_err(|_| CatalogError::Poisoned)?;
        map.get(&supplier_id)
            .map(|s| s.medicines().to_vec())
            .ok_or(CatalogError::SupplierNotFound(supplier_id))
    }

    async fn on_hand_quantity(
        &self,
        warehouse_id: WarehouseId,
        medicine_id: MedicineId,
    ) -> Result<i64, CatalogError> {
        let map = self.inventories.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(map.get(&warehouse_id).map(|inv| inv.on_hand(&medicine_id)).unwrap_or(0))
    }
}

#[derive(Debug, Deserialize)]
struct OnHandResponse {
    on_hand: i64,
}

/// REST adapter for an external catalog.
///
/// - `GET {base}/suppliers/{id}/medicines` returns a medicine list
/// - `GET {base}/warehouses/{id}/stock/{medicine_id}` returns `{ "on_hand": n }`
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<Option<T>, CatalogError> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(CatalogError::Transport(format!("catalog returned {}", res.status())));
        }
        let bytes = res.bytes().await.map_err(|e| CatalogError::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl CatalogLookup for HttpCatalog {
    async fn medicines_for_supplier(&self, supplier_id: SupplierId) -> Result<Vec<Medicine>, CatalogError> {
        self.get_json(format!("{}/suppliers/{}/medicines", self.base_url, supplier_id))
            .await?
            .ok_or(CatalogError::SupplierNotFound(supplier_id))
    }

    async fn on_hand_quantity(
        &self,
        warehouse_id: WarehouseId,
        medicine_id: MedicineId,
    ) -> Result<i64, CatalogError> {
        let res: Option<OnHandResponse> = self
            .get_json(format!(
                "{}/warehouses/{}/stock/{}",
                self.base_url, warehouse_id, medicine_id
            ))
            .await?;
        Ok(res.map(|r| r.on_hand).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medcamp_catalog::MedicineKind;

    fn supplier_with(names: &[&str]) -> Supplier {
        names.iter().fold(Supplier::new(SupplierId::new(), "Camp Pharma"), |s, n| {
            s.with_medicine(Medicine::new(MedicineId::new(), *n, MedicineKind::Tablet))
        })
    }

    #[tokio::test]
    async fn supplier_medicines_in_catalog_order() {
        let supplier = supplier_with(&["Amoxicillin", "ORS", "Paracetamol"]);
        let catalog = InMemoryCatalog::new();
        catalog.upsert_supplier(supplier.clone());

        let meds = catalog.medicines_for_supplier(supplier.id_typed()).await.unwrap();
        let names: Vec<_> = meds.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Amoxicillin", "ORS", "Paracetamol"]);

        let missing = SupplierId::new();
        assert!(matches!(
            catalog.medicines_for_supplier(missing).await,
            Err(CatalogError::SupplierNotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn on_hand_defaults_to_zero_and_tracks_receipts() {
        let supplier = supplier_with(&["ORS", "Zinc"]);
        let (ors, zinc) = (supplier.medicines()[0].id, supplier.medicines()[1].id);
        let warehouse = WarehouseId::new();
        let catalog = InMemoryCatalog::new();
        catalog.set_on_hand(warehouse, ors, 7).unwrap();

        assert_eq!(catalog.add_received(warehouse, ors, 3).unwrap(), 10);
        let stock = catalog.on_hand_for(warehouse, supplier.medicines()).await.unwrap();
        assert_eq!(stock.get(&ors), Some(&10));
        assert_eq!(stock.get(&zinc), Some(&0));
    }

    #[test]
    fn seed_round_trips_through_json() {
        let supplier = supplier_with(&["ORS"]);
        let warehouse = WarehouseId::new();
        let mut inventory = WarehouseInventory::new(warehouse);
        inventory.set_on_hand(supplier.medicines()[0].id, 40).unwrap();

        let json = serde_json::to_string(&CatalogSeed {
            suppliers: vec![supplier.clone()],
            warehouses: vec![inventory],
        })
        .unwrap();
        let catalog = InMemoryCatalog::from_seed(serde_json::from_str(&json).unwrap());

        assert_eq!(catalog.supplier(&supplier.id_typed()), Some(supplier.clone()));
        assert_eq!(
            catalog.inventory(&warehouse).unwrap().on_hand(&supplier.medicines()[0].id),
            40
        );
    }
}
