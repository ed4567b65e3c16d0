use std::sync::{Arc, Mutex};

use thiserror::Error;

use medcamp_catalog::WarehouseInventory;
use medcamp_core::WarehouseId;
use medcamp_events::InMemoryEventBus;
use medcamp_infra::{
    BackendConfig, CatalogError, CatalogLookup, HttpCatalog, HttpOrderRepository, InMemoryCatalog,
    InMemoryOrderRepository, OrderEnvelope, OrderRepository, ProjectionWorker, ReplenishmentService,
    RepositoryError, WarehouseStockProjection, WorkerHandle,
};

pub type OrderService =
    ReplenishmentService<Arc<dyn OrderRepository>, Arc<dyn CatalogLookup>, Arc<InMemoryEventBus<OrderEnvelope>>>;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("failed to spawn projection worker: {0}")]
    Worker(#[from] std::io::Error),
}

/// Everything the handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub orders: OrderService,
    /// Stock booked from published receipts.
    pub stock: Arc<WarehouseStockProjection<Arc<InMemoryCatalog>>>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices").finish_non_exhaustive()
    }
}

impl AppServices {
    /// In-memory orders over `catalog`. Received stock is booked into the
    /// same catalog, so editors opened afterwards show the new on-hand.
    pub fn in_memory(catalog: Arc<InMemoryCatalog>) -> Result<Self, StartupError> {
        let repository: Arc<dyn OrderRepository> = Arc::new(InMemoryOrderRepository::new());
        let lookup: Arc<dyn CatalogLookup> = catalog.clone();
        Self::wire(repository, lookup, catalog)
    }

    /// Orders and catalog served by a REST backend. Received stock is booked
    /// into a local ledger only.
    pub fn http(base_url: &str, config: &BackendConfig) -> Result<Self, StartupError> {
        let repository: Arc<dyn OrderRepository> = Arc::new(HttpOrderRepository::new(base_url, config.http_timeout)?);
        let lookup: Arc<dyn CatalogLookup> = Arc::new(HttpCatalog::new(base_url, config.http_timeout)?);
        Self::wire(repository, lookup, Arc::new(InMemoryCatalog::new()))
    }

    fn wire(
        repository: Arc<dyn OrderRepository>,
        lookup: Arc<dyn CatalogLookup>,
        ledger: Arc<InMemoryCatalog>,
    ) -> Result<Self, StartupError> {
        let bus = Arc::new(InMemoryEventBus::new());
        let stock = Arc::new(WarehouseStockProjection::new(ledger));

        // Background subscriber: bus -> stock projection
        let worker = {
            let stock = stock.clone();
            ProjectionWorker::spawn("warehouse-stock", &bus, move |env: OrderEnvelope| {
                stock.apply_envelope(&env)
            })?
        };

        Ok(Self {
            orders: ReplenishmentService::new(repository, lookup, bus),
            stock,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn warehouse_stock(&self, warehouse_id: &WarehouseId) -> WarehouseInventory {
        self.stock
            .ledger()
            .inventory(warehouse_id)
            .unwrap_or_else(|| WarehouseInventory::new(*warehouse_id))
    }

    /// Stop the projection worker and wait for it.
    pub fn shutdown(&self) {
        let handle = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(handle) = handle {
            handle.shutdown();
        }
    }
}

pub async fn build_services(config: &BackendConfig) -> Result<AppServices, StartupError> {
    if let Some(url) = &config.backend_url {
        tracing::info!(backend_url = %url, "using HTTP order backend");
        return AppServices::http(url, config);
    }

    let catalog = match &config.catalog_seed {
        Some(path) => InMemoryCatalog::load_seed(path).await?,
        None => {
            tracing::warn!("no catalog seed configured; starting with an empty catalog");
            InMemoryCatalog::new()
        }
    };
    tracing::info!("using in-memory order store");
    AppServices::in_memory(Arc::new(catalog))
}
