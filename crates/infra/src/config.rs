//! Backend configuration, read from the environment.

use std::path::PathBuf;
use std::time::Duration;

pub const BACKEND_URL_VAR: &str = "MEDCAMP_BACKEND_URL";
pub const HTTP_TIMEOUT_VAR: &str = "MEDCAMP_HTTP_TIMEOUT_SECS";
pub const CATALOG_SEED_VAR: &str = "MEDCAMP_CATALOG_SEED";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Which adapters serve orders and the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// REST backend for orders and catalog. In-memory adapters when unset.
    pub backend_url: Option<String>,
    pub http_timeout: Duration,
    /// JSON catalog seed for the in-memory catalog.
    pub catalog_seed: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            catalog_seed: None,
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let http_timeout = match get(HTTP_TIMEOUT_VAR) {
            None => DEFAULT_HTTP_TIMEOUT,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(value = %raw, "{HTTP_TIMEOUT_VAR} is not a positive integer; using default");
                    DEFAULT_HTTP_TIMEOUT
                }
            },
        };

        Self {
            backend_url: get(BACKEND_URL_VAR),
            http_timeout,
            catalog_seed: get(CATALOG_SEED_VAR).map(PathBuf::from),
        }
    }

    pub fn uses_http_backend(&self) -> bool {
        self.backend_url.is_some()
    }
}
