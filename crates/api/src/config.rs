//! API process configuration.

use std::net::SocketAddr;

use medcamp_infra::BackendConfig;

pub const BIND_ADDR_VAR: &str = "MEDCAMP_BIND_ADDR";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub backend: BackendConfig,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_addr: SocketAddr = ([0, 0, 0, 0], 8080).into();
        let bind_addr = match lookup(BIND_ADDR_VAR).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            None => default_addr,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "{BIND_ADDR_VAR} is not a socket address; using {DEFAULT_BIND_ADDR}");
                default_addr
            }),
        };

        Self {
            bind_addr,
            backend: BackendConfig::from_lookup(lookup),
        }
    }
}
