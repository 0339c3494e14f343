use std::sync::Arc;

use crate::config::Config;
use crate::common::error::Result;
use crate::providers::ProviderRegistry;
use crate::storage::{self, Store};
use crate::vendor::{SimulatedVendor, VendorApi};

/// Everything a request handler needs, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub registry: Arc<ProviderRegistry>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, registry: ProviderRegistry) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
        }
    }

    /// Store and simulated vendor as configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = storage::open_store(&config.storage)?;
        let vendor: Arc<dyn VendorApi> = Arc::new(SimulatedVendor::new(config.vendor.failure_rate));
        let registry = ProviderRegistry::new(vendor, config.vendor.retry);
        Ok(Self::new(store, registry))
    }
}
