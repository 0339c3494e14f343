// Storage: persistence for the hotel aggregate

pub mod in_memory;
pub mod sqlite;
pub mod traits;

use std::sync::Arc;

use crate::common::error::Result;
use crate::config::StorageConfig;

// Re-export the main trait and implementations at module root
pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::Store;

/// Build the configured store backend
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn Store>> {
    match config.sqlite_path.as_deref() {
        Some(path) => Ok(Arc::new(SqliteStore::open(path)?)),
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}
