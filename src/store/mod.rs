pub mod disk;
pub mod memory;

use crate::core::config::{AppConfig, StorageKind};
use crate::core::store::CountryStore;
use anyhow::Result;
use disk::DiskStore;
use memory::MemoryStore;
use std::sync::Arc;
use tracing::info;

/// Opens the store selected by the configuration. Called once at startup.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn CountryStore>> {
    match config.storage {
        StorageKind::Disk => {
            let db_path = config.default_data_path()?.join("db");
            info!("Using country store at {}", db_path.display());
            Ok(Arc::new(DiskStore::open(&db_path)?))
        }
        StorageKind::Memory => {
            info!("Using in-memory country store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
