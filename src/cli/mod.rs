pub mod doctor;
pub mod export;
pub mod maintenance;
pub mod search;
pub mod stats;
pub mod store;

use anyhow::{Context, Result};

use recollect::config::RecollectConfig;
use recollect::MemoryEngine;

/// Open the configured store with the configured provider.
pub fn open_engine(config: RecollectConfig) -> Result<MemoryEngine> {
    let db_path = config.resolved_db_path();
    MemoryEngine::open(config)
        .with_context(|| format!("failed to open store at {}", db_path.display()))
}
