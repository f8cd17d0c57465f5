//! Application state wiring the store and configuration together.

use std::path::PathBuf;
use std::sync::Arc;

use palaver_core::session::{CompactionPolicy, Compactor};
use palaver_infra::filesystem::resolve_data_dir;
use palaver_infra::session::JsonlSessionStore;
use palaver_types::config::PalaverConfig;

/// Shared state for CLI commands.
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: PalaverConfig,
    pub store: Arc<JsonlSessionStore>,
}

impl AppState {
    /// Resolve the data directory and load `config.toml` from it.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = palaver_infra::config::load_config(&data_dir).await;
        Ok(Self::with_config(data_dir, config))
    }

    pub fn with_config(data_dir: PathBuf, config: PalaverConfig) -> Self {
        let store = Arc::new(JsonlSessionStore::new(
            data_dir.clone(),
            config.session.clone(),
        ));
        Self {
            data_dir,
            config,
            store,
        }
    }

    pub fn compactor(&self) -> Compactor<JsonlSessionStore> {
        Compactor::new(
            Arc::clone(&self.store),
            CompactionPolicy::from(&self.config.session),
        )
    }
}
