//! App Core for GitBrowser.
//!
//! Composition root: loads settings, opens the tab store and starts the tab
//! list and search services on one runtime.

use std::fs;
use std::sync::Arc;

use tracing::info;

use crate::managers::tab_manager::TabManager;
use crate::managers::tab_store::{SqliteTabStore, TabStore};
use crate::platform;
use crate::services::data_service::Executor;
use crate::services::search_backend::{HttpSearchBackend, SearchBackend};
use crate::services::search_service::SearchService;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::settings::SearchSettings;

/// Central application struct holding the data services.
pub struct App {
    pub settings_engine: SettingsEngine,
    pub tab_manager: TabManager,
    pub search_service: SearchService,
}

impl App {
    /// Loads settings from `config_path` (or the platform default), opens the
    /// tab database in the platform data directory and starts both services.
    pub fn new(
        config_path: Option<String>,
        executor: &Executor,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings_engine = SettingsEngine::new(config_path);
        let settings = settings_engine.load()?;

        let data_dir = platform::get_data_dir();
        fs::create_dir_all(&data_dir)?;
        let db_path = data_dir.join(&settings.tabs.database_file);
        info!(path = %db_path.display(), "opening tab database");
        let store = SqliteTabStore::open(&db_path)?;

        let backend = search_backend(&settings.search)?;
        Self::with_backends(settings_engine, store, backend, executor)
    }

    /// Starts the services over explicit backends, using the settings already
    /// loaded in `settings_engine`.
    pub fn with_backends(
        settings_engine: SettingsEngine,
        store: impl TabStore,
        backend: Arc<dyn SearchBackend>,
        executor: &Executor,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let settings = settings_engine.get_settings().clone();
        let tab_manager = TabManager::from_settings(store, &settings.tabs, executor)?;
        let search_service = SearchService::new(backend, &settings.search, executor)?;

        Ok(Self {
            settings_engine,
            tab_manager,
            search_service,
        })
    }

    /// Flushes pending tab writes and stops both services.
    pub async fn shutdown(&self) {
        self.tab_manager.shutdown().await;
        self.search_service.shutdown().await;
        info!("app shut down");
    }
}

fn search_backend(
    settings: &SearchSettings,
) -> Result<Arc<dyn SearchBackend>, Box<dyn std::error::Error>> {
    let http: Arc<dyn SearchBackend> = Arc::new(HttpSearchBackend::new(settings)?);
    if !settings.use_system_resolver {
        return Ok(http);
    }

    #[cfg(feature = "network")]
    {
        use crate::services::search_backend::SystemDnsBackend;
        Ok(Arc::new(SystemDnsBackend::new(http)))
    }
    #[cfg(not(feature = "network"))]
    {
        tracing::warn!("system resolver requested but the network feature is disabled, using DoH");
        Ok(http)
    }
}
