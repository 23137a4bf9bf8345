//! Shared application state

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;

use crate::application::ports::outbound::CreatureCatalog;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::creature_catalog::InMemoryCreatureCatalog;
use crate::infrastructure::session::SessionManager;

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    pub catalog: Arc<dyn CreatureCatalog>,
    /// Active sessions; the write lock serializes every state mutation
    pub sessions: RwLock<SessionManager>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut catalog = InMemoryCreatureCatalog::with_builtins();
        if let Some(path) = &config.creatures_path {
            catalog.load_file(path)?;
        }
        let catalog: Arc<dyn CreatureCatalog> = Arc::new(catalog);

        let sessions = SessionManager::from_config(&config, Arc::clone(&catalog));

        Ok(Self {
            config,
            catalog,
            sessions: RwLock::new(sessions),
        })
    }
}
