use crate::accounts::services::AccountService;
use crate::config::AppConfig;
use crate::store::{JsonFileStore, RecordStore};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub accounts: Arc<AccountService>,
}

impl AppState {
    pub fn init(config: AppConfig) -> Self {
        let store = JsonFileStore::new(&config.users_file);
        info!(path = %store.path().display(), "using user store");
        Self::from_parts(Arc::new(config), Arc::new(store))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            config,
            accounts: Arc::new(AccountService::new(store)),
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::store::MemoryStore;

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            users_file: "unused.json".into(),
            static_dir: None,
        });
        Self::from_parts(config, Arc::new(MemoryStore::new()))
    }
}
