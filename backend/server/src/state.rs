use std::sync::Arc;

use super::{
    config::Config,
    database::{Store, StoreError, init_store},
    history::HistoryService,
    quick_rolls::QuickRollService,
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub quick_rolls: QuickRollService,
    pub history: HistoryService,
}

impl AppState {
    pub fn new(config: Config) -> Result<Arc<Self>, StoreError> {
        let store = init_store(&config.store_url)?;

        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn Store>) -> Arc<Self> {
        Arc::new(Self {
            quick_rolls: QuickRollService::new(store.clone()),
            history: HistoryService::new(store.clone(), config.require_clear_confirmation),
            config,
            store,
        })
    }
}
