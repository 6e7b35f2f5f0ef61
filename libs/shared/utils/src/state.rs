use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::RowStore;

/// Shared handler state: configuration plus the row store every request
/// builds its services over.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RowStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn RowStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}
