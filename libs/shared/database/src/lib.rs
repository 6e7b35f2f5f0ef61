pub mod memory;
pub mod query;
pub mod store;
pub mod supabase;

use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, DatabaseBackend};

pub use memory::MemoryStore;
pub use query::{Filter, FilterOp, Order, Query};
pub use store::RowStore;
pub use supabase::SupabaseClient;

/// Builds the row store selected by configuration.
pub fn connect(config: &AppConfig) -> Arc<dyn RowStore> {
    info!("Using {} database backend", config.database_backend);

    match config.database_backend {
        DatabaseBackend::Supabase => Arc::new(SupabaseClient::new(config)),
        DatabaseBackend::Memory => Arc::new(MemoryStore::new()),
    }
}
