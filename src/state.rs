use std::sync::Arc;

use tracing::info;

use crate::cache::{CacheHandles, EventBus, TokenBlacklist};
use crate::config::{AppConfig, StorageBackend};
use crate::database::{DatabaseManager, DocumentStore, MemoryDocumentStore, PgDocumentStore};
use crate::observer::{implementations, ObserverPipeline};
use crate::services::notification_service::NotificationService;

/// Shared handles injected into every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub blacklist: Arc<dyn TokenBlacklist>,
    pub events: Arc<dyn EventBus>,
    pub pipeline: Arc<ObserverPipeline>,
}

impl AppState {
    /// Connects the configured backends
    pub async fn connect(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.database.backend {
            StorageBackend::Postgres => {
                let pool = DatabaseManager::connect(&config.database).await?;
                Arc::new(PgDocumentStore::new(pool))
            }
            StorageBackend::Memory => {
                info!("Using in-memory document store; data is lost on restart");
                Arc::new(MemoryDocumentStore::new())
            }
        };
        let cache = CacheHandles::connect(&config.redis).await?;
        Ok(Self::assemble(config, store, cache))
    }

    /// Process-local backends, used by tests and `DATABASE_BACKEND=memory`
    pub fn in_memory(config: AppConfig) -> Self {
        Self::assemble(config, Arc::new(MemoryDocumentStore::new()), CacheHandles::memory())
    }

    fn assemble(config: AppConfig, store: Arc<dyn DocumentStore>, cache: CacheHandles) -> Self {
        let notifications = Arc::new(NotificationService::new(store.clone(), cache.events.clone()));
        let pipeline = implementations::default_pipeline(notifications);
        info!(observers = pipeline.observer_count(), "Observer pipeline ready");

        Self {
            config: Arc::new(config),
            store,
            blacklist: cache.blacklist,
            events: cache.events,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn notifications(&self) -> NotificationService {
        NotificationService::new(self.store.clone(), self.events.clone())
    }
}
