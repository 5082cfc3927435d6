//! Token blacklist and notification relay.
//!
//! Both concerns live in Redis when `REDIS_URL` is configured and fall back to
//! process memory otherwise, so a single node runs without external services.

pub mod memory;
pub mod redis_cache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;
use tracing::info;

use crate::config::RedisConfig;

pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Redis(#[from] ::redis::RedisError),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Revoked JWT ids, kept until the token would have expired anyway
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    async fn revoke(&self, jti: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn is_revoked(&self, jti: &str) -> Result<bool, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}

/// Publish/subscribe over named channels
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), CacheError>;

    /// Payloads published on `channel` after the call returns
    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>, CacheError>;
}

/// Both halves of the cache, backed by the same implementation
#[derive(Clone)]
pub struct CacheHandles {
    pub blacklist: Arc<dyn TokenBlacklist>,
    pub events: Arc<dyn EventBus>,
}

impl CacheHandles {
    pub fn memory() -> Self {
        let cache = Arc::new(MemoryCache::new());
        Self {
            blacklist: cache.clone(),
            events: cache,
        }
    }

    pub async fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
        match &config.url {
            Some(url) => {
                let cache = Arc::new(RedisCache::connect(url, config).await?);
                Ok(Self {
                    blacklist: cache.clone(),
                    events: cache,
                })
            }
            None => {
                info!("REDIS_URL not set, using in-memory token blacklist and event bus");
                Ok(Self::memory())
            }
        }
    }
}
