use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tokio::sync::{broadcast, RwLock};
use tracing::warn;

use super::{CacheError, EventBus, TokenBlacklist};

const CHANNEL_CAPACITY: usize = 1024;

/// Process-local blacklist and broadcast bus
pub struct MemoryCache {
    revoked: RwLock<HashMap<String, Instant>>,
    tx: broadcast::Sender<(String, String)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            revoked: RwLock::new(HashMap::new()),
            tx,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenBlacklist for MemoryCache {
    async fn revoke(&self, jti: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, expires| *expires > now);
        revoked.insert(jti.to_string(), now + ttl.max(Duration::from_secs(1)));
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, CacheError> {
        let revoked = self.revoked.read().await;
        Ok(revoked.get(jti).is_some_and(|expires| *expires > Instant::now()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[async_trait]
impl EventBus for MemoryCache {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), CacheError> {
        // An error only means nobody is listening
        let _ = self.tx.send((channel.to_string(), payload));
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>, CacheError> {
        let rx = self.tx.subscribe();
        let channel = channel.to_string();
        Ok(stream::unfold((rx, channel), |(mut rx, channel)| async move {
            loop {
                match rx.recv().await {
                    Ok((c, payload)) if c == channel => return Some((payload, (rx, channel))),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(channel = %channel, skipped = skipped, "Subscriber lagged, events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revoked_tokens_expire() {
        let cache = MemoryCache::new();
        cache.revoke("jti-1", Duration::from_secs(60)).await.unwrap();
        assert!(cache.is_revoked("jti-1").await.unwrap());
        assert!(!cache.is_revoked("jti-2").await.unwrap());

        cache.revoked.write().await.insert("old".into(), Instant::now() - Duration::from_secs(1));
        assert!(!cache.is_revoked("old").await.unwrap());
    }

    #[tokio::test]
    async fn subscribers_only_see_their_channel() {
        let cache = MemoryCache::new();
        let mut stream = cache.subscribe("org-a").await.unwrap();
        cache.publish("org-b", "ignored".into()).await.unwrap();
        cache.publish("org-a", "hello".into()).await.unwrap();
        assert_eq!(stream.next().await.as_deref(), Some("hello"));
    }
}
