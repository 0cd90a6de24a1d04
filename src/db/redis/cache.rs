use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::{mpsc, oneshot};

use crate::db::CacheBackend;
use crate::error::{AppError, AppResult};
use crate::models::Fingerprint;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Unpersonalized recommendation result for a preference fingerprint
    Recommendation(Fingerprint),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendation(fingerprint) => write!(f, "recommend:{}", fingerprint),
        }
    }
}

/// Creates a Redis client
///
/// Connections are multiplexed, so one client is shared by all requests.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// A queued write and the channel its outcome is reported on
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
    ack: oneshot::Sender<AppResult<()>>,
}

/// Redis-backed cache whose writes are serialized through one writer task
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task to flush pending writes and stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache and spawns its writer task
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        (cache, CacheWriterHandle { shutdown_tx })
    }

    /// Drains write messages into Redis until shutdown, then flushes the rest
    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    Self::apply(&client, msg).await;
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    let mut flushed = 0usize;
                    while let Some(msg) = write_rx.recv().await {
                        if Self::apply(&client, msg).await {
                            flushed += 1;
                        }
                    }

                    tracing::info!(flushed, "Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Writes one message and acknowledges it. Returns whether the write succeeded.
    async fn apply(client: &Client, msg: CacheWriteMessage) -> bool {
        let CacheWriteMessage {
            key,
            value,
            ttl,
            ack,
        } = msg;

        let result = Self::write_to_redis(client, &key, value, ttl).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, key = %key, "Failed to write to Redis cache");
        }

        let succeeded = result.is_ok();
        // The requester may have stopped waiting; the write stands either way.
        let _ = ack.send(result);
        succeeded
    }

    async fn write_to_redis(client: &Client, key: &str, value: String, ttl: u64) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, value, ttl).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CacheBackend for Cache {
    async fn get(&self, key: &CacheKey) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;
        Ok(cached)
    }

    async fn set(&self, key: &CacheKey, value: String, ttl: u64) -> AppResult<()> {
        let (ack, written) = oneshot::channel();
        let msg = CacheWriteMessage {
            key: key.to_string(),
            value,
            ttl,
            ack,
        };

        self.write_tx
            .send(msg)
            .map_err(|_| AppError::Internal("cache writer has stopped".to_string()))?;

        written
            .await
            .map_err(|_| AppError::Internal("cache writer dropped the write".to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PreferenceVector;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    #[test]
    fn test_cache_key_display_recommendation() {
        let fingerprint = Fingerprint::of(&PreferenceVector {
            cafe_score: Some(0.5),
            ..Default::default()
        });
        let key = CacheKey::Recommendation(fingerprint);
        assert_eq!(key.to_string(), "recommend:v1|||||=0.5|||||||");
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_cache_miss() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client);

        let key = CacheKey::Recommendation(Fingerprint::of(&PreferenceVector {
            age: Some(-1),
            ..Default::default()
        }));
        let retrieved = cache.get(&key).await.unwrap();

        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_set_is_readable_once_acknowledged() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client.clone());

        let key = CacheKey::Recommendation(Fingerprint::of(&PreferenceVector {
            age: Some(-2),
            ..Default::default()
        }));
        cache.set(&key, "payload".to_string(), 60).await.unwrap();

        assert_eq!(cache.get(&key).await.unwrap(), Some("payload".to_string()));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_pending_write_flushed_on_shutdown() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, handle) = Cache::new(client.clone());

        let key = CacheKey::Recommendation(Fingerprint::of(&PreferenceVector {
            age: Some(-3),
            ..Default::default()
        }));
        let pending = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.set(&key, "payload".to_string(), 60).await })
        };

        handle.shutdown().await;
        pending.await.unwrap().unwrap();

        assert_eq!(cache.get(&key).await.unwrap(), Some("payload".to_string()));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }
}
