//! Redis service for short-lived JSON state

use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("Failed to get Redis connection: {}", e)))
    }

    /// Store a JSON value with expiration (in seconds)
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, expiration_seconds: u64) -> AppResult<()> {
        let payload = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Failed to encode {}: {}", key, e)))?;
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, payload, expiration_seconds)
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("Failed to store {} in Redis: {}", key, e)))?;
        Ok(())
    }

    /// Read a JSON value; unreadable payloads count as absent
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("Failed to read {} from Redis: {}", key, e)))?;

        Ok(raw.and_then(|payload| match serde_json::from_str(&payload) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Discarding unreadable Redis value {}: {}", key, e);
                None
            }
        }))
    }

    pub async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("Failed to delete {} from Redis: {}", key, e)))?;
        Ok(())
    }
}
