//! Redis-backed conversation state

use async_trait::async_trait;
use redis::{AsyncCommands, Client};

use crate::error::{AppError, AppResult};

use super::dialogue::{Dialogue, DialogueStore};

#[derive(Clone)]
pub struct RedisDialogueStore {
    client: Client,
    ttl_seconds: u64,
}

impl RedisDialogueStore {
    /// Create a new Redis dialogue store
    pub async fn new(url: &str, ttl_seconds: u64) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client, ttl_seconds })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }

    fn key(chat_id: i64) -> String {
        format!("dialogue:{}", chat_id)
    }
}

#[async_trait]
impl DialogueStore for RedisDialogueStore {
    async fn get(&self, chat_id: i64) -> AppResult<Option<Dialogue>> {
        let mut conn = self.connection().await?;

        let raw: Option<String> = conn
            .get(Self::key(chat_id))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read dialogue from Redis: {}", e)))?;

        match raw {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(dialogue) => Ok(Some(dialogue)),
                Err(e) => {
                    // stale shape from an older release; treat as idle
                    tracing::warn!(chat_id, error = %e, "Discarding unreadable dialogue state");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn set(&self, chat_id: i64, dialogue: &Dialogue) -> AppResult<()> {
        let mut conn = self.connection().await?;

        let raw = serde_json::to_string(dialogue)
            .map_err(|e| AppError::Internal(format!("Failed to serialize dialogue: {}", e)))?;
        conn.set_ex::<_, _, ()>(Self::key(chat_id), raw, self.ttl_seconds)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store dialogue in Redis: {}", e)))?;

        Ok(())
    }

    async fn clear(&self, chat_id: i64) -> AppResult<()> {
        let mut conn = self.connection().await?;

        let _: () = conn
            .del(Self::key(chat_id))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to clear dialogue in Redis: {}", e)))?;

        Ok(())
    }
}
