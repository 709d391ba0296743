//! Per-session conversation state for the assistant

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::redis::RedisService;
use crate::error::AppResult;

/// Turns kept per session
pub const MAX_TURNS: usize = 3;
/// Topic labels kept per session
pub const MAX_TOPICS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// What the assistant remembers about one visitor session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Subject areas inferred from questions, first mention first
    pub interests: Vec<String>,
    /// Question categories, oldest first
    pub topics: Vec<String>,
    pub query_count: u64,
    /// Most recent turns, oldest first
    pub turns: Vec<Turn>,
}

impl ConversationState {
    pub fn record(&mut self, topic: &str, interests: &[String], question: &str, answer: &str) {
        self.query_count += 1;

        self.topics.push(topic.to_string());
        if self.topics.len() > MAX_TOPICS {
            self.topics.remove(0);
        }

        for interest in interests {
            if !self.interests.contains(interest) {
                self.interests.push(interest.clone());
            }
        }

        self.turns.push(Turn {
            question: question.to_string(),
            answer: answer.to_string(),
        });
        if self.turns.len() > MAX_TURNS {
            let excess = self.turns.len() - MAX_TURNS;
            self.turns.drain(..excess);
        }
    }
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// State of a session, empty when unknown or expired
    async fn load(&self, session_id: &str) -> AppResult<ConversationState>;

    async fn save(&self, session_id: &str, state: &ConversationState) -> AppResult<()>;

    async fn reset(&self, session_id: &str) -> AppResult<()>;
}

/// Process-local store with idle expiry
pub struct MemoryConversations {
    entries: RwLock<HashMap<String, (Instant, ConversationState)>>,
    ttl: Duration,
}

impl MemoryConversations {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    async fn evict_expired(&self) {
        let ttl = self.ttl;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (touched, _)| touched.elapsed() < ttl);
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!("Evicted {} idle conversations", evicted);
        }
    }
}

#[async_trait]
impl ConversationStore for MemoryConversations {
    async fn load(&self, session_id: &str) -> AppResult<ConversationState> {
        self.evict_expired().await;
        let entries = self.entries.read().await;
        Ok(entries
            .get(session_id)
            .map(|(_, state)| state.clone())
            .unwrap_or_default())
    }

    async fn save(&self, session_id: &str, state: &ConversationState) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(session_id.to_string(), (Instant::now(), state.clone()));
        Ok(())
    }

    async fn reset(&self, session_id: &str) -> AppResult<()> {
        self.entries.write().await.remove(session_id);
        Ok(())
    }
}

/// Redis-backed store; the TTL is refreshed on every save
pub struct RedisConversations {
    redis: RedisService,
    ttl_secs: u64,
}

impl RedisConversations {
    pub fn new(redis: RedisService, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    fn key(session_id: &str) -> String {
        format!("chat:session:{}", session_id)
    }
}

#[async_trait]
impl ConversationStore for RedisConversations {
    async fn load(&self, session_id: &str) -> AppResult<ConversationState> {
        Ok(self
            .redis
            .get_json(&Self::key(session_id))
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, session_id: &str, state: &ConversationState) -> AppResult<()> {
        self.redis.set_json(&Self::key(session_id), state, self.ttl_secs).await
    }

    async fn reset(&self, session_id: &str) -> AppResult<()> {
        self.redis.delete(&Self::key(session_id)).await
    }
}
