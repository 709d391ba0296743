//! Business logic services

pub mod accounts;
pub mod assistant;
pub mod bookings;
pub mod conversations;
pub mod email;
pub mod gemini;
pub mod museums;
pub mod recommendations;
pub mod redis;
pub mod stats;
pub mod tickets;

use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::{AppConfig, ConversationBackend},
    error::AppResult,
    ledger::Ledger,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub bookings: bookings::BookingsService,
    pub museums: museums::MuseumsService,
    pub accounts: accounts::AccountsService,
    pub assistant: assistant::AssistantService,
    pub recommendations: recommendations::RecommendationsService,
    pub stats: stats::StatsService,
    pub email: email::EmailService,
    pub tickets: tickets::TicketService,
}

impl Services {
    /// Create all services with the given repository.
    ///
    /// `redis` is only used when conversations are configured to live there.
    pub async fn new(
        repository: Repository,
        config: &AppConfig,
        redis: Option<redis::RedisService>,
    ) -> AppResult<Self> {
        let storage = &config.storage;

        let ledger = Ledger::open(storage.ledger_path.clone()).await?;
        let tickets = tickets::TicketService::new(storage.qr_dir.clone());
        let bookings = bookings::BookingsService::new(
            ledger,
            Arc::new(repository.bookings.clone()),
            tickets.clone(),
        );

        let museums = museums::MuseumsService::new(
            Arc::new(repository.museums.clone()),
            museums::MuseumFile::new(storage.museums_fallback_path.clone()),
        );

        let conversations: Arc<dyn conversations::ConversationStore> = match (config.chat.store, redis) {
            (ConversationBackend::Redis, Some(redis)) => {
                Arc::new(conversations::RedisConversations::new(redis, config.chat.session_ttl_secs))
            }
            (ConversationBackend::Redis, None) => {
                tracing::warn!("Redis unavailable, keeping conversations in memory");
                Arc::new(conversations::MemoryConversations::new(Duration::from_secs(
                    config.chat.session_ttl_secs,
                )))
            }
            (ConversationBackend::Memory, _) => Arc::new(conversations::MemoryConversations::new(
                Duration::from_secs(config.chat.session_ttl_secs),
            )),
        };
        let assistant = assistant::AssistantService::new(
            gemini::from_config(&config.chat)?,
            conversations,
            museums.clone(),
        );

        Ok(Self {
            accounts: accounts::AccountsService::new(Arc::new(repository.accounts.clone()), config.auth.clone()),
            recommendations: recommendations::RecommendationsService::new(museums.clone(), bookings.clone()),
            stats: stats::StatsService::new(bookings.clone(), museums.clone(), storage.foreign_visitors_csv.clone()),
            email: email::EmailService::new(config.email.clone()),
            repository,
            bookings,
            museums,
            assistant,
            tickets,
        })
    }
}
