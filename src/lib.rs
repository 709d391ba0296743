//! PixelPast server
//!
//! Museum discovery and guided tour booking: a CSV booking ledger mirrored to
//! PostgreSQL, a museum catalog with a file fallback, recommendation rankers
//! and an LLM-backed museum assistant behind a REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod recommend;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
