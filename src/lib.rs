//! Venue check-in bot
//!
//! Visitors register through a Telegram chat (deep-link source attribution,
//! channel subscription gate, phone capture); staff use a role-gated panel to
//! mark attendance, broadcast, issue QR entry points and export data.

use std::sync::Arc;

use sqlx::PgPool;

pub mod api;
pub mod bot;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod telegram;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub dispatcher: Arc<bot::dispatch::Dispatcher>,
    pub pool: PgPool,
}
