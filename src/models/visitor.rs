//! Visitor model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::enums::Gender;

/// Registered visitor
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Visitor {
    /// Internal record id
    pub id: i64,
    /// Chat identity, immutable and unique
    pub telegram_id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
    /// Digits only, `+` and spaces stripped at registration
    pub phone: String,
    /// Attribution label resolved from the deep-link
    pub source: String,
    pub profile_photo: Option<String>,
    pub gender: Option<Gender>,
    pub registered_at: DateTime<Utc>,
    pub attended: bool,
    pub attended_date: Option<DateTime<Utc>>,
}

impl Visitor {
    pub fn display_name(&self) -> &str {
        self.first_name.as_deref().unwrap_or("Guest")
    }
}

/// Create visitor request
#[derive(Debug, Clone)]
pub struct NewVisitor {
    pub telegram_id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
    pub phone: String,
    pub source: String,
    pub profile_photo: Option<String>,
}

/// Broadcast recipient
#[derive(Debug, Clone, FromRow)]
pub struct Recipient {
    pub telegram_id: i64,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SourceCount {
    pub source: String,
    pub count: i64,
}

/// Visitor statistics for the panel
#[derive(Debug, Clone)]
pub struct VisitorStats {
    pub total: i64,
    pub attended_today: i64,
    pub by_source: Vec<SourceCount>,
}
