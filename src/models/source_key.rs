//! QR source key model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A named entry point tied to a deep-link; also used as an attendance location label
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SourceKey {
    pub id: i64,
    /// Lower-cased key, used as the `/start` parameter
    pub key: String,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}
