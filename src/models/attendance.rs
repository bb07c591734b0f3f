//! Attendance log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Append-only record of one check-in
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceEvent {
    pub id: i64,
    pub visitor_telegram_id: i64,
    pub location: String,
    /// Staff member who marked the visit
    pub marked_by: i64,
    pub marked_at: DateTime<Utc>,
}

/// Attendance event joined with visitor and staff details, one spreadsheet row each
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceExportRow {
    pub id: i64,
    pub marked_at: DateTime<Utc>,
    pub location: String,
    pub visitor_telegram_id: i64,
    pub first_name: Option<String>,
    pub phone: Option<String>,
    pub marked_by: i64,
    pub staff_name: Option<String>,
}

/// Number of check-ins marked by one staff member in a window
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CashierTally {
    pub staff_id: i64,
    pub full_name: Option<String>,
    pub location: Option<String>,
    pub total: i64,
}
