//! Repository layer for database operations

pub mod attendance;
#[cfg(test)]
pub mod memory;
pub mod schema;
pub mod source_keys;
pub mod staff;
pub mod visitors;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub use attendance::AttendanceStore;
pub use source_keys::SourceKeyStore;
pub use staff::StaffStore;
pub use visitors::VisitorStore;

/// Handles to every store. Each logical operation acquires its own pooled
/// connection or transaction; nothing is cached in process.
#[derive(Clone)]
pub struct Repository {
    pub visitors: Arc<dyn VisitorStore>,
    pub staff: Arc<dyn StaffStore>,
    pub source_keys: Arc<dyn SourceKeyStore>,
    pub attendance: Arc<dyn AttendanceStore>,
}

impl Repository {
    /// Create a PostgreSQL-backed repository with the given pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            visitors: Arc::new(visitors::VisitorsRepository::new(pool.clone())),
            staff: Arc::new(staff::StaffRepository::new(pool.clone())),
            source_keys: Arc::new(source_keys::SourceKeysRepository::new(pool.clone())),
            attendance: Arc::new(attendance::AttendanceRepository::new(pool)),
        }
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside a LIKE pattern
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
