//! Idempotent schema creation, run once at startup

use sqlx::{Pool, Postgres};

use crate::error::AppResult;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS visitors (
        id BIGSERIAL PRIMARY KEY,
        telegram_id BIGINT NOT NULL UNIQUE,
        first_name VARCHAR(100),
        username VARCHAR(100),
        phone VARCHAR(20) NOT NULL CHECK (phone <> ''),
        source VARCHAR(100) NOT NULL,
        profile_photo TEXT,
        gender VARCHAR(10) CHECK (gender IN ('male', 'female')),
        registered_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        attended BOOLEAN NOT NULL DEFAULT FALSE,
        attended_date TIMESTAMPTZ
    )
    "#,
    "CREATE INDEX IF NOT EXISTS visitors_phone_idx ON visitors (phone)",
    "CREATE INDEX IF NOT EXISTS visitors_username_idx ON visitors (LOWER(username))",
    r#"
    CREATE TABLE IF NOT EXISTS staff (
        telegram_id BIGINT PRIMARY KEY,
        role VARCHAR(20) NOT NULL CHECK (role IN ('cashier', 'analyst', 'admin', 'smm', 'superadmin')),
        full_name VARCHAR(100),
        location VARCHAR(100),
        added_by BIGINT,
        added_at TIMESTAMPTZ DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS source_keys (
        id BIGSERIAL PRIMARY KEY,
        key VARCHAR(50) NOT NULL UNIQUE,
        created_by BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance_events (
        id BIGSERIAL PRIMARY KEY,
        visitor_telegram_id BIGINT NOT NULL,
        location VARCHAR(100) NOT NULL,
        marked_by BIGINT NOT NULL,
        marked_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS attendance_events_marked_at_idx ON attendance_events (marked_at)",
];

/// Create tables and indexes if they do not exist yet
pub async fn ensure_schema(pool: &Pool<Postgres>) -> AppResult<()> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!(statements = STATEMENTS.len(), "Database schema ensured");
    Ok(())
}
