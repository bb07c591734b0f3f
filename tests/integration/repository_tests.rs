use chrono::{Duration, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use venue_checkin::{
    error::AppError,
    models::{Gender, NewStaffMember, NewVisitor, Role},
    repository::{schema, Repository},
};

async fn setup() -> (PgPool, Repository) {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    schema::ensure_schema(&pool).await.expect("Failed to create schema");
    (pool.clone(), Repository::new(pool))
}

/// Identity unlikely to collide with real rows or other test runs
fn unique_id() -> i64 {
    9_000_000_000 + (Utc::now().timestamp_nanos_opt().unwrap_or_default() % 900_000_000)
}

fn new_visitor(telegram_id: i64) -> NewVisitor {
    NewVisitor {
        telegram_id,
        first_name: Some("Integration".to_string()),
        username: Some(format!("it_{}", telegram_id)),
        phone: format!("{}", telegram_id),
        source: "Ice Arena".to_string(),
        profile_photo: None,
    }
}

async fn cleanup(pool: &PgPool, telegram_id: i64) {
    sqlx::query("DELETE FROM attendance_events WHERE visitor_telegram_id = $1 OR marked_by = $1")
        .bind(telegram_id)
        .execute(pool)
        .await
        .ok();
    sqlx::query("DELETE FROM visitors WHERE telegram_id = $1")
        .bind(telegram_id)
        .execute(pool)
        .await
        .ok();
    sqlx::query("DELETE FROM staff WHERE telegram_id = $1")
        .bind(telegram_id)
        .execute(pool)
        .await
        .ok();
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_schema_is_idempotent() {
    let (pool, _) = setup().await;
    schema::ensure_schema(&pool).await.expect("second run must succeed");
}

#[tokio::test]
#[ignore]
async fn test_visitor_is_unique_per_identity() {
    let (pool, repository) = setup().await;
    let id = unique_id();

    let created = repository.visitors.create(&new_visitor(id)).await.unwrap();
    assert_eq!(created.telegram_id, id);
    assert!(!created.attended);

    let duplicate = repository.visitors.create(&new_visitor(id)).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let by_handle = repository
        .visitors
        .get_by_username(&format!("IT_{}", id))
        .await
        .unwrap();
    assert_eq!(by_handle.map(|v| v.id), Some(created.id));

    repository.visitors.set_gender(id, Gender::Female).await.unwrap();
    let recipients = repository.visitors.recipients(Some(Gender::Female)).await.unwrap();
    assert!(recipients.iter().any(|r| r.telegram_id == id));

    cleanup(&pool, id).await;
}

#[tokio::test]
#[ignore]
async fn test_attendance_appends_events() {
    let (pool, repository) = setup().await;
    let id = unique_id();
    repository.visitors.create(&new_visitor(id)).await.unwrap();

    let first = Utc::now() - Duration::minutes(5);
    let second = Utc::now();
    repository.attendance.record(id, "ice_arena", id, first).await.unwrap();
    let event = repository.attendance.record(id, "ice_arena", id, second).await.unwrap();
    assert_eq!(event.location, "ice_arena");

    let visitor = repository.visitors.get_by_telegram_id(id).await.unwrap().unwrap();
    assert!(visitor.attended);
    assert_eq!(
        visitor.attended_date.map(|d| d.timestamp_micros()),
        Some(second.timestamp_micros())
    );

    let events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance_events WHERE visitor_telegram_id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(events, 2);

    let tallies = repository
        .attendance
        .tallies_by_staff(first - Duration::minutes(1), second + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(tallies.iter().find(|t| t.staff_id == id).map(|t| t.total), Some(2));

    cleanup(&pool, id).await;
}

#[tokio::test]
#[ignore]
async fn test_attendance_for_unknown_visitor_writes_nothing() {
    let (pool, repository) = setup().await;
    let id = unique_id();

    let result = repository.attendance.record(id, "cafe", 1, Utc::now()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance_events WHERE visitor_telegram_id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(events, 0);
}

#[tokio::test]
#[ignore]
async fn test_staff_roles_round_trip() {
    let (pool, repository) = setup().await;
    let id = unique_id();

    repository
        .staff
        .create(&NewStaffMember {
            telegram_id: id,
            role: Role::Cashier,
            full_name: Some("Integration".to_string()),
            location: Some("cafe".to_string()),
            added_by: 1,
        })
        .await
        .unwrap();

    let stored = repository.staff.get(id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Cashier);
    assert_eq!(stored.location.as_deref(), Some("cafe"));

    repository.staff.delete(id).await.unwrap();
    assert!(matches!(repository.staff.delete(id).await, Err(AppError::NotFound(_))));

    cleanup(&pool, id).await;
}

#[tokio::test]
#[ignore]
async fn test_source_key_issued_once() {
    let (pool, repository) = setup().await;
    let key = format!("it_{}", unique_id() % 1_000_000);

    let first = repository.source_keys.create(&key, 1).await.unwrap();
    let again = repository.source_keys.create(&key, 2).await.unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(again.created_by, 1);

    sqlx::query("DELETE FROM source_keys WHERE key = $1")
        .bind(&key)
        .execute(&pool)
        .await
        .ok();
}
