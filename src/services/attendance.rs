//! Attendance marking

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::{
    error::AppResult,
    models::{Capability, Visitor},
    repository::Repository,
    telegram::{escape_html, Messenger},
};

use super::{calendar::format_local, permissions::PermissionService};

/// What to do with a visitor once found, given the staff member's locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendancePlan {
    /// No resolvable location; marking is refused
    NoAccess,
    /// Exactly one location; record straight away
    Immediate(String),
    /// Several locations; staff must pick one first
    Choose(Vec<String>),
}

impl AttendancePlan {
    pub fn from_locations(mut locations: Vec<String>) -> Self {
        match locations.len() {
            0 => AttendancePlan::NoAccess,
            1 => AttendancePlan::Immediate(locations.remove(0)),
            _ => AttendancePlan::Choose(locations),
        }
    }
}

#[derive(Clone)]
pub struct AttendanceService {
    repository: Repository,
    permissions: PermissionService,
    messenger: Arc<dyn Messenger>,
    offset: FixedOffset,
}

impl AttendanceService {
    pub fn new(
        repository: Repository,
        permissions: PermissionService,
        messenger: Arc<dyn Messenger>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            repository,
            permissions,
            messenger,
            offset,
        }
    }

    /// Authorize `staff_id` and work out how marking should proceed
    pub async fn plan(&self, staff_id: i64) -> AppResult<AttendancePlan> {
        self.permissions.authorize(staff_id, Capability::MarkAttendance).await?;
        let locations = self.permissions.accessible_locations(staff_id).await?;
        Ok(AttendancePlan::from_locations(locations))
    }

    /// Record one check-in of `visitor` at `location`. The staff member must
    /// hold the capability and have access to that location.
    pub async fn record(&self, visitor: &Visitor, location: &str, staff_id: i64) -> AppResult<DateTime<Utc>> {
        self.permissions.authorize(staff_id, Capability::MarkAttendance).await?;
        let locations = self.permissions.accessible_locations(staff_id).await?;
        if locations.is_empty() {
            return Err(no_access());
        }
        if !locations.iter().any(|l| l == location) {
            return Err(crate::error::AppError::Authorization(format!(
                "You cannot mark attendance at {}.",
                location
            )));
        }

        let marked_at = Utc::now();
        let event = self
            .repository
            .attendance
            .record(visitor.telegram_id, location, staff_id, marked_at)
            .await?;

        tracing::info!(
            visitor = visitor.telegram_id,
            location = %event.location,
            staff = staff_id,
            "Attendance recorded"
        );
        Ok(event.marked_at)
    }

    /// Tell the visitor about the check-in without waiting for delivery.
    /// Delivery failures are logged and never affect the stored record.
    pub fn notify_visitor(&self, visitor_telegram_id: i64, location: &str, marked_at: DateTime<Utc>) {
        let messenger = self.messenger.clone();
        let text = format!(
            "✅ Your visit to <b>{}</b> was recorded.\n🕒 {}",
            escape_html(location),
            format_local(marked_at, self.offset)
        );
        tokio::spawn(async move {
            if let Err(e) = messenger.send_text(visitor_telegram_id, &text, None).await {
                tracing::warn!(visitor = visitor_telegram_id, error = %e, "Attendance notification not delivered");
            }
        });
    }

    pub fn format_time(&self, at: DateTime<Utc>) -> String {
        format_local(at, self.offset)
    }
}

pub fn no_access() -> crate::error::AppError {
    crate::error::AppError::Authorization(
        "No location is assigned to you, so you cannot mark attendance. Ask a superadmin.".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AccessConfig,
        error::AppError,
        models::{NewStaffMember, NewVisitor, Role},
        repository::memory::MemoryStore,
        services::calendar::offset_from_minutes,
        telegram::MockMessenger,
    };

    const SUPERADMIN: i64 = 1;

    async fn setup() -> (AttendanceService, Repository, Arc<MemoryStore>, Visitor) {
        setup_with(MockMessenger::new()).await
    }

    async fn setup_with(messenger: MockMessenger) -> (AttendanceService, Repository, Arc<MemoryStore>, Visitor) {
        let (repository, store) = MemoryStore::repository();
        let visitor = repository
            .visitors
            .create(&NewVisitor {
                telegram_id: 500,
                first_name: Some("Dilnoza".to_string()),
                username: None,
                phone: "998901234567".to_string(),
                source: "Ice Arena".to_string(),
                profile_photo: None,
            })
            .await
            .unwrap();
        repository.source_keys.create("ice_arena", SUPERADMIN).await.unwrap();
        repository.source_keys.create("bowling", SUPERADMIN).await.unwrap();

        let permissions = PermissionService::new(
            repository.clone(),
            AccessConfig {
                superadmins: vec![SUPERADMIN],
                ..AccessConfig::default()
            },
        );
        let service = AttendanceService::new(
            repository.clone(),
            permissions,
            Arc::new(messenger),
            offset_from_minutes(0),
        );
        (service, repository, store, visitor)
    }

    async fn add_cashier(repository: &Repository, telegram_id: i64, location: Option<&str>) {
        repository
            .staff
            .create(&NewStaffMember {
                telegram_id,
                role: Role::Cashier,
                full_name: None,
                location: location.map(str::to_string),
                added_by: SUPERADMIN,
            })
            .await
            .unwrap();
    }

    #[test]
    fn test_plan_from_locations() {
        assert_eq!(AttendancePlan::from_locations(vec![]), AttendancePlan::NoAccess);
        assert_eq!(
            AttendancePlan::from_locations(vec!["cafe".to_string()]),
            AttendancePlan::Immediate("cafe".to_string())
        );
        assert!(matches!(
            AttendancePlan::from_locations(vec!["a".to_string(), "b".to_string()]),
            AttendancePlan::Choose(l) if l.len() == 2
        ));
    }

    #[tokio::test]
    async fn test_each_call_appends_an_event() {
        let (service, repository, store, visitor) = setup().await;

        let mut last = None;
        for _ in 0..3 {
            last = Some(service.record(&visitor, "ice_arena", SUPERADMIN).await.unwrap());
        }

        assert_eq!(store.events().len(), 3);
        let stored = repository.visitors.get_by_telegram_id(500).await.unwrap().unwrap();
        assert!(stored.attended);
        assert_eq!(stored.attended_date, last);
    }

    #[tokio::test]
    async fn test_unassigned_cashier_has_no_access() {
        let (service, _, store, visitor) = setup().await;
        add_cashier(&service.repository, 20, None).await;

        assert_eq!(service.plan(20).await.unwrap(), AttendancePlan::NoAccess);
        let result = service.record(&visitor, "ice_arena", 20).await;
        assert!(matches!(result, Err(AppError::Authorization(_))));
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn test_cashier_limited_to_assigned_location() {
        let (service, _, store, visitor) = setup().await;
        add_cashier(&service.repository, 21, Some("bowling")).await;

        assert_eq!(
            service.plan(21).await.unwrap(),
            AttendancePlan::Immediate("bowling".to_string())
        );
        assert!(service.record(&visitor, "ice_arena", 21).await.is_err());
        tokio_test::assert_ok!(service.record(&visitor, "bowling", 21).await);
        assert_eq!(store.events()[0].marked_by, 21);
    }

    #[tokio::test]
    async fn test_superadmin_chooses_between_locations() {
        let (service, _, _, _) = setup().await;
        assert_eq!(
            service.plan(SUPERADMIN).await.unwrap(),
            AttendancePlan::Choose(vec!["ice_arena".to_string(), "bowling".to_string()])
        );
    }

    #[tokio::test]
    async fn test_smm_cannot_mark() {
        let (service, repository, _, visitor) = setup().await;
        repository
            .staff
            .create(&NewStaffMember {
                telegram_id: 30,
                role: Role::Smm,
                full_name: None,
                location: None,
                added_by: SUPERADMIN,
            })
            .await
            .unwrap();

        tokio_test::assert_err!(service.plan(30).await);
        tokio_test::assert_err!(service.record(&visitor, "ice_arena", 30).await);
    }

    #[tokio::test]
    async fn test_undelivered_notification_keeps_the_record() {
        let (attempted, mut attempt) = tokio::sync::mpsc::unbounded_channel();
        let mut messenger = MockMessenger::new();
        messenger
            .expect_send_text()
            .withf(|chat, text, _| *chat == 500 && text.contains("<b>ice_arena</b>"))
            .times(1)
            .returning(move |_, _, _| {
                let _ = attempted.send(());
                Err(AppError::Telegram("Forbidden: bot was blocked by the user".to_string()))
            });
        let (service, repository, store, visitor) = setup_with(messenger).await;

        let marked_at = service.record(&visitor, "ice_arena", SUPERADMIN).await.unwrap();
        service.notify_visitor(visitor.telegram_id, "ice_arena", marked_at);

        tokio::time::timeout(std::time::Duration::from_secs(5), attempt.recv())
            .await
            .expect("notification was not attempted");
        assert_eq!(store.events().len(), 1);
        let stored = repository.visitors.get_by_telegram_id(500).await.unwrap().unwrap();
        assert_eq!(stored.attended_date, Some(marked_at));
    }
}
