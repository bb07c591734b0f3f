//! Statistics and the monthly cashier report

use chrono::{DateTime, FixedOffset, Utc};

use crate::{
    error::AppResult,
    models::{Capability, CashierTally, VisitorStats},
    repository::Repository,
};

use super::{
    calendar::{day_window, month_label, month_window},
    permissions::PermissionService,
};

#[derive(Debug, Clone, PartialEq)]
pub enum MonthlyReport {
    NoData { label: String },
    Tallies { label: String, rows: Vec<CashierTally> },
}

#[derive(Clone)]
pub struct ReportService {
    repository: Repository,
    permissions: PermissionService,
    offset: FixedOffset,
}

impl ReportService {
    pub fn new(repository: Repository, permissions: PermissionService, offset: FixedOffset) -> Self {
        Self {
            repository,
            permissions,
            offset,
        }
    }

    pub async fn stats(&self, actor: i64, now: DateTime<Utc>) -> AppResult<VisitorStats> {
        self.permissions.authorize(actor, Capability::ViewStats).await?;
        let today = day_window(now, self.offset)?;
        self.repository.visitors.stats(today.start, today.end).await
    }

    /// Attendance events per marking staff member in the local month of `now`
    pub async fn monthly_cashier_report(&self, actor: i64, now: DateTime<Utc>) -> AppResult<MonthlyReport> {
        self.permissions.authorize(actor, Capability::MonthlyReport).await?;

        let window = month_window(now, self.offset)?;
        let label = month_label(&window, self.offset);
        let rows = self
            .repository
            .attendance
            .tallies_by_staff(window.start, window.end)
            .await?;

        if rows.is_empty() {
            Ok(MonthlyReport::NoData { label })
        } else {
            Ok(MonthlyReport::Tallies { label, rows })
        }
    }
}
