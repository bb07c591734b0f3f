//! In-memory stores backing service tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        AttendanceEvent, AttendanceExportRow, CashierTally, Gender, NewStaffMember, NewVisitor,
        Recipient, SourceCount, SourceKey, StaffMember, Visitor, VisitorStats,
    },
};

use super::{AttendanceStore, Repository, SourceKeyStore, StaffStore, VisitorStore};

#[derive(Default)]
struct Tables {
    visitors: Vec<Visitor>,
    staff: Vec<StaffMember>,
    source_keys: Vec<SourceKey>,
    events: Vec<AttendanceEvent>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn repository() -> (Repository, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let repository = Repository {
            visitors: store.clone(),
            staff: store.clone(),
            source_keys: store.clone(),
            attendance: store.clone(),
        };
        (repository, store)
    }

    pub fn events(&self) -> Vec<AttendanceEvent> {
        self.tables.lock().unwrap().events.clone()
    }

    pub fn visitor_count(&self) -> usize {
        self.tables.lock().unwrap().visitors.len()
    }

    /// Seed an event with an explicit timestamp
    pub fn push_event(&self, visitor_telegram_id: i64, location: &str, marked_by: i64, marked_at: DateTime<Utc>) {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.events.len() as i64 + 1;
        tables.events.push(AttendanceEvent {
            id,
            visitor_telegram_id,
            location: location.to_string(),
            marked_by,
            marked_at,
        });
    }
}

#[async_trait]
impl VisitorStore for MemoryStore {
    async fn get_by_telegram_id(&self, telegram_id: i64) -> AppResult<Option<Visitor>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.visitors.iter().find(|v| v.telegram_id == telegram_id).cloned())
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Option<Visitor>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.visitors.iter().find(|v| v.id == id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<Visitor>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .visitors
            .iter()
            .find(|v| {
                v.username
                    .as_deref()
                    .is_some_and(|u| u.to_lowercase() == username.to_lowercase())
            })
            .cloned())
    }

    async fn get_by_phone(&self, phone: &str) -> AppResult<Option<Visitor>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.visitors.iter().find(|v| v.phone == phone).cloned())
    }

    async fn exists(&self, telegram_id: i64) -> AppResult<bool> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.visitors.iter().any(|v| v.telegram_id == telegram_id))
    }

    async fn create(&self, data: &NewVisitor) -> AppResult<Visitor> {
        let mut tables = self.tables.lock().unwrap();
        if tables.visitors.iter().any(|v| v.telegram_id == data.telegram_id) {
            return Err(AppError::Conflict("You are already registered.".to_string()));
        }
        let visitor = Visitor {
            id: tables.visitors.len() as i64 + 1,
            telegram_id: data.telegram_id,
            first_name: data.first_name.clone(),
            username: data.username.clone(),
            phone: data.phone.clone(),
            source: data.source.clone(),
            profile_photo: data.profile_photo.clone(),
            gender: None,
            registered_at: Utc::now(),
            attended: false,
            attended_date: None,
        };
        tables.visitors.push(visitor.clone());
        Ok(visitor)
    }

    async fn set_gender(&self, telegram_id: i64, gender: Gender) -> AppResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let visitor = tables
            .visitors
            .iter_mut()
            .find(|v| v.telegram_id == telegram_id)
            .ok_or_else(|| AppError::NotFound("Visitor not found".to_string()))?;
        visitor.gender = Some(gender);
        Ok(())
    }

    async fn search(&self, query: &str, limit: i64) -> AppResult<Vec<Visitor>> {
        let needle = query.to_lowercase();
        let contains = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&needle));
        let tables = self.tables.lock().unwrap();
        // newest registrations first
        Ok(tables
            .visitors
            .iter()
            .rev()
            .filter(|v| {
                contains(Some(&v.phone)) || contains(v.username.as_deref()) || contains(v.first_name.as_deref())
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list(&self) -> AppResult<Vec<Visitor>> {
        Ok(self.tables.lock().unwrap().visitors.clone())
    }

    async fn recipients(&self, gender: Option<Gender>) -> AppResult<Vec<Recipient>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .visitors
            .iter()
            .filter(|v| gender.is_none() || v.gender == gender)
            .map(|v| Recipient {
                telegram_id: v.telegram_id,
                first_name: v.first_name.clone(),
            })
            .collect())
    }

    async fn stats(&self, day_start: DateTime<Utc>, day_end: DateTime<Utc>) -> AppResult<VisitorStats> {
        let tables = self.tables.lock().unwrap();
        let attended_today = tables
            .visitors
            .iter()
            .filter(|v| v.attended_date.is_some_and(|d| d >= day_start && d < day_end))
            .count() as i64;

        let mut by_source: Vec<SourceCount> = Vec::new();
        for visitor in &tables.visitors {
            match by_source.iter_mut().find(|s| s.source == visitor.source) {
                Some(entry) => entry.count += 1,
                None => by_source.push(SourceCount {
                    source: visitor.source.clone(),
                    count: 1,
                }),
            }
        }
        by_source.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.source.cmp(&b.source)));

        Ok(VisitorStats {
            total: tables.visitors.len() as i64,
            attended_today,
            by_source,
        })
    }
}

#[async_trait]
impl StaffStore for MemoryStore {
    async fn get(&self, telegram_id: i64) -> AppResult<Option<StaffMember>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.staff.iter().find(|s| s.telegram_id == telegram_id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<StaffMember>> {
        Ok(self.tables.lock().unwrap().staff.clone())
    }

    async fn create(&self, data: &NewStaffMember) -> AppResult<StaffMember> {
        let mut tables = self.tables.lock().unwrap();
        if tables.staff.iter().any(|s| s.telegram_id == data.telegram_id) {
            return Err(AppError::Conflict(format!("{} is already a staff member.", data.telegram_id)));
        }
        let staff = StaffMember {
            telegram_id: data.telegram_id,
            role: data.role,
            full_name: data.full_name.clone(),
            location: data.location.clone(),
            added_by: Some(data.added_by),
            added_at: Some(Utc::now()),
        };
        tables.staff.push(staff.clone());
        Ok(staff)
    }

    async fn delete(&self, telegram_id: i64) -> AppResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.staff.len();
        tables.staff.retain(|s| s.telegram_id != telegram_id);
        if tables.staff.len() == before {
            return Err(AppError::NotFound(format!("Staff member {} not found", telegram_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl SourceKeyStore for MemoryStore {
    async fn list(&self) -> AppResult<Vec<SourceKey>> {
        Ok(self.tables.lock().unwrap().source_keys.clone())
    }

    async fn labels(&self) -> AppResult<Vec<String>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.source_keys.iter().map(|k| k.key.clone()).collect())
    }

    async fn create(&self, key: &str, created_by: i64) -> AppResult<SourceKey> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(existing) = tables.source_keys.iter().find(|k| k.key == key) {
            return Ok(existing.clone());
        }
        let row = SourceKey {
            id: tables.source_keys.len() as i64 + 1,
            key: key.to_string(),
            created_by,
            created_at: Utc::now(),
        };
        tables.source_keys.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn record(
        &self,
        visitor_telegram_id: i64,
        location: &str,
        marked_by: i64,
        marked_at: DateTime<Utc>,
    ) -> AppResult<AttendanceEvent> {
        let mut tables = self.tables.lock().unwrap();
        let visitor = tables
            .visitors
            .iter_mut()
            .find(|v| v.telegram_id == visitor_telegram_id)
            .ok_or_else(|| AppError::NotFound("Visitor not found".to_string()))?;
        visitor.attended = true;
        visitor.attended_date = Some(marked_at);

        let event = AttendanceEvent {
            id: tables.events.len() as i64 + 1,
            visitor_telegram_id,
            location: location.to_string(),
            marked_by,
            marked_at,
        };
        tables.events.push(event.clone());
        Ok(event)
    }

    async fn list_export(&self) -> AppResult<Vec<AttendanceExportRow>> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<AttendanceExportRow> = tables
            .events
            .iter()
            .map(|e| {
                let visitor = tables.visitors.iter().find(|v| v.telegram_id == e.visitor_telegram_id);
                let staff = tables.staff.iter().find(|s| s.telegram_id == e.marked_by);
                AttendanceExportRow {
                    id: e.id,
                    marked_at: e.marked_at,
                    location: e.location.clone(),
                    visitor_telegram_id: e.visitor_telegram_id,
                    first_name: visitor.and_then(|v| v.first_name.clone()),
                    phone: visitor.map(|v| v.phone.clone()),
                    marked_by: e.marked_by,
                    staff_name: staff.and_then(|s| s.full_name.clone()),
                }
            })
            .collect();
        rows.sort_by(|a, b| b.marked_at.cmp(&a.marked_at).then_with(|| b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn tallies_by_staff(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Vec<CashierTally>> {
        let tables = self.tables.lock().unwrap();
        let mut tallies: Vec<CashierTally> = Vec::new();
        for event in tables.events.iter().filter(|e| e.marked_at >= start && e.marked_at < end) {
            match tallies.iter_mut().find(|t| t.staff_id == event.marked_by) {
                Some(tally) => tally.total += 1,
                None => {
                    let staff = tables.staff.iter().find(|s| s.telegram_id == event.marked_by);
                    tallies.push(CashierTally {
                        staff_id: event.marked_by,
                        full_name: staff.and_then(|s| s.full_name.clone()),
                        location: staff.and_then(|s| s.location.clone()),
                        total: 1,
                    });
                }
            }
        }
        tallies.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.staff_id.cmp(&b.staff_id)));
        Ok(tallies)
    }
}
