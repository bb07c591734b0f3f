//! Staff management

use crate::{
    error::{AppError, AppResult},
    models::{Capability, NewStaffMember, Role, StaffMember},
    repository::Repository,
};

use super::permissions::PermissionService;

/// Parse `"<id>"` or `"<id> <display name>"`
pub fn parse_staff_input(input: &str) -> AppResult<(i64, Option<String>)> {
    let input = input.trim();
    let (id, name) = match input.split_once(char::is_whitespace) {
        Some((id, name)) => (id, Some(name.trim())),
        None => (input, None),
    };
    let telegram_id = id
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::Validation("Send a numeric Telegram ID, optionally followed by a name.".to_string()))?;
    let name = name.filter(|n| !n.is_empty()).map(str::to_string);
    Ok((telegram_id, name))
}

#[derive(Clone)]
pub struct StaffService {
    repository: Repository,
    permissions: PermissionService,
}

impl StaffService {
    pub fn new(repository: Repository, permissions: PermissionService) -> Self {
        Self {
            repository,
            permissions,
        }
    }

    /// First step of a grant: parse the target and make sure it is free
    pub async fn check_available(&self, actor: i64, input: &str) -> AppResult<(i64, Option<String>)> {
        self.permissions.authorize(actor, Capability::ManageStaff).await?;
        let (telegram_id, name) = parse_staff_input(input)?;
        if self.repository.staff.get(telegram_id).await?.is_some() {
            return Err(AppError::Conflict(format!("{} is already a staff member.", telegram_id)));
        }
        Ok((telegram_id, name))
    }

    /// Locations a cashier can be assigned to
    pub async fn locations(&self, actor: i64) -> AppResult<Vec<String>> {
        self.permissions.authorize(actor, Capability::ManageStaff).await?;
        self.repository.source_keys.labels().await
    }

    pub async fn add(
        &self,
        actor: i64,
        telegram_id: i64,
        full_name: Option<String>,
        role: Role,
        location: Option<String>,
    ) -> AppResult<StaffMember> {
        self.permissions.authorize(actor, Capability::ManageStaff).await?;

        if !role.is_staff() {
            return Err(AppError::Validation(format!("{} cannot be granted.", role)));
        }
        let location = match (role, location) {
            (Role::Cashier, None) => {
                return Err(AppError::Validation("A cashier needs a location.".to_string()));
            }
            (Role::Cashier, Some(location)) => {
                if !self.repository.source_keys.labels().await?.contains(&location) {
                    return Err(AppError::NotFound(format!("Location {} does not exist.", location)));
                }
                Some(location)
            }
            _ => None,
        };

        let staff = self
            .repository
            .staff
            .create(&NewStaffMember {
                telegram_id,
                role,
                full_name,
                location,
                added_by: actor,
            })
            .await?;

        tracing::info!(actor, telegram_id, role = %staff.role, "Staff role granted");
        Ok(staff)
    }

    pub async fn list(&self, actor: i64) -> AppResult<Vec<StaffMember>> {
        self.permissions.authorize(actor, Capability::ManageStaff).await?;
        self.repository.staff.list().await
    }

    /// Staff records that may be deleted
    pub async fn removable(&self, actor: i64) -> AppResult<Vec<StaffMember>> {
        Ok(self
            .list(actor)
            .await?
            .into_iter()
            .filter(|s| s.role != Role::Superadmin)
            .collect())
    }

    /// Delete a staff record. Superadmin records are never deleted.
    pub async fn remove(&self, actor: i64, telegram_id: i64) -> AppResult<StaffMember> {
        self.permissions.authorize(actor, Capability::ManageStaff).await?;

        let staff = self
            .repository
            .staff
            .get(telegram_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Staff member {} not found.", telegram_id)))?;
        if staff.role == Role::Superadmin {
            return Err(AppError::BusinessRule("A superadmin cannot be removed.".to_string()));
        }

        self.repository.staff.delete(telegram_id).await?;
        tracing::info!(actor, telegram_id, role = %staff.role, "Staff role revoked");
        Ok(staff)
    }
}
