//! Role resolution and authorization

use crate::{
    config::AccessConfig,
    error::{AppError, AppResult},
    models::{Capability, Role},
    repository::Repository,
};

/// Single place where a chat identity is turned into a role. The bootstrap
/// allow-list is consulted here and nowhere else.
#[derive(Clone)]
pub struct PermissionService {
    repository: Repository,
    access: AccessConfig,
}

impl PermissionService {
    pub fn new(repository: Repository, access: AccessConfig) -> Self {
        Self { repository, access }
    }

    /// Resolve the role of `telegram_id`; `Role::User` when not staff
    pub async fn resolve_role(&self, telegram_id: i64) -> AppResult<Role> {
        if self.access.is_bootstrap_superadmin(telegram_id) {
            return Ok(Role::Superadmin);
        }
        let staff = self.repository.staff.get(telegram_id).await?;
        Ok(staff.map(|s| s.role).unwrap_or(Role::User))
    }

    /// Resolve the role and require it to hold `capability`
    pub async fn authorize(&self, telegram_id: i64, capability: Capability) -> AppResult<Role> {
        let role = self.resolve_role(telegram_id).await?;
        if role.can(capability) {
            Ok(role)
        } else {
            tracing::debug!(telegram_id, role = %role, ?capability, "Action refused");
            Err(AppError::Authorization(
                "You do not have permission for this action.".to_string(),
            ))
        }
    }

    /// Locations `telegram_id` may mark attendance for. Cashiers get their
    /// assigned location only, or nothing when unassigned; everyone else
    /// gets every issued source key.
    pub async fn accessible_locations(&self, telegram_id: i64) -> AppResult<Vec<String>> {
        if !self.access.is_bootstrap_superadmin(telegram_id) {
            if let Some(staff) = self.repository.staff.get(telegram_id).await? {
                if staff.role == Role::Cashier {
                    return Ok(staff.location.into_iter().collect());
                }
            }
        }
        self.repository.source_keys.labels().await
    }
}
