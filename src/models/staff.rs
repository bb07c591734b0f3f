//! Staff model, roles and the role → capability table

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};

/// Resolved role of a chat identity. `User` means "not staff" and is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Cashier,
    Analyst,
    Smm,
    Superadmin,
}

impl Role {
    /// Roles that can be granted to a staff record
    pub const ASSIGNABLE: [Role; 4] = [Role::Superadmin, Role::Analyst, Role::Smm, Role::Cashier];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Cashier => "cashier",
            Role::Analyst => "analyst",
            Role::Smm => "smm",
            Role::Superadmin => "superadmin",
        }
    }

    pub fn is_staff(&self) -> bool {
        *self != Role::User
    }

    pub fn can(&self, capability: Capability) -> bool {
        capability.allowed_roles().contains(self)
    }

    /// Capabilities in panel order
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL.into_iter().filter(|c| self.can(*c)).collect()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "cashier" => Ok(Role::Cashier),
            // "admin" is the legacy name of the analyst tier
            "analyst" | "admin" => Ok(Role::Analyst),
            "smm" => Ok(Role::Smm),
            "superadmin" => Ok(Role::Superadmin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// SQLx conversion for Role (stored as TEXT)
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Panel actions. Menu rendering and every handler check consult `allowed_roles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewStats,
    ExportData,
    Broadcast,
    IssueQr,
    MarkAttendance,
    ManageStaff,
    MonthlyReport,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::ViewStats,
        Capability::ExportData,
        Capability::Broadcast,
        Capability::IssueQr,
        Capability::MarkAttendance,
        Capability::ManageStaff,
        Capability::MonthlyReport,
    ];

    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Capability::ViewStats => &[Role::Analyst, Role::Superadmin],
            Capability::ExportData => &[Role::Analyst, Role::Superadmin],
            Capability::Broadcast => &[Role::Smm, Role::Superadmin],
            Capability::IssueQr => &[Role::Superadmin],
            Capability::MarkAttendance => &[Role::Cashier, Role::Analyst, Role::Superadmin],
            Capability::ManageStaff => &[Role::Superadmin],
            Capability::MonthlyReport => &[Role::Analyst, Role::Superadmin],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Capability::ViewStats => "📊 Statistics",
            Capability::ExportData => "📥 Excel export",
            Capability::Broadcast => "📣 Broadcast",
            Capability::IssueQr => "🔳 Issue QR code",
            Capability::MarkAttendance => "✅ Mark attendance",
            Capability::ManageStaff => "👥 Manage staff",
            Capability::MonthlyReport => "🗓 Monthly cashier report",
        }
    }
}

/// Staff record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StaffMember {
    pub telegram_id: i64,
    pub role: Role,
    pub full_name: Option<String>,
    /// Assigned location, only meaningful for cashiers
    pub location: Option<String>,
    pub added_by: Option<i64>,
    pub added_at: Option<DateTime<Utc>>,
}

impl StaffMember {
    pub fn display_name(&self) -> String {
        self.full_name
            .clone()
            .unwrap_or_else(|| self.telegram_id.to_string())
    }
}

/// Create staff request
#[derive(Debug, Clone)]
pub struct NewStaffMember {
    pub telegram_id: i64,
    pub role: Role,
    pub full_name: Option<String>,
    pub location: Option<String>,
    pub added_by: i64,
}
