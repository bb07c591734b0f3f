//! Data models for the check-in bot

pub mod attendance;
pub mod enums;
pub mod source_key;
pub mod staff;
pub mod visitor;

// Re-export commonly used types
pub use attendance::{AttendanceEvent, AttendanceExportRow, CashierTally};
pub use enums::{Gender, Segment};
pub use source_key::SourceKey;
pub use staff::{Capability, NewStaffMember, Role, StaffMember};
pub use visitor::{NewVisitor, Recipient, SourceCount, Visitor, VisitorStats};
