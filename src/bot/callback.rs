//! Button payloads. Telegram limits `callback_data` to 64 bytes, so payloads
//! are short colon-delimited strings.

use std::fmt;

use crate::models::{Gender, Role, Segment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    CheckSubscription,
    Gender(Gender),
    Panel,
    Stats,
    ExportVisitors,
    ExportAttendance,
    Broadcast,
    BroadcastSegment(Segment),
    Qr,
    Attend,
    Mark { visitor: i64, location: String },
    MarkCancel,
    Staff,
    StaffAdd,
    StaffRemove,
    StaffRole(Role),
    StaffPlace(String),
    StaffDelete(i64),
    Report,
}

impl Callback {
    pub fn parse(data: &str) -> Option<Self> {
        let callback = match data {
            "check_sub" => Callback::CheckSubscription,
            "panel" => Callback::Panel,
            "stats" => Callback::Stats,
            "export:visitors" => Callback::ExportVisitors,
            "export:attendance" => Callback::ExportAttendance,
            "broadcast" => Callback::Broadcast,
            "qr" => Callback::Qr,
            "attend" => Callback::Attend,
            "mark_cancel" => Callback::MarkCancel,
            "staff" => Callback::Staff,
            "staff:add" => Callback::StaffAdd,
            "staff:remove" => Callback::StaffRemove,
            "report" => Callback::Report,
            _ => {
                let (action, rest) = data.split_once(':')?;
                match action {
                    "gender" => Callback::Gender(match rest {
                        "m" => Gender::Male,
                        "f" => Gender::Female,
                        _ => return None,
                    }),
                    "bc" => Callback::BroadcastSegment(match rest {
                        "all" => Segment::All,
                        "male" => Segment::Male,
                        "female" => Segment::Female,
                        _ => return None,
                    }),
                    "mark" => {
                        let (visitor, location) = rest.split_once(':')?;
                        if location.is_empty() {
                            return None;
                        }
                        Callback::Mark {
                            visitor: visitor.parse().ok()?,
                            location: location.to_string(),
                        }
                    }
                    "role" => {
                        let role: Role = rest.parse().ok()?;
                        if !role.is_staff() {
                            return None;
                        }
                        Callback::StaffRole(role)
                    }
                    "place" if !rest.is_empty() => Callback::StaffPlace(rest.to_string()),
                    "del" => Callback::StaffDelete(rest.parse().ok()?),
                    _ => return None,
                }
            }
        };
        Some(callback)
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::CheckSubscription => write!(f, "check_sub"),
            Callback::Gender(Gender::Male) => write!(f, "gender:m"),
            Callback::Gender(Gender::Female) => write!(f, "gender:f"),
            Callback::Panel => write!(f, "panel"),
            Callback::Stats => write!(f, "stats"),
            Callback::ExportVisitors => write!(f, "export:visitors"),
            Callback::ExportAttendance => write!(f, "export:attendance"),
            Callback::Broadcast => write!(f, "broadcast"),
            Callback::BroadcastSegment(segment) => write!(f, "bc:{}", segment.as_str()),
            Callback::Qr => write!(f, "qr"),
            Callback::Attend => write!(f, "attend"),
            Callback::Mark { visitor, location } => write!(f, "mark:{}:{}", visitor, location),
            Callback::MarkCancel => write!(f, "mark_cancel"),
            Callback::Staff => write!(f, "staff"),
            Callback::StaffAdd => write!(f, "staff:add"),
            Callback::StaffRemove => write!(f, "staff:remove"),
            Callback::StaffRole(role) => write!(f, "role:{}", role.as_str()),
            Callback::StaffPlace(location) => write!(f, "place:{}", location),
            Callback::StaffDelete(id) => write!(f, "del:{}", id),
            Callback::Report => write!(f, "report"),
        }
    }
}
