//! Button grids

use crate::{
    models::{Capability, Gender, Role, Segment, StaffMember},
    telegram::types::{
        InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, ReplyKeyboardMarkup, ReplyKeyboardRemove,
        ReplyMarkup,
    },
};

use super::callback::Callback;

fn button(text: impl Into<String>, callback: Callback) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, callback.to_string())
}

fn grid(rows: Vec<Vec<InlineKeyboardButton>>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup { inline_keyboard: rows }
}

pub fn back_to_panel() -> InlineKeyboardMarkup {
    grid(vec![vec![button("⬅️ Back", Callback::Panel)]])
}

pub fn subscription(channel_link: &str) -> InlineKeyboardMarkup {
    grid(vec![
        vec![InlineKeyboardButton::url("📢 Subscribe", channel_link)],
        vec![button("✅ I subscribed", Callback::CheckSubscription)],
    ])
}

pub fn share_phone() -> ReplyMarkup {
    ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
        keyboard: vec![vec![KeyboardButton {
            text: "📱 Send phone number".to_string(),
            request_contact: true,
        }]],
        resize_keyboard: true,
        one_time_keyboard: true,
    })
}

pub fn remove_keyboard() -> ReplyMarkup {
    ReplyMarkup::Remove(ReplyKeyboardRemove { remove_keyboard: true })
}

pub fn gender() -> InlineKeyboardMarkup {
    grid(vec![vec![
        button("👨 Male", Callback::Gender(Gender::Male)),
        button("👩 Female", Callback::Gender(Gender::Female)),
    ]])
}

/// Panel menu: one entry per capability of `role`
pub fn panel(role: Role) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    for capability in role.capabilities() {
        match capability {
            Capability::ViewStats => rows.push(vec![button(capability.label(), Callback::Stats)]),
            Capability::ExportData => rows.push(vec![
                button("📥 Visitors (Excel)", Callback::ExportVisitors),
                button("📥 Attendance (Excel)", Callback::ExportAttendance),
            ]),
            Capability::Broadcast => rows.push(vec![button(capability.label(), Callback::Broadcast)]),
            Capability::IssueQr => rows.push(vec![button(capability.label(), Callback::Qr)]),
            Capability::MarkAttendance => rows.push(vec![
                button(capability.label(), Callback::Attend),
                InlineKeyboardButton::inline_search("🔍 Search"),
            ]),
            Capability::ManageStaff => rows.push(vec![button(capability.label(), Callback::Staff)]),
            Capability::MonthlyReport => rows.push(vec![button(capability.label(), Callback::Report)]),
        }
    }
    grid(rows)
}

pub fn segments() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Segment::ALL
        .into_iter()
        .map(|segment| vec![button(segment.to_string(), Callback::BroadcastSegment(segment))])
        .collect();
    rows.push(vec![button("⬅️ Back", Callback::Panel)]);
    grid(rows)
}

/// One "present at" button per location, plus cancel
pub fn mark_locations(visitor: i64, locations: &[String]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = locations
        .iter()
        .map(|location| {
            vec![button(
                format!("✅ Present at {}", location),
                Callback::Mark {
                    visitor,
                    location: location.clone(),
                },
            )]
        })
        .collect();
    rows.push(vec![button("❌ Cancel", Callback::MarkCancel)]);
    grid(rows)
}

pub fn staff_menu() -> InlineKeyboardMarkup {
    grid(vec![
        vec![button("➕ Add", Callback::StaffAdd), button("➖ Remove", Callback::StaffRemove)],
        vec![button("⬅️ Back", Callback::Panel)],
    ])
}

pub fn roles() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Role::ASSIGNABLE
        .into_iter()
        .map(|role| vec![button(role.as_str(), Callback::StaffRole(role))])
        .collect();
    rows.push(vec![button("⬅️ Back", Callback::Staff)]);
    grid(rows)
}

pub fn places(locations: &[String]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = locations
        .iter()
        .map(|location| vec![button(location.as_str(), Callback::StaffPlace(location.clone()))])
        .collect();
    rows.push(vec![button("⬅️ Back", Callback::Staff)]);
    grid(rows)
}

pub fn removable(staff: &[StaffMember]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = staff
        .iter()
        .map(|member| {
            vec![button(
                format!("🗑 {} ({})", member.display_name(), member.role),
                Callback::StaffDelete(member.telegram_id),
            )]
        })
        .collect();
    rows.push(vec![button("⬅️ Back", Callback::Staff)]);
    grid(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payloads(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| b.callback_data.clone())
            .collect()
    }

    #[test]
    fn test_panel_follows_capabilities() {
        assert!(panel(Role::User).inline_keyboard.is_empty());
        assert_eq!(payloads(&panel(Role::Cashier)), vec!["attend"]);
        assert_eq!(payloads(&panel(Role::Smm)), vec!["broadcast"]);
        assert_eq!(
            payloads(&panel(Role::Analyst)),
            vec!["stats", "export:visitors", "export:attendance", "attend", "report"]
        );
        assert_eq!(payloads(&panel(Role::Superadmin)).len(), 8);
    }

    #[test]
    fn test_panel_payloads_parse() {
        for data in payloads(&panel(Role::Superadmin)) {
            assert!(Callback::parse(&data).is_some(), "{}", data);
        }
    }

    #[test]
    fn test_mark_locations_ends_with_cancel() {
        let markup = mark_locations(42, &["cafe".to_string(), "bowling".to_string()]);
        assert_eq!(payloads(&markup), vec!["mark:42:cafe", "mark:42:bowling", "mark_cancel"]);
    }

    #[test]
    fn test_share_phone_requests_contact() {
        let ReplyMarkup::Keyboard(keyboard) = share_phone() else {
            panic!("expected a reply keyboard");
        };
        assert!(keyboard.keyboard[0][0].request_contact);
        assert!(keyboard.one_time_keyboard);
    }
}
