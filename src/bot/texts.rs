//! Message texts rendered from service results

use chrono::FixedOffset;

use crate::{
    models::{SourceKey, StaffMember, Visitor, VisitorStats},
    services::{broadcast::BroadcastReport, calendar::format_local, reports::MonthlyReport},
    telegram::escape_html,
};

pub fn welcome(venue: &str) -> String {
    format!(
        "Welcome to <b>{}</b>!\n\nSubscribe to our channel to stay up to date, then press the button below.",
        escape_html(venue)
    )
}

pub fn already_registered(venue: &str) -> String {
    format!("You are already registered!\nSee you at <b>{}</b>!", escape_html(venue))
}

pub fn registered(venue: &str) -> String {
    format!("🎉 Congratulations, you are registered!\nSee you at <b>{}</b>!", escape_html(venue))
}

pub const ASK_PHONE: &str = "Send your phone number with the button below:";
pub const ASK_GENDER: &str = "One more optional question: who are you? This helps us send you relevant offers.";
pub const FALLBACK_HINT: &str = "Press /start or scan a QR code at the venue to register.";

pub fn visitor_card(visitor: &Visitor, offset: FixedOffset) -> String {
    let username = visitor
        .username
        .as_ref()
        .map(|u| format!("@{}", escape_html(u)))
        .unwrap_or_else(|| "-".to_string());
    let last_visit = visitor
        .attended_date
        .map(|d| format_local(d, offset))
        .unwrap_or_else(|| "never".to_string());

    format!(
        "👤 <b>{}</b> {}\n🆔 <code>{}</code>\n📱 <code>{}</code>\n📍 Source: {}\n🕒 Registered: {}\n✅ Last visit: {}",
        escape_html(visitor.display_name()),
        username,
        visitor.telegram_id,
        escape_html(&visitor.phone),
        escape_html(&visitor.source),
        format_local(visitor.registered_at, offset),
        last_visit
    )
}

pub fn stats(stats: &VisitorStats) -> String {
    let mut text = format!(
        "📊 <b>Statistics</b>\n\nTotal visitors: <b>{}</b>\nCame today: <b>{}</b>\n",
        stats.total, stats.attended_today
    );
    if !stats.by_source.is_empty() {
        text.push_str("\n<b>By source:</b>\n");
        for entry in &stats.by_source {
            text.push_str(&format!("• {}: {}\n", escape_html(&entry.source), entry.count));
        }
    }
    text
}

pub fn monthly_report(report: &MonthlyReport) -> String {
    match report {
        MonthlyReport::NoData { label } => {
            format!("🗓 <b>{}</b>\n\nNo attendance has been marked this month yet.", label)
        }
        MonthlyReport::Tallies { label, rows } => {
            let mut text = format!("🗓 <b>Cashier report, {}</b>\n\n", label);
            for (index, row) in rows.iter().enumerate() {
                let name = row
                    .full_name
                    .as_deref()
                    .map(escape_html)
                    .unwrap_or_else(|| row.staff_id.to_string());
                let location = row.location.as_deref().map(escape_html).unwrap_or_else(|| "-".to_string());
                text.push_str(&format!(
                    "{}. <b>{}</b> ({}): {} visits\n",
                    index + 1,
                    name,
                    location,
                    row.total
                ));
            }
            text
        }
    }
}

pub fn broadcast_report(report: &BroadcastReport) -> String {
    format!(
        "📣 Broadcast finished.\nSent: <b>{}</b>\nBlocked: <b>{}</b>",
        report.sent, report.blocked
    )
}

pub fn source_keys(keys: &[SourceKey]) -> String {
    let mut text = if keys.is_empty() {
        "No QR codes yet.".to_string()
    } else {
        let mut text = "<b>Existing QR codes:</b>\n\n".to_string();
        for (index, key) in keys.iter().enumerate() {
            text.push_str(&format!("{}. <b>{}</b>\n", index + 1, escape_html(&key.key)));
        }
        text
    };
    text.push_str("\n\nSend a key for the new QR code (for example: ice_city):");
    text
}

pub fn staff_list(staff: &[StaffMember]) -> String {
    if staff.is_empty() {
        return "👥 <b>Staff</b>\n\nNo staff members yet.".to_string();
    }
    let mut text = "👥 <b>Staff</b>\n\n".to_string();
    for member in staff {
        text.push_str(&format!(
            "• <b>{}</b> <code>{}</code>: {}",
            escape_html(&member.display_name()),
            member.telegram_id,
            member.role
        ));
        if let Some(location) = &member.location {
            text.push_str(&format!(" @ {}", escape_html(location)));
        }
        text.push('\n');
    }
    text
}

pub fn attendance_confirmed(visitor: &Visitor, location: &str, at: &str) -> String {
    format!(
        "✅ <b>{}</b> marked present at <b>{}</b>\n🕒 {}",
        escape_html(visitor.display_name()),
        escape_html(location),
        at
    )
}
