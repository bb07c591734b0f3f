//! Staff panel handlers. Every action re-checks the actor's role through the
//! services; the menu only decides what is shown.

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{Capability, Role, Visitor},
    services::{
        attendance::{no_access, AttendancePlan},
        broadcast::{BroadcastContent, BroadcastOutcome},
        dialogue::Dialogue,
    },
    telegram::{
        escape_html,
        markup::to_html,
        types::{CallbackQuery, InlineKeyboardMarkup, Message},
    },
};

use super::{callback::Callback, callback_chat, keyboards, texts, Ack, Bot};

impl Bot {
    pub(super) async fn open_panel(&self, chat_id: i64, actor: i64) -> AppResult<()> {
        let role = self.staff_role(actor).await?;
        self.services.dialogues.clear(chat_id).await?;
        self.messenger
            .send_text(chat_id, &panel_header(role), Some(keyboards::panel(role).into()))
            .await
    }

    async fn staff_role(&self, actor: i64) -> AppResult<Role> {
        let role = self.services.permissions.resolve_role(actor).await?;
        if !role.is_staff() {
            return Err(AppError::Authorization("This panel is for staff only.".to_string()));
        }
        Ok(role)
    }

    /// Replace the pressed message, or send a new one when the press came
    /// from an inline result
    async fn show(&self, query: &CallbackQuery, text: &str, markup: Option<InlineKeyboardMarkup>) -> AppResult<()> {
        match &query.message {
            Some(message) => {
                self.messenger
                    .edit_text(message.chat.id, message.message_id, text, markup)
                    .await
            }
            None => {
                self.messenger
                    .send_text(query.from.id, text, markup.map(Into::into))
                    .await
            }
        }
    }

    pub(super) async fn panel_callback(&self, query: &CallbackQuery, callback: Callback) -> AppResult<Ack> {
        let actor = query.from.id;
        let chat_id = callback_chat(query);
        let services = &self.services;

        match callback {
            Callback::Panel => {
                let role = self.staff_role(actor).await?;
                services.dialogues.clear(chat_id).await?;
                self.show(query, &panel_header(role), Some(keyboards::panel(role))).await?;
            }
            Callback::Stats => {
                let stats = services.reports.stats(actor, Utc::now()).await?;
                self.show(query, &texts::stats(&stats), Some(keyboards::back_to_panel()))
                    .await?;
            }
            Callback::ExportVisitors => {
                let export = services.exports.visitors(actor).await?;
                let caption = format!("Visitors: {}", export.rows);
                self.messenger.send_document(chat_id, export.path(), &caption).await?;
                return Ok(Ack::Toast("Done".to_string()));
            }
            Callback::ExportAttendance => {
                let export = services.exports.attendance(actor).await?;
                let caption = format!("Attendance log: {} entries", export.rows);
                self.messenger.send_document(chat_id, export.path(), &caption).await?;
                return Ok(Ack::Toast("Done".to_string()));
            }
            Callback::Broadcast => {
                services.permissions.authorize(actor, Capability::Broadcast).await?;
                self.show(query, "📣 Choose the audience:", Some(keyboards::segments()))
                    .await?;
            }
            Callback::BroadcastSegment(segment) => {
                services.permissions.authorize(actor, Capability::Broadcast).await?;
                services
                    .dialogues
                    .set(chat_id, &Dialogue::AwaitingBroadcastContent { segment })
                    .await?;
                let text = format!(
                    "Audience: <b>{}</b>\n\nSend the message to broadcast (text, photo or video):",
                    segment
                );
                self.show(query, &text, Some(keyboards::back_to_panel())).await?;
            }
            Callback::Qr => {
                let keys = services.qr.existing_keys(actor).await?;
                services.dialogues.set(chat_id, &Dialogue::AwaitingQrKey).await?;
                self.show(query, &texts::source_keys(&keys), Some(keyboards::back_to_panel()))
                    .await?;
            }
            Callback::Attend => {
                if services.attendance.plan(actor).await? == AttendancePlan::NoAccess {
                    return Err(no_access());
                }
                services
                    .dialogues
                    .set(chat_id, &Dialogue::AwaitingVisitorIdentifier)
                    .await?;
                self.show(
                    query,
                    "Send the visitor's ID, @username or phone number:",
                    Some(keyboards::back_to_panel()),
                )
                .await?;
            }
            Callback::Mark { visitor, location } => {
                let visitor = services.lookup.by_telegram_id(visitor).await?;
                let marked_at = services.attendance.record(&visitor, &location, actor).await?;
                services
                    .attendance
                    .notify_visitor(visitor.telegram_id, &location, marked_at);

                let at = services.attendance.format_time(marked_at);
                let text = texts::attendance_confirmed(&visitor, &location, &at);
                match &query.message {
                    Some(message) => {
                        self.messenger
                            .edit_text(message.chat.id, message.message_id, &text, None)
                            .await?;
                    }
                    None => return Ok(Ack::Alert(format!("Marked present at {}", location))),
                }
            }
            Callback::MarkCancel => {
                if let Some(message) = &query.message {
                    self.messenger
                        .edit_text(message.chat.id, message.message_id, "Cancelled.", None)
                        .await?;
                }
                return Ok(Ack::Toast("Cancelled".to_string()));
            }
            Callback::Staff => {
                let staff = services.staff.list(actor).await?;
                self.show(query, &texts::staff_list(&staff), Some(keyboards::staff_menu()))
                    .await?;
            }
            Callback::StaffAdd => {
                services.permissions.authorize(actor, Capability::ManageStaff).await?;
                services.dialogues.set(chat_id, &Dialogue::AwaitingStaffId).await?;
                self.show(
                    query,
                    "Send the new staff member's Telegram ID, optionally followed by a name:\n<code>123456789 Kamola</code>",
                    Some(keyboards::back_to_panel()),
                )
                .await?;
            }
            Callback::StaffRemove => {
                let staff = services.staff.removable(actor).await?;
                if staff.is_empty() {
                    return Ok(Ack::Alert("There is nobody to remove.".to_string()));
                }
                self.show(query, "Choose who to remove:", Some(keyboards::removable(&staff)))
                    .await?;
            }
            Callback::StaffRole(role) => return self.choose_role(query, role).await,
            Callback::StaffPlace(location) => {
                let Some(Dialogue::AwaitingCashierLocation { telegram_id, full_name }) =
                    services.dialogues.get(chat_id).await?
                else {
                    return Ok(Ack::Alert("Start adding the staff member again.".to_string()));
                };
                let staff = services
                    .staff
                    .add(actor, telegram_id, full_name, Role::Cashier, Some(location))
                    .await?;
                services.dialogues.clear(chat_id).await?;
                let text = staff_added(&staff.display_name(), staff.role, staff.location.as_deref());
                self.show(query, &text, Some(keyboards::staff_menu())).await?;
            }
            Callback::StaffDelete(telegram_id) => {
                let removed = services.staff.remove(actor, telegram_id).await?;
                let staff = services.staff.list(actor).await?;
                self.show(query, &texts::staff_list(&staff), Some(keyboards::staff_menu()))
                    .await?;
                return Ok(Ack::Toast(format!("Removed {}", removed.display_name())));
            }
            Callback::Report => {
                let report = services.reports.monthly_cashier_report(actor, Utc::now()).await?;
                self.show(query, &texts::monthly_report(&report), Some(keyboards::back_to_panel()))
                    .await?;
            }
            Callback::CheckSubscription | Callback::Gender(_) => {}
        }
        Ok(Ack::Silent)
    }

    async fn choose_role(&self, query: &CallbackQuery, role: Role) -> AppResult<Ack> {
        let actor = query.from.id;
        let chat_id = callback_chat(query);
        let services = &self.services;

        let Some(Dialogue::AwaitingStaffRole { telegram_id, full_name }) = services.dialogues.get(chat_id).await?
        else {
            return Ok(Ack::Alert("Start adding the staff member again.".to_string()));
        };

        if role == Role::Cashier {
            let locations = services.staff.locations(actor).await?;
            if locations.is_empty() {
                return Err(AppError::Validation(
                    "Issue a QR code first: cashier locations come from QR keys.".to_string(),
                ));
            }
            services
                .dialogues
                .set(chat_id, &Dialogue::AwaitingCashierLocation { telegram_id, full_name })
                .await?;
            self.show(query, "Choose the cashier's location:", Some(keyboards::places(&locations)))
                .await?;
            return Ok(Ack::Silent);
        }

        let staff = services.staff.add(actor, telegram_id, full_name, role, None).await?;
        services.dialogues.clear(chat_id).await?;
        let text = staff_added(&staff.display_name(), staff.role, None);
        self.show(query, &text, Some(keyboards::staff_menu())).await?;
        Ok(Ack::Silent)
    }

    /// Panel states of the dialogue
    pub(super) async fn panel_step(&self, message: &Message, dialogue: Dialogue) -> AppResult<()> {
        let chat_id = message.chat.id;
        let Some(actor) = message.from.as_ref().map(|u| u.id) else {
            return Ok(());
        };
        let services = &self.services;
        let text = message.text.as_deref().map(str::trim).unwrap_or_default();

        match dialogue {
            Dialogue::AwaitingBroadcastContent { segment } => {
                let content = match &message.text {
                    Some(text) => BroadcastContent::Text(to_html(text, &message.entities)),
                    None => BroadcastContent::Copy {
                        from_chat_id: chat_id,
                        message_id: message.message_id,
                        caption: message
                            .caption
                            .as_deref()
                            .map(|caption| to_html(caption, &message.caption_entities)),
                    },
                };
                services.dialogues.clear(chat_id).await?;
                self.messenger.send_text(chat_id, "⏳ Sending…", None).await?;

                let reply = match services.broadcast.send(actor, segment, &content).await? {
                    BroadcastOutcome::NoRecipients => format!("Nobody matches the <b>{}</b> audience.", segment),
                    BroadcastOutcome::Finished(report) => texts::broadcast_report(&report),
                };
                self.messenger
                    .send_text(chat_id, &reply, Some(keyboards::back_to_panel().into()))
                    .await
            }
            Dialogue::AwaitingQrKey => {
                let qr = services.qr.issue(actor, text).await?;
                services.dialogues.clear(chat_id).await?;
                let caption = format!("<b>{}</b>\n\n{}", escape_html(&qr.key.to_uppercase()), qr.link);
                self.messenger.send_photo(chat_id, qr.path(), &caption).await
            }
            Dialogue::AwaitingVisitorIdentifier => {
                let visitor = services.lookup.find(text).await?.ok_or_else(|| {
                    AppError::NotFound("Visitor not found. Check the input and try again, or /cancel.".to_string())
                })?;
                services.dialogues.clear(chat_id).await?;
                self.mark_found_visitor(chat_id, actor, &visitor).await
            }
            Dialogue::AwaitingStaffId => {
                let (telegram_id, full_name) = match services.staff.check_available(actor, text).await {
                    Ok(target) => target,
                    Err(e @ AppError::Conflict(_)) => {
                        services.dialogues.clear(chat_id).await?;
                        return Err(e);
                    }
                    Err(e) => return Err(e),
                };
                services
                    .dialogues
                    .set(chat_id, &Dialogue::AwaitingStaffRole { telegram_id, full_name })
                    .await?;
                self.messenger
                    .send_text(
                        chat_id,
                        &format!("Choose a role for <code>{}</code>:", telegram_id),
                        Some(keyboards::roles().into()),
                    )
                    .await
            }
            Dialogue::AwaitingStaffRole { .. } | Dialogue::AwaitingCashierLocation { .. } => {
                self.messenger
                    .send_text(chat_id, "Use the buttons above, or /cancel.", None)
                    .await
            }
            Dialogue::AwaitingSubscription { .. } | Dialogue::AwaitingPhone { .. } => Ok(()),
        }
    }

    async fn mark_found_visitor(&self, chat_id: i64, actor: i64, visitor: &Visitor) -> AppResult<()> {
        let attendance = &self.services.attendance;
        match attendance.plan(actor).await? {
            AttendancePlan::NoAccess => Err(no_access()),
            AttendancePlan::Immediate(location) => {
                let marked_at = attendance.record(visitor, &location, actor).await?;
                attendance.notify_visitor(visitor.telegram_id, &location, marked_at);
                let text = texts::attendance_confirmed(visitor, &location, &attendance.format_time(marked_at));
                self.messenger.send_text(chat_id, &text, None).await
            }
            AttendancePlan::Choose(locations) => {
                let card = texts::visitor_card(visitor, self.offset);
                let markup = keyboards::mark_locations(visitor.telegram_id, &locations);
                self.messenger.send_text(chat_id, &card, Some(markup.into())).await
            }
        }
    }
}

fn panel_header(role: Role) -> String {
    format!("🛠 <b>Staff panel</b>\nYour role: <b>{}</b>", role)
}

fn staff_added(name: &str, role: Role, location: Option<&str>) -> String {
    let mut text = format!("✅ <b>{}</b> added as <b>{}</b>", escape_html(name), role);
    if let Some(location) = location {
        text.push_str(&format!(" at <b>{}</b>", escape_html(location)));
    }
    text
}
