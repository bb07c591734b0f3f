//! Update dispatch: commands, dialogue steps, button presses and inline search

pub mod callback;
pub mod dispatch;
mod inline;
pub mod keyboards;
mod panel;
pub mod texts;
mod visitor;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::FixedOffset;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    services::{calendar::offset_from_minutes, dialogue::Dialogue, Services},
    telegram::{
        types::{CallbackQuery, Message, Update},
        Messenger,
    },
};

use callback::Callback;

/// How a button press is acknowledged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Silent,
    Toast(String),
    Alert(String),
}

/// A parsed bot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(Option<String>),
    Admin,
    Cancel,
    Unknown,
}

impl Command {
    /// Parse `/start@MyBot arg` style text; `None` for plain text
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, arg) = match rest.split_once(char::is_whitespace) {
            Some((head, arg)) => (head, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (rest, None),
        };
        let name = head.split('@').next().unwrap_or(head);
        Some(match name.to_lowercase().as_str() {
            "start" => Command::Start(arg.map(str::to_string)),
            "admin" => Command::Admin,
            "cancel" => Command::Cancel,
            _ => Command::Unknown,
        })
    }
}

#[derive(Clone)]
pub struct Bot {
    services: Services,
    messenger: Arc<dyn Messenger>,
    offset: FixedOffset,
}

impl Bot {
    pub fn new(services: Services, messenger: Arc<dyn Messenger>, config: &AppConfig) -> Self {
        Self {
            services,
            messenger,
            offset: offset_from_minutes(config.venue.utc_offset_minutes),
        }
    }

    pub async fn handle_update(&self, update: Update) {
        let update_id = update.update_id;
        if let Some(message) = update.message {
            self.on_message(message).await;
        } else if let Some(callback) = update.callback_query {
            self.on_callback(callback).await;
        } else if let Some(query) = update.inline_query {
            if let Err(e) = self.on_inline_query(&query).await {
                report(&e, query.from.id, "inline query");
            }
        } else {
            tracing::trace!(update_id, "Ignoring update");
        }
    }

    async fn on_message(&self, message: Message) {
        // results picked from our own inline search
        if message.via_bot.is_some() {
            return;
        }
        let Some(from) = message.from.as_ref() else {
            return;
        };
        let chat_id = message.chat.id;
        let actor = from.id;

        if let Err(e) = self.route_message(&message).await {
            report(&e, actor, "message");
            let _ = self.messenger.send_text(chat_id, &e.user_message(), None).await;
        }
    }

    async fn route_message(&self, message: &Message) -> AppResult<()> {
        let chat_id = message.chat.id;

        if let Some(command) = message.text.as_deref().and_then(Command::parse) {
            return match command {
                Command::Start(arg) => self.start(message, arg.as_deref()).await,
                Command::Admin => {
                    let actor = message.from.as_ref().map_or(chat_id, |u| u.id);
                    self.open_panel(chat_id, actor).await
                }
                Command::Cancel => {
                    self.services.dialogues.clear(chat_id).await?;
                    self.messenger
                        .send_text(chat_id, "Cancelled.", Some(keyboards::remove_keyboard()))
                        .await
                }
                Command::Unknown => self.messenger.send_text(chat_id, texts::FALLBACK_HINT, None).await,
            };
        }

        match self.services.dialogues.get(chat_id).await? {
            Some(dialogue) => self.continue_dialogue(message, dialogue).await,
            None => self.messenger.send_text(chat_id, texts::FALLBACK_HINT, None).await,
        }
    }

    async fn continue_dialogue(&self, message: &Message, dialogue: Dialogue) -> AppResult<()> {
        match dialogue {
            Dialogue::AwaitingSubscription { .. } | Dialogue::AwaitingPhone { .. } => {
                self.registration_step(message, dialogue).await
            }
            _ => self.panel_step(message, dialogue).await,
        }
    }

    async fn on_callback(&self, query: CallbackQuery) {
        let ack = match query.data.as_deref().and_then(Callback::parse) {
            Some(callback) => match self.route_callback(&query, callback).await {
                Ok(ack) => ack,
                Err(e) => {
                    report(&e, query.from.id, "callback");
                    Ack::Alert(e.user_message())
                }
            },
            None => Ack::Toast("This button is no longer available.".to_string()),
        };

        let result = match ack {
            Ack::Silent => self.messenger.answer_callback(&query.id, "", false).await,
            Ack::Toast(text) => self.messenger.answer_callback(&query.id, &text, false).await,
            Ack::Alert(text) => self.messenger.answer_callback(&query.id, &text, true).await,
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "Callback answer not delivered");
        }
    }

    async fn route_callback(&self, query: &CallbackQuery, callback: Callback) -> AppResult<Ack> {
        match callback {
            Callback::CheckSubscription => self.check_subscription(query).await,
            Callback::Gender(gender) => self.set_gender(query, gender).await,
            other => self.panel_callback(query, other).await,
        }
    }
}

#[async_trait]
impl dispatch::UpdateHandler for Bot {
    async fn handle_update(&self, update: Update) {
        Bot::handle_update(self, update).await;
    }
}

/// Chat that a button press belongs to
fn callback_chat(query: &CallbackQuery) -> i64 {
    query.message.as_ref().map(|m| m.chat.id).unwrap_or(query.from.id)
}

/// Log failures that are not ordinary user outcomes
fn report(error: &AppError, actor: i64, context: &str) {
    if error.is_expected() {
        tracing::debug!(actor, error = %error, "{} refused", context);
    } else {
        tracing::error!(actor, error = %error, "{} failed", context);
    }
}
