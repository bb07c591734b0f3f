//! Chat transport: the outbound interface the bot depends on, and its
//! Telegram Bot API implementation

pub mod client;
pub mod markup;
pub mod types;

use std::path::Path;

use async_trait::async_trait;

use crate::error::AppResult;
use types::{InlineArticle, InlineKeyboardMarkup, ReplyMarkup};

pub use client::BotApi;

/// Channel membership statuses that count as subscribed
pub const SUBSCRIBED_STATUSES: [&str; 3] = ["member", "administrator", "creator"];

/// Outbound side of the chat transport. All text is sent with HTML markup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str, markup: Option<ReplyMarkup>) -> AppResult<()>;

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()>;

    /// Acknowledge a button press; an empty `text` acknowledges silently
    async fn answer_callback(&self, callback_id: &str, text: &str, show_alert: bool) -> AppResult<()>;

    async fn send_photo(&self, chat_id: i64, path: &Path, caption: &str) -> AppResult<()>;

    async fn send_document(&self, chat_id: i64, path: &Path, caption: &str) -> AppResult<()>;

    /// Re-send an existing message to another chat, optionally replacing its caption
    async fn copy_message(
        &self,
        chat_id: i64,
        from_chat_id: i64,
        message_id: i32,
        caption: Option<String>,
    ) -> AppResult<()>;

    /// Raw membership status of `user_id` in `chat_id`
    async fn chat_member_status(&self, chat_id: i64, user_id: i64) -> AppResult<String>;

    /// File reference of the user's most recent profile photo, if any
    async fn profile_photo(&self, user_id: i64) -> AppResult<Option<String>>;

    async fn bot_username(&self) -> AppResult<String>;

    async fn answer_inline_query(&self, query_id: &str, results: Vec<InlineArticle>) -> AppResult<()>;
}

/// Escape user-supplied text for HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        push_escaped(&mut escaped, c);
    }
    escaped
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        _ => out.push(c),
    }
}
