//! Telegram Bot API client over reqwest

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tokio::sync::OnceCell;

use crate::{
    config::TelegramConfig,
    error::{AppError, AppResult},
};

use super::{
    types::{
        ApiResponse, ChatMember, InlineArticle, InlineKeyboardMarkup, ReplyMarkup, Update, User,
        UserProfilePhotos,
    },
    Messenger,
};

pub struct BotApi {
    http: reqwest::Client,
    base_url: String,
    username: OnceCell<String>,
}

impl BotApi {
    pub fn new(config: &TelegramConfig) -> AppResult<Self> {
        // long polls hold the request open for poll_timeout_seconds
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_seconds + 15))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{}", config.api_url.trim_end_matches('/'), config.token),
            username: OnceCell::new(),
        })
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> AppResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response: ApiResponse<R> = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .json(params)
            .send()
            .await?
            .json()
            .await?;

        Self::unwrap_response(method, response)
    }

    async fn upload(&self, method: &str, field: &str, chat_id: i64, path: &Path, caption: &str) -> AppResult<()> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", "HTML")
            .part(field.to_string(), Part::bytes(bytes).file_name(file_name));

        let response: ApiResponse<serde_json::Value> = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;

        Self::unwrap_response(method, response).map(|_| ())
    }

    fn unwrap_response<R>(method: &str, response: ApiResponse<R>) -> AppResult<R> {
        if !response.ok {
            return Err(AppError::Telegram(format!(
                "{}: {}",
                method,
                response.description.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        response
            .result
            .ok_or_else(|| AppError::Telegram(format!("{}: empty result", method)))
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: i64, timeout_seconds: u64) -> AppResult<Vec<Update>> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": timeout_seconds,
                "allowed_updates": ["message", "callback_query", "inline_query"],
            }),
        )
        .await
    }

    pub async fn set_webhook(&self, url: &str, secret: &str) -> AppResult<()> {
        let _: bool = self
            .call(
                "setWebhook",
                &json!({
                    "url": url,
                    "secret_token": secret,
                    "allowed_updates": ["message", "callback_query", "inline_query"],
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn delete_webhook(&self) -> AppResult<()> {
        let _: bool = self.call("deleteWebhook", &json!({})).await?;
        Ok(())
    }
}

#[async_trait]
impl Messenger for BotApi {
    async fn send_text(&self, chat_id: i64, text: &str, markup: Option<ReplyMarkup>) -> AppResult<()> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &json!({
                    "chat_id": chat_id,
                    "text": text,
                    "parse_mode": "HTML",
                    "reply_markup": markup,
                }),
            )
            .await?;
        Ok(())
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()> {
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                &json!({
                    "chat_id": chat_id,
                    "message_id": message_id,
                    "text": text,
                    "parse_mode": "HTML",
                    "reply_markup": markup,
                }),
            )
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: &str, show_alert: bool) -> AppResult<()> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &json!({
                    "callback_query_id": callback_id,
                    "text": text,
                    "show_alert": show_alert,
                }),
            )
            .await?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, path: &Path, caption: &str) -> AppResult<()> {
        self.upload("sendPhoto", "photo", chat_id, path, caption).await
    }

    async fn send_document(&self, chat_id: i64, path: &Path, caption: &str) -> AppResult<()> {
        self.upload("sendDocument", "document", chat_id, path, caption).await
    }

    async fn copy_message(
        &self,
        chat_id: i64,
        from_chat_id: i64,
        message_id: i32,
        caption: Option<String>,
    ) -> AppResult<()> {
        let _: serde_json::Value = self
            .call(
                "copyMessage",
                &json!({
                    "chat_id": chat_id,
                    "from_chat_id": from_chat_id,
                    "message_id": message_id,
                    "caption": caption,
                    "parse_mode": "HTML",
                }),
            )
            .await?;
        Ok(())
    }

    async fn chat_member_status(&self, chat_id: i64, user_id: i64) -> AppResult<String> {
        let member: ChatMember = self
            .call(
                "getChatMember",
                &json!({ "chat_id": chat_id, "user_id": user_id }),
            )
            .await?;
        Ok(member.status)
    }

    async fn profile_photo(&self, user_id: i64) -> AppResult<Option<String>> {
        let photos: UserProfilePhotos = self
            .call(
                "getUserProfilePhotos",
                &json!({ "user_id": user_id, "limit": 1 }),
            )
            .await?;

        if photos.total_count == 0 {
            return Ok(None);
        }
        // sizes are ordered small to large
        Ok(photos
            .photos
            .first()
            .and_then(|sizes| sizes.last())
            .map(|p| p.file_id.clone()))
    }

    async fn bot_username(&self) -> AppResult<String> {
        let username = self
            .username
            .get_or_try_init(|| async {
                let me: User = self.call("getMe", &json!({})).await?;
                me.username
                    .ok_or_else(|| AppError::Telegram("getMe: bot has no username".to_string()))
            })
            .await?;
        Ok(username.clone())
    }

    async fn answer_inline_query(&self, query_id: &str, results: Vec<InlineArticle>) -> AppResult<()> {
        let results: Vec<serde_json::Value> = results
            .into_iter()
            .map(|article| {
                json!({
                    "type": "article",
                    "id": article.id,
                    "title": article.title,
                    "description": article.description,
                    "input_message_content": {
                        "message_text": article.message_text,
                        "parse_mode": "HTML",
                    },
                    "reply_markup": article.reply_markup,
                })
            })
            .collect();

        let _: bool = self
            .call(
                "answerInlineQuery",
                &json!({
                    "inline_query_id": query_id,
                    "results": results,
                    "cache_time": 1,
                    "is_personal": true,
                }),
            )
            .await?;
        Ok(())
    }
}
