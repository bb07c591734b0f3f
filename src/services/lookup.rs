//! Visitor identity lookup from free-text identifiers

use crate::{
    error::{AppError, AppResult},
    models::Visitor,
    repository::Repository,
};

/// One lookup step; steps are tried in order and the first hit wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Handle(String),
    TelegramId(i64),
    RecordId(i64),
    Phone(String),
}

/// Lookup plan for `input`: `@handle` first, then a purely numeric input as
/// chat identity and as record id, then the digits of the input as a phone.
pub fn plan(input: &str) -> AppResult<Vec<Attempt>> {
    let input = input.trim();
    let mut attempts = Vec::new();

    if let Some(handle) = input.strip_prefix('@') {
        let handle = handle.trim();
        if !handle.is_empty() {
            attempts.push(Attempt::Handle(handle.to_string()));
        }
    }

    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(id) = input.parse::<i64>() {
            attempts.push(Attempt::TelegramId(id));
            attempts.push(Attempt::RecordId(id));
        }
    }

    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        attempts.push(Attempt::Phone(digits));
    }

    if attempts.is_empty() {
        return Err(AppError::Validation(
            "Send a visitor ID, @username or phone number.".to_string(),
        ));
    }
    Ok(attempts)
}

#[derive(Clone)]
pub struct LookupService {
    repository: Repository,
}

impl LookupService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Resolve `input` to a single visitor
    pub async fn find(&self, input: &str) -> AppResult<Option<Visitor>> {
        for attempt in plan(input)? {
            let found = match &attempt {
                Attempt::Handle(handle) => self.repository.visitors.get_by_username(handle).await?,
                Attempt::TelegramId(id) => self.repository.visitors.get_by_telegram_id(*id).await?,
                Attempt::RecordId(id) => self.repository.visitors.get_by_id(*id).await?,
                Attempt::Phone(phone) => self.repository.visitors.get_by_phone(phone).await?,
            };
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    pub async fn by_telegram_id(&self, telegram_id: i64) -> AppResult<Visitor> {
        self.repository
            .visitors
            .get_by_telegram_id(telegram_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Visitor not found.".to_string()))
    }

    /// Case-insensitive substring search over phone, handle and name
    pub async fn search(&self, term: &str, limit: i64) -> AppResult<Vec<Visitor>> {
        self.repository.visitors.search(term, limit).await
    }
}
