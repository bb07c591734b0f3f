//! Inline visitor search for cashiers

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    error::{AppError, AppResult},
    models::Capability,
    services::attendance::AttendancePlan,
    telegram::types::{InlineArticle, InlineQuery},
};

use super::{keyboards, texts, Bot};

const MAX_RESULTS: i64 = 20;

/// Digits, a handle or a name; anything else is not a search
static SEARCH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{3,}|^@|^[a-zA-Z]").expect("valid search pattern"));

/// Search term for an inline query, `None` when the query should not trigger a search
pub fn search_term(query: &str) -> Option<String> {
    let query = query.trim();
    if !SEARCH_PATTERN.is_match(query) {
        return None;
    }
    let term = query.trim_start_matches('@').trim();
    if term.chars().count() < 2 {
        return None;
    }
    Some(term.to_string())
}

impl Bot {
    pub(super) async fn on_inline_query(&self, query: &InlineQuery) -> AppResult<()> {
        let results = match self.inline_results(query).await {
            Ok(results) => results,
            Err(e @ AppError::Authorization(_)) => {
                tracing::debug!(actor = query.from.id, error = %e, "Inline search refused");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        self.messenger.answer_inline_query(&query.id, results).await
    }

    async fn inline_results(&self, query: &InlineQuery) -> AppResult<Vec<InlineArticle>> {
        let Some(term) = search_term(&query.query) else {
            return Ok(Vec::new());
        };
        let services = &self.services;
        services
            .permissions
            .authorize(query.from.id, Capability::MarkAttendance)
            .await?;

        let locations = match services.attendance.plan(query.from.id).await? {
            AttendancePlan::NoAccess => return Ok(Vec::new()),
            AttendancePlan::Immediate(location) => vec![location],
            AttendancePlan::Choose(locations) => locations,
        };

        let visitors = services.lookup.search(&term, MAX_RESULTS).await?;
        Ok(visitors
            .iter()
            .map(|visitor| InlineArticle {
                id: visitor.id.to_string(),
                title: format!("{} · {}", visitor.display_name(), visitor.phone),
                description: visitor
                    .username
                    .as_ref()
                    .map(|u| format!("@{} · {}", u, visitor.source))
                    .unwrap_or_else(|| visitor.source.clone()),
                message_text: texts::visitor_card(visitor, self.offset),
                reply_markup: keyboards::mark_locations(visitor.telegram_id, &locations),
            })
            .collect())
    }
}
