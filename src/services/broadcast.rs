//! Broadcast fan-out to visitor segments

use std::{sync::Arc, time::Duration};

use crate::{
    error::AppResult,
    models::{Capability, Recipient, Segment},
    repository::Repository,
    telegram::{escape_html, Messenger},
};

use super::permissions::PermissionService;

/// What the SMM submitted. Text and caption are HTML ready for sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastContent {
    Text(String),
    /// Any non-text message, re-sent with a personalised caption
    Copy {
        from_chat_id: i64,
        message_id: i32,
        caption: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub recipients: usize,
    pub sent: usize,
    pub blocked: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastOutcome {
    NoRecipients,
    Finished(BroadcastReport),
}

fn greeting(recipient: &Recipient) -> String {
    let name = recipient
        .first_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or("friend");
    format!("Hello, {}!", escape_html(name))
}

#[derive(Clone)]
pub struct BroadcastService {
    repository: Repository,
    permissions: PermissionService,
    messenger: Arc<dyn Messenger>,
    delay: Duration,
}

impl BroadcastService {
    pub fn new(
        repository: Repository,
        permissions: PermissionService,
        messenger: Arc<dyn Messenger>,
        delay: Duration,
    ) -> Self {
        Self {
            repository,
            permissions,
            messenger,
            delay,
        }
    }

    /// Send `content` to every visitor in `segment`, one at a time. A failed
    /// send is counted as blocked and the loop carries on.
    pub async fn send(&self, actor: i64, segment: Segment, content: &BroadcastContent) -> AppResult<BroadcastOutcome> {
        self.permissions.authorize(actor, Capability::Broadcast).await?;

        let recipients = self.repository.visitors.recipients(segment.gender()).await?;
        if recipients.is_empty() {
            return Ok(BroadcastOutcome::NoRecipients);
        }

        let mut report = BroadcastReport {
            recipients: recipients.len(),
            ..BroadcastReport::default()
        };

        for recipient in &recipients {
            match self.deliver(recipient, content).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    tracing::debug!(recipient = recipient.telegram_id, error = %e, "Broadcast delivery failed");
                    report.blocked += 1;
                }
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        tracing::info!(
            actor,
            segment = segment.as_str(),
            sent = report.sent,
            blocked = report.blocked,
            "Broadcast finished"
        );
        Ok(BroadcastOutcome::Finished(report))
    }

    async fn deliver(&self, recipient: &Recipient, content: &BroadcastContent) -> AppResult<()> {
        let greeting = greeting(recipient);
        match content {
            BroadcastContent::Text(text) => {
                let text = format!("{}\n\n{}", greeting, text);
                self.messenger.send_text(recipient.telegram_id, &text, None).await
            }
            BroadcastContent::Copy {
                from_chat_id,
                message_id,
                caption,
            } => {
                let caption = match caption {
                    Some(c) if !c.is_empty() => format!("{}\n\n{}", greeting, c),
                    _ => greeting,
                };
                self.messenger
                    .copy_message(recipient.telegram_id, *from_chat_id, *message_id, Some(caption))
                    .await
            }
        }
    }
}
