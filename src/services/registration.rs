//! Visitor registration flow

use std::sync::Arc;

use crate::{
    config::{AccessConfig, VenueConfig},
    error::{AppError, AppResult},
    models::{Gender, NewVisitor, Visitor},
    repository::Repository,
    telegram::{Messenger, SUBSCRIBED_STATUSES},
};

use super::dialogue::{Dialogue, DialogueStore};

/// Deep-link keys printed on the venue's own QR codes
const SOURCES: &[(&str, &str)] = &[
    ("ice_arena", "Ice Arena"),
    ("bowling", "Bowling"),
    ("vr_arena", "VR Arena"),
    ("laser", "Laser Tag"),
    ("kids", "Kids Zone"),
    ("cafe", "Cafe"),
];

/// Turn `laser_tag-2` into `Laser Tag 2`
pub fn humanize(key: &str) -> String {
    key.split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Attribution label for a `/start` argument
pub fn resolve_source(arg: Option<&str>, default_source: &str) -> String {
    let key = match arg.map(|a| a.trim().to_lowercase()) {
        Some(key) if !key.is_empty() => key,
        _ => return default_source.to_string(),
    };
    if key == "main" {
        return default_source.to_string();
    }
    SOURCES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| humanize(&key))
}

pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| *c != '+' && !c.is_whitespace()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    AlreadyRegistered,
    AwaitingSubscription { source: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    Confirmed,
    NotSubscribed,
    /// Membership could not be verified; the visitor may retry
    CheckFailed,
    /// No registration is in progress for this chat
    NotStarted,
}

/// A shared contact as received from the chat
#[derive(Debug, Clone)]
pub struct ContactInput {
    pub sender_id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
    pub phone_number: String,
    /// Owner of the shared contact when it is a Telegram user
    pub contact_user_id: Option<i64>,
}

#[derive(Clone)]
pub struct RegistrationService {
    repository: Repository,
    dialogues: Arc<dyn DialogueStore>,
    messenger: Arc<dyn Messenger>,
    access: AccessConfig,
    venue: VenueConfig,
}

impl RegistrationService {
    pub fn new(
        repository: Repository,
        dialogues: Arc<dyn DialogueStore>,
        messenger: Arc<dyn Messenger>,
        access: AccessConfig,
        venue: VenueConfig,
    ) -> Self {
        Self {
            repository,
            dialogues,
            messenger,
            access,
            venue,
        }
    }

    pub fn venue_name(&self) -> &str {
        &self.venue.name
    }

    pub fn channel_link(&self) -> String {
        format!("https://t.me/{}", self.access.channel_username.trim_start_matches('@'))
    }

    /// Handle `/start [key]`
    pub async fn start(&self, chat_id: i64, telegram_id: i64, arg: Option<&str>) -> AppResult<StartOutcome> {
        if self.repository.visitors.exists(telegram_id).await? {
            self.dialogues.clear(chat_id).await?;
            return Ok(StartOutcome::AlreadyRegistered);
        }

        let source = resolve_source(arg, &self.venue.default_source);
        self.dialogues
            .set(chat_id, &Dialogue::AwaitingSubscription { source: source.clone() })
            .await?;
        tracing::debug!(telegram_id, source = %source, "Registration started");
        Ok(StartOutcome::AwaitingSubscription { source })
    }

    /// Handle the "I subscribed" confirmation
    pub async fn confirm_subscription(&self, chat_id: i64, telegram_id: i64) -> AppResult<SubscriptionOutcome> {
        let source = match self.dialogues.get(chat_id).await? {
            Some(Dialogue::AwaitingSubscription { source }) => source,
            _ => return Ok(SubscriptionOutcome::NotStarted),
        };

        let status = match self
            .messenger
            .chat_member_status(self.access.channel_id, telegram_id)
            .await
        {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(telegram_id, error = %e, "Membership check failed");
                return Ok(SubscriptionOutcome::CheckFailed);
            }
        };

        if !SUBSCRIBED_STATUSES.contains(&status.as_str()) {
            return Ok(SubscriptionOutcome::NotSubscribed);
        }

        self.dialogues.set(chat_id, &Dialogue::AwaitingPhone { source }).await?;
        Ok(SubscriptionOutcome::Confirmed)
    }

    /// Handle a shared contact and create the visitor record
    pub async fn complete(&self, chat_id: i64, contact: ContactInput) -> AppResult<Visitor> {
        let source = match self.dialogues.get(chat_id).await? {
            Some(Dialogue::AwaitingPhone { source }) => source,
            _ => {
                return Err(AppError::Validation(
                    "Press /start to register first.".to_string(),
                ))
            }
        };

        if contact.contact_user_id.is_some_and(|id| id != contact.sender_id) {
            return Err(AppError::Validation(
                "Please share your own phone number using the button below.".to_string(),
            ));
        }

        let phone = normalize_phone(&contact.phone_number);
        if phone.is_empty() {
            return Err(AppError::Validation("The phone number is empty.".to_string()));
        }

        let profile_photo = match self.messenger.profile_photo(contact.sender_id).await {
            Ok(photo) => photo,
            Err(e) => {
                tracing::debug!(telegram_id = contact.sender_id, error = %e, "Profile photo unavailable");
                None
            }
        };

        let created = self
            .repository
            .visitors
            .create(&NewVisitor {
                telegram_id: contact.sender_id,
                first_name: contact.first_name,
                username: contact.username,
                phone,
                source,
                profile_photo,
            })
            .await;
        self.dialogues.clear(chat_id).await?;
        let visitor = created?;

        tracing::info!(
            visitor = visitor.id,
            telegram_id = visitor.telegram_id,
            source = %visitor.source,
            "Registration completed"
        );
        Ok(visitor)
    }

    pub async fn set_gender(&self, telegram_id: i64, gender: Gender) -> AppResult<()> {
        self.repository.visitors.set_gender(telegram_id, gender).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repository::memory::MemoryStore, services::dialogue::MemoryDialogueStore, telegram::MockMessenger,
    };
    use mockall::predicate::eq;

    const CHANNEL: i64 = -100_123;

    fn service(messenger: MockMessenger) -> (RegistrationService, Arc<MemoryStore>, Arc<MemoryDialogueStore>) {
        let (repository, store) = MemoryStore::repository();
        let dialogues = Arc::new(MemoryDialogueStore::new());
        let service = RegistrationService::new(
            repository,
            dialogues.clone(),
            Arc::new(messenger),
            AccessConfig {
                channel_id: CHANNEL,
                channel_username: "@familypark".to_string(),
                ..AccessConfig::default()
            },
            VenueConfig::default(),
        );
        (service, store, dialogues)
    }

    fn contact(phone: &str) -> ContactInput {
        ContactInput {
            sender_id: 42,
            first_name: Some("Aziz".to_string()),
            username: Some("aziz".to_string()),
            phone_number: phone.to_string(),
            contact_user_id: Some(42),
        }
    }

    #[test]
    fn test_resolve_source() {
        assert_eq!(resolve_source(Some("ice_arena"), "Main entrance"), "Ice Arena");
        assert_eq!(resolve_source(Some("  BOWLING "), "Main entrance"), "Bowling");
        assert_eq!(resolve_source(Some("summer_promo-2"), "Main entrance"), "Summer Promo 2");
        assert_eq!(resolve_source(Some("main"), "Main entrance"), "Main entrance");
        assert_eq!(resolve_source(None, "Main entrance"), "Main entrance");
        assert_eq!(resolve_source(Some(""), "Main entrance"), "Main entrance");
    }

    #[test]
    fn test_humanize_unknown_keys() {
        assert_eq!(humanize("vr-arena"), "Vr Arena");
        assert_eq!(humanize("3d_park"), "3d Park");
        assert_eq!(humanize("kids__zone_"), "Kids Zone");
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+998 90 123 45 67"), "998901234567");
        assert_eq!(normalize_phone("998901234567"), "998901234567");
    }

    #[tokio::test]
    async fn test_full_registration_scenario() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_chat_member_status()
            .with(eq(CHANNEL), eq(42))
            .times(1)
            .returning(|_, _| Ok("member".to_string()));
        messenger.expect_profile_photo().returning(|_| Ok(Some("photo-1".to_string())));
        let (service, store, dialogues) = service(messenger);

        assert_eq!(
            service.start(42, 42, Some("ice_arena")).await.unwrap(),
            StartOutcome::AwaitingSubscription {
                source: "Ice Arena".to_string()
            }
        );
        assert_eq!(
            service.confirm_subscription(42, 42).await.unwrap(),
            SubscriptionOutcome::Confirmed
        );

        let visitor = service.complete(42, contact("+998 90 123 45 67")).await.unwrap();
        assert_eq!(visitor.phone, "998901234567");
        assert_eq!(visitor.source, "Ice Arena");
        assert_eq!(visitor.profile_photo.as_deref(), Some("photo-1"));
        assert_eq!(store.visitor_count(), 1);
        assert!(dialogues.get(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restart_never_duplicates() {
        let mut messenger = MockMessenger::new();
        messenger.expect_chat_member_status().returning(|_, _| Ok("creator".to_string()));
        messenger.expect_profile_photo().returning(|_| Ok(None));
        let (service, store, dialogues) = service(messenger);

        service.start(42, 42, None).await.unwrap();
        service.confirm_subscription(42, 42).await.unwrap();
        service.complete(42, contact("998901234567")).await.unwrap();

        for arg in [None, Some("bowling")] {
            assert_eq!(service.start(42, 42, arg).await.unwrap(), StartOutcome::AlreadyRegistered);
        }
        assert!(dialogues.get(42).await.unwrap().is_none());
        assert_eq!(store.visitor_count(), 1);
    }

    #[tokio::test]
    async fn test_not_subscribed_keeps_state() {
        let mut messenger = MockMessenger::new();
        messenger.expect_chat_member_status().returning(|_, _| Ok("left".to_string()));
        let (service, _, dialogues) = service(messenger);

        service.start(42, 42, Some("cafe")).await.unwrap();
        assert_eq!(
            service.confirm_subscription(42, 42).await.unwrap(),
            SubscriptionOutcome::NotSubscribed
        );
        assert_eq!(
            dialogues.get(42).await.unwrap(),
            Some(Dialogue::AwaitingSubscription {
                source: "Cafe".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_membership_check_error_is_soft() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_chat_member_status()
            .returning(|_, _| Err(AppError::Telegram("Bad Request: chat not found".to_string())));
        let (service, _, dialogues) = service(messenger);

        service.start(42, 42, None).await.unwrap();
        assert_eq!(
            service.confirm_subscription(42, 42).await.unwrap(),
            SubscriptionOutcome::CheckFailed
        );
        assert!(matches!(
            dialogues.get(42).await.unwrap(),
            Some(Dialogue::AwaitingSubscription { .. })
        ));
    }

    #[tokio::test]
    async fn test_contact_outside_flow_is_rejected() {
        let (service, store, _) = service(MockMessenger::new());
        let result = service.complete(42, contact("998901234567")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(store.visitor_count(), 0);
    }

    #[tokio::test]
    async fn test_foreign_contact_is_rejected() {
        let mut messenger = MockMessenger::new();
        messenger.expect_chat_member_status().returning(|_, _| Ok("member".to_string()));
        let (service, store, dialogues) = service(messenger);

        service.start(42, 42, None).await.unwrap();
        service.confirm_subscription(42, 42).await.unwrap();

        let mut foreign = contact("998901234567");
        foreign.contact_user_id = Some(7);
        tokio_test::assert_err!(service.complete(42, foreign).await);
        assert_eq!(store.visitor_count(), 0);
        assert!(matches!(dialogues.get(42).await.unwrap(), Some(Dialogue::AwaitingPhone { .. })));
    }
}
