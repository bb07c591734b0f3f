//! Visitor-facing handlers: registration and the demographic prompt

use crate::{
    error::AppResult,
    models::Gender,
    services::{
        dialogue::Dialogue,
        registration::{ContactInput, StartOutcome, SubscriptionOutcome},
    },
    telegram::types::{CallbackQuery, Message},
};

use super::{callback_chat, keyboards, texts, Ack, Bot};

impl Bot {
    pub(super) async fn start(&self, message: &Message, arg: Option<&str>) -> AppResult<()> {
        let chat_id = message.chat.id;
        let Some(from) = message.from.as_ref() else {
            return Ok(());
        };
        let registration = &self.services.registration;

        match registration.start(chat_id, from.id, arg).await? {
            StartOutcome::AlreadyRegistered => {
                self.messenger
                    .send_text(chat_id, &texts::already_registered(registration.venue_name()), None)
                    .await
            }
            StartOutcome::AwaitingSubscription { .. } => {
                let markup = keyboards::subscription(&registration.channel_link());
                self.messenger
                    .send_text(chat_id, &texts::welcome(registration.venue_name()), Some(markup.into()))
                    .await
            }
        }
    }

    pub(super) async fn check_subscription(&self, query: &CallbackQuery) -> AppResult<Ack> {
        let chat_id = callback_chat(query);
        let outcome = self
            .services
            .registration
            .confirm_subscription(chat_id, query.from.id)
            .await?;

        match outcome {
            SubscriptionOutcome::Confirmed => {
                if let Some(message) = &query.message {
                    self.messenger
                        .edit_text(chat_id, message.message_id, "✅ Subscription confirmed.", None)
                        .await?;
                }
                self.messenger
                    .send_text(chat_id, texts::ASK_PHONE, Some(keyboards::share_phone()))
                    .await?;
                Ok(Ack::Silent)
            }
            SubscriptionOutcome::NotSubscribed => Ok(Ack::Alert("You have not subscribed yet!".to_string())),
            SubscriptionOutcome::CheckFailed => Ok(Ack::Alert(
                "Could not check your subscription, please try again in a moment.".to_string(),
            )),
            SubscriptionOutcome::NotStarted => Ok(Ack::Alert("Press /start to begin.".to_string())),
        }
    }

    /// Registration states of the dialogue
    pub(super) async fn registration_step(&self, message: &Message, dialogue: Dialogue) -> AppResult<()> {
        let chat_id = message.chat.id;
        match (dialogue, &message.contact, &message.from) {
            (Dialogue::AwaitingPhone { .. }, Some(contact), Some(from)) => {
                let input = ContactInput {
                    sender_id: from.id,
                    first_name: Some(from.first_name.clone()),
                    username: from.username.clone(),
                    phone_number: contact.phone_number.clone(),
                    contact_user_id: contact.user_id,
                };
                let registration = &self.services.registration;
                registration.complete(chat_id, input).await?;

                self.messenger
                    .send_text(
                        chat_id,
                        &texts::registered(registration.venue_name()),
                        Some(keyboards::remove_keyboard()),
                    )
                    .await?;
                self.messenger
                    .send_text(chat_id, texts::ASK_GENDER, Some(keyboards::gender().into()))
                    .await
            }
            (Dialogue::AwaitingPhone { .. }, _, _) => {
                self.messenger
                    .send_text(chat_id, texts::ASK_PHONE, Some(keyboards::share_phone()))
                    .await
            }
            _ => {
                let markup = keyboards::subscription(&self.services.registration.channel_link());
                self.messenger
                    .send_text(
                        chat_id,
                        "Subscribe to the channel first, then press the button below.",
                        Some(markup.into()),
                    )
                    .await
            }
        }
    }

    pub(super) async fn set_gender(&self, query: &CallbackQuery, gender: Gender) -> AppResult<Ack> {
        self.services.registration.set_gender(query.from.id, gender).await?;
        if let Some(message) = &query.message {
            self.messenger
                .edit_text(message.chat.id, message.message_id, "Thank you! 🙌", None)
                .await?;
        }
        Ok(Ack::Toast("Saved".to_string()))
    }
}
