//! Conversation-scoped transient state for multi-step flows

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{error::AppResult, models::Segment};

/// Where a conversation currently is. Absence of a value is the idle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Dialogue {
    // registration
    AwaitingSubscription { source: String },
    AwaitingPhone { source: String },
    // staff panel
    AwaitingBroadcastContent { segment: Segment },
    AwaitingQrKey,
    AwaitingVisitorIdentifier,
    AwaitingStaffId,
    AwaitingStaffRole { telegram_id: i64, full_name: Option<String> },
    AwaitingCashierLocation { telegram_id: i64, full_name: Option<String> },
}

#[async_trait]
pub trait DialogueStore: Send + Sync {
    async fn get(&self, chat_id: i64) -> AppResult<Option<Dialogue>>;

    async fn set(&self, chat_id: i64, dialogue: &Dialogue) -> AppResult<()>;

    async fn clear(&self, chat_id: i64) -> AppResult<()>;
}

/// Process-local store, used when Redis is disabled
#[derive(Default)]
pub struct MemoryDialogueStore {
    dialogues: Mutex<HashMap<i64, Dialogue>>,
}

impl MemoryDialogueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DialogueStore for MemoryDialogueStore {
    async fn get(&self, chat_id: i64) -> AppResult<Option<Dialogue>> {
        Ok(self.dialogues.lock().await.get(&chat_id).cloned())
    }

    async fn set(&self, chat_id: i64, dialogue: &Dialogue) -> AppResult<()> {
        self.dialogues.lock().await.insert(chat_id, dialogue.clone());
        Ok(())
    }

    async fn clear(&self, chat_id: i64) -> AppResult<()> {
        self.dialogues.lock().await.remove(&chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialogue_serialization() {
        let dialogue = Dialogue::AwaitingStaffRole {
            telegram_id: 77,
            full_name: Some("Aziza".to_string()),
        };
        let json = serde_json::to_string(&dialogue).unwrap();
        assert!(json.contains(r#""state":"awaiting_staff_role""#));
        assert_eq!(serde_json::from_str::<Dialogue>(&json).unwrap(), dialogue);

        let json = serde_json::to_string(&Dialogue::AwaitingBroadcastContent { segment: Segment::Female }).unwrap();
        assert_eq!(json, r#"{"state":"awaiting_broadcast_content","segment":"female"}"#);
    }

    #[tokio::test]
    async fn test_memory_store_clear() {
        let store = MemoryDialogueStore::new();
        store.set(1, &Dialogue::AwaitingQrKey).await.unwrap();
        assert_eq!(store.get(1).await.unwrap(), Some(Dialogue::AwaitingQrKey));
        assert_eq!(store.get(2).await.unwrap(), None);

        store.clear(1).await.unwrap();
        assert_eq!(store.get(1).await.unwrap(), None);
    }
}
