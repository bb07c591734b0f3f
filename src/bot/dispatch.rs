//! Per-chat update queues
//!
//! ```text
//! getUpdates / webhook
//!        │
//!        └── Dispatcher
//!               ├── mpsc ──► worker (chat A)
//!               └── mpsc ──► worker (chat B)
//! ```
//!
//! Updates of one chat are handled in arrival order by that chat's worker;
//! chats never wait on each other. A worker exits once its queue is drained
//! and is spawned again by the next update for the chat.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::telegram::types::Update;

#[async_trait]
pub trait UpdateHandler: Send + Sync + 'static {
    async fn handle_update(&self, update: Update);
}

type Queues = Arc<Mutex<HashMap<i64, mpsc::UnboundedSender<Update>>>>;

pub struct Dispatcher {
    handler: Arc<dyn UpdateHandler>,
    queues: Queues,
}

impl Dispatcher {
    pub fn new(handler: Arc<dyn UpdateHandler>) -> Self {
        Self {
            handler,
            queues: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Queue `update` behind earlier updates of the same chat; returns
    /// without waiting for it to be handled
    pub async fn dispatch(&self, update: Update) {
        let Some(chat_id) = update.chat_key() else {
            let handler = self.handler.clone();
            tokio::spawn(async move { handler.handle_update(update).await });
            return;
        };

        let mut queues = self.queues.lock().await;
        let update = match queues.get(&chat_id) {
            Some(sender) => match sender.send(update) {
                Ok(()) => return,
                // worker died mid-update; start a fresh one
                Err(mpsc::error::SendError(update)) => update,
            },
            None => update,
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        if sender.send(update).is_err() {
            return;
        }
        queues.insert(chat_id, sender);
        tokio::spawn(run_queue(self.handler.clone(), self.queues.clone(), chat_id, receiver));
    }

    /// Chats with a running worker
    #[cfg(test)]
    pub async fn active_chats(&self) -> usize {
        self.queues.lock().await.len()
    }
}

async fn run_queue(
    handler: Arc<dyn UpdateHandler>,
    queues: Queues,
    chat_id: i64,
    mut receiver: mpsc::UnboundedReceiver<Update>,
) {
    loop {
        let update = match receiver.try_recv() {
            Ok(update) => update,
            Err(_) => {
                // senders push under this lock, so an empty queue here stays empty
                let mut queues = queues.lock().await;
                match receiver.try_recv() {
                    Ok(update) => update,
                    Err(_) => {
                        queues.remove(&chat_id);
                        return;
                    }
                }
            }
        };
        handler.handle_update(update).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Holds update 1 until update 3 (another chat) has been handled
    #[derive(Default)]
    struct GatedHandler {
        release: Notify,
        handled: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl UpdateHandler for GatedHandler {
        async fn handle_update(&self, update: Update) {
            if update.update_id == 1 {
                self.release.notified().await;
            }
            self.handled.lock().await.push(update.update_id);
            if update.update_id == 3 {
                self.release.notify_one();
            }
        }
    }

    fn update(update_id: i64, chat: i64) -> Update {
        serde_json::from_value(serde_json::json!({
            "update_id": update_id,
            "message": {
                "message_id": update_id,
                "from": { "id": chat, "is_bot": false, "first_name": "T" },
                "chat": { "id": chat },
                "text": "hi"
            }
        }))
        .unwrap()
    }

    async fn wait_for(handler: &GatedHandler, count: usize) -> Vec<i64> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let handled = handler.handled.lock().await.clone();
                if handled.len() >= count {
                    return handled;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("updates were not handled in time")
    }

    #[tokio::test]
    async fn test_slow_chat_does_not_hold_back_others() {
        let handler = Arc::new(GatedHandler::default());
        let dispatcher = Dispatcher::new(handler.clone());

        // would never return if dispatch waited for the blocked chat
        tokio::time::timeout(Duration::from_secs(1), async {
            dispatcher.dispatch(update(1, 10)).await;
            dispatcher.dispatch(update(2, 10)).await;
            dispatcher.dispatch(update(3, 20)).await;
        })
        .await
        .expect("dispatch waited on a handler");

        assert_eq!(wait_for(&handler, 3).await, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_idle_worker_exits_and_restarts() {
        let handler = Arc::new(GatedHandler::default());
        let dispatcher = Dispatcher::new(handler.clone());

        dispatcher.dispatch(update(4, 30)).await;
        wait_for(&handler, 1).await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while dispatcher.active_chats().await > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("worker did not exit");

        dispatcher.dispatch(update(5, 30)).await;
        assert_eq!(wait_for(&handler, 2).await, vec![4, 5]);
    }
}
