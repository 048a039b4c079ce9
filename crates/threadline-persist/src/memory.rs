use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::models::{Attachment, Message, MessagePatch, NewThread, SharedChat, Thread, ThreadStatus};
use crate::trait_client::PersistenceClient;

#[derive(Default)]
struct Store {
    threads: HashMap<(String, String), Thread>,
    // Insertion order doubles as the tie-breaker for equal timestamps
    messages: Vec<Message>,
    attachments: Vec<Attachment>,
    shares: HashMap<String, SharedChat>,
}

/// In-process backend used by tests and `database.backend = "memory"`.
/// A single lock makes every operation atomic.
#[derive(Default)]
pub struct MemoryPersistenceClient {
    store: RwLock<Store>,
}

impl MemoryPersistenceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of thread rows, for asserting uniqueness in tests
    pub async fn thread_count(&self) -> usize {
        self.store.read().await.threads.len()
    }
}

fn key(user_id: &str, thread_id: &str) -> (String, String) {
    (user_id.to_string(), thread_id.to_string())
}

#[async_trait]
impl PersistenceClient for MemoryPersistenceClient {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_thread(&self, thread: NewThread) -> Result<Thread> {
        let mut store = self.store.write().await;
        let thread = store
            .threads
            .entry(key(&thread.user_id, &thread.thread_id))
            .or_insert_with(|| thread.into_thread(Utc::now()));
        Ok(thread.clone())
    }

    async fn get_thread(&self, user_id: &str, thread_id: &str) -> Result<Option<Thread>> {
        let store = self.store.read().await;
        Ok(store.threads.get(&key(user_id, thread_id)).cloned())
    }

    async fn list_threads(&self, user_id: &str, limit: Option<i64>) -> Result<Vec<Thread>> {
        let store = self.store.read().await;
        let mut threads: Vec<Thread> = store
            .threads
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        if let Some(limit) = limit {
            threads.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(threads)
    }

    async fn update_thread_title(
        &self,
        user_id: &str,
        thread_id: &str,
        title: &str,
    ) -> Result<()> {
        let mut store = self.store.write().await;
        let thread = store
            .threads
            .get_mut(&key(user_id, thread_id))
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;
        thread.title = title.to_string();
        thread.updated_at = Utc::now();
        Ok(())
    }

    async fn update_thread_status(
        &self,
        user_id: &str,
        thread_id: &str,
        status: ThreadStatus,
    ) -> Result<()> {
        let mut store = self.store.write().await;
        let thread = store
            .threads
            .get_mut(&key(user_id, thread_id))
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;
        thread.status = status;
        thread.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_thread(&self, user_id: &str, thread_id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        if !store.threads.contains_key(&key(user_id, thread_id)) {
            return Err(PersistError::ThreadNotFound(thread_id.to_string()));
        }

        let message_ids: Vec<String> = store
            .messages
            .iter()
            .filter(|m| m.thread_id == thread_id && m.user_id == user_id)
            .map(|m| m.message_id.clone())
            .collect();

        store
            .attachments
            .retain(|a| !message_ids.contains(&a.message_id));
        store
            .messages
            .retain(|m| !(m.thread_id == thread_id && m.user_id == user_id));
        store.threads.remove(&key(user_id, thread_id));

        Ok(())
    }

    async fn add_message(&self, message: Message) -> Result<()> {
        let mut store = self.store.write().await;
        if let Some(existing) = store
            .messages
            .iter()
            .find(|m| m.message_id == message.message_id)
        {
            if existing.user_id != message.user_id || existing.thread_id != message.thread_id {
                return Err(PersistError::MessageConflict(message.message_id));
            }
            tracing::debug!(message_id = %message.message_id, "Message already exists, skipping insert");
            return Ok(());
        }
        store.messages.push(message);
        Ok(())
    }

    async fn patch_message(
        &self,
        user_id: &str,
        message_id: &str,
        patch: MessagePatch,
    ) -> Result<Message> {
        let mut store = self.store.write().await;
        let message = store
            .messages
            .iter_mut()
            .find(|m| m.message_id == message_id && m.user_id == user_id)
            .filter(|m| patch.applies_to(m))
            .ok_or_else(|| PersistError::MessageNotFound(message_id.to_string()))?;
        message.apply(&patch, Utc::now());
        Ok(message.clone())
    }

    async fn get_message(&self, user_id: &str, message_id: &str) -> Result<Option<Message>> {
        let store = self.store.read().await;
        Ok(store
            .messages
            .iter()
            .find(|m| m.message_id == message_id && m.user_id == user_id)
            .cloned())
    }

    async fn get_messages(&self, user_id: &str, thread_id: &str) -> Result<Vec<Message>> {
        let store = self.store.read().await;
        let mut messages: Vec<Message> = store
            .messages
            .iter()
            .filter(|m| m.thread_id == thread_id && m.user_id == user_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn find_stale_placeholders(&self, older_than: DateTime<Utc>) -> Result<Vec<Message>> {
        let store = self.store.read().await;
        Ok(store
            .messages
            .iter()
            .filter(|m| m.is_open_placeholder() && m.updated_at < older_than)
            .cloned()
            .collect())
    }

    async fn add_attachment(&self, attachment: Attachment) -> Result<()> {
        let mut store = self.store.write().await;
        if store
            .attachments
            .iter()
            .any(|a| a.attachment_id == attachment.attachment_id)
        {
            return Ok(());
        }
        store.attachments.push(attachment);
        Ok(())
    }

    async fn get_attachments(
        &self,
        user_id: &str,
        message_ids: &[String],
    ) -> Result<Vec<Attachment>> {
        let store = self.store.read().await;
        Ok(store
            .attachments
            .iter()
            .filter(|a| a.user_id == user_id && message_ids.contains(&a.message_id))
            .cloned()
            .collect())
    }

    async fn create_shared_chat(&self, share: SharedChat) -> Result<SharedChat> {
        let mut store = self.store.write().await;
        store.shares.insert(share.share_id.clone(), share.clone());
        Ok(share)
    }

    async fn get_shared_chat(&self, share_id: &str) -> Result<Option<SharedChat>> {
        let store = self.store.read().await;
        Ok(store.shares.get(share_id).cloned())
    }

    async fn list_shared_chats(&self, owner_id: &str) -> Result<Vec<SharedChat>> {
        let store = self.store.read().await;
        let mut shares: Vec<SharedChat> = store
            .shares
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        shares.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(shares)
    }

    async fn delete_shared_chat(&self, owner_id: &str, share_id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        match store.shares.get(share_id) {
            Some(share) if share.owner_id == owner_id => {
                store.shares.remove(share_id);
                Ok(())
            }
            _ => Err(PersistError::ShareNotFound(share_id.to_string())),
        }
    }
}
