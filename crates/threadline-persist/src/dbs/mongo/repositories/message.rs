use bson::{doc, DateTime, Document};
use futures::TryStreamExt;
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection, IndexModel};

use crate::dbs::mongo::is_duplicate_key;
use crate::dbs::mongo::models::MongoMessage;
use crate::error::Result;
use crate::models::{MessagePatch, MessageStatus};

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("messages");
        Self { collection }
    }

    pub async fn create_indexes(&self) -> Result<()> {
        let by_thread = IndexModel::builder()
            .keys(doc! { "user_id": 1, "thread_id": 1, "created_at": 1 })
            .build();
        let open = IndexModel::builder()
            .keys(doc! { "role": 1, "status": 1, "updated_at": 1 })
            .build();

        self.collection.create_indexes([by_thread, open]).await?;
        Ok(())
    }

    /// Insert; an existing `_id` is an idempotent no-op. Returns whether a row was written.
    pub async fn insert_message(&self, message: MongoMessage) -> Result<bool> {
        match self.collection.insert_one(&message).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Patch a message of `user_id`. `None` when nothing matched the filter,
    /// including a failed open-placeholder guard.
    pub async fn patch_message(
        &self,
        user_id: &str,
        message_id: &str,
        patch: &MessagePatch,
    ) -> Result<Option<MongoMessage>> {
        let mut set = Document::new();
        if let Some(content) = &patch.content {
            set.insert("content", content.as_str());
        }
        if let Some(status) = patch.status {
            set.insert("status", status.as_str());
        }
        if let Some(model_response) = &patch.model_response {
            set.insert("model_response", model_response.as_str());
        }
        if let Some(ids) = &patch.attachment_ids {
            set.insert("attachment_ids", ids.clone());
        }
        set.insert("updated_at", DateTime::now());

        let mut filter = doc! { "_id": message_id, "user_id": user_id };
        if patch.only_if_open {
            filter.insert("role", "assistant");
            filter.insert("status", doc! { "$in": open_statuses() });
        }

        let updated = self
            .collection
            .find_one_and_update(filter, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    pub async fn get_message(
        &self,
        user_id: &str,
        message_id: &str,
    ) -> Result<Option<MongoMessage>> {
        Ok(self
            .collection
            .find_one(doc! { "_id": message_id, "user_id": user_id })
            .await?)
    }

    /// Owner and thread of a message id, whoever holds it
    pub async fn message_owner(&self, message_id: &str) -> Result<Option<(String, String)>> {
        let message = self.collection.find_one(doc! { "_id": message_id }).await?;
        Ok(message.map(|m| (m.user_id, m.thread_id)))
    }

    /// Get all messages a user wrote to a thread
    pub async fn get_messages(&self, user_id: &str, thread_id: &str) -> Result<Vec<MongoMessage>> {
        let messages = self
            .collection
            .find(doc! { "thread_id": thread_id, "user_id": user_id })
            .sort(doc! { "created_at": 1, "_id": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    pub async fn message_ids(&self, user_id: &str, thread_id: &str) -> Result<Vec<String>> {
        let messages: Vec<MongoMessage> = self
            .collection
            .find(doc! { "thread_id": thread_id, "user_id": user_id })
            .await?
            .try_collect()
            .await?;
        Ok(messages.into_iter().map(|m| m.message_id).collect())
    }

    pub async fn delete_thread_messages(&self, user_id: &str, thread_id: &str) -> Result<u64> {
        let result = self
            .collection
            .delete_many(doc! { "thread_id": thread_id, "user_id": user_id })
            .await?;
        Ok(result.deleted_count)
    }

    pub async fn find_stale(&self, older_than: DateTime) -> Result<Vec<MongoMessage>> {
        let filter = doc! {
            "role": "assistant",
            "status": { "$in": open_statuses() },
            "updated_at": { "$lt": older_than },
        };
        let messages = self.collection.find(filter).await?.try_collect().await?;
        Ok(messages)
    }
}

fn open_statuses() -> Vec<&'static str> {
    vec![MessageStatus::Thinking.as_str(), MessageStatus::Streaming.as_str()]
}
