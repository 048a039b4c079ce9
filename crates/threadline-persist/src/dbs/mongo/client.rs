use async_trait::async_trait;
use bson::doc;
use chrono::{DateTime, Utc};
use mongodb::Client;

use crate::dbs::mongo::models::{MongoAttachment, MongoMessage, MongoSharedChat};
use crate::dbs::mongo::repositories::{
    MongoAttachmentRepository, MongoMessageRepository, MongoShareRepository,
    MongoThreadRepository,
};
use crate::error::{PersistError, Result};
use crate::models::{Attachment, Message, MessagePatch, NewThread, SharedChat, Thread, ThreadStatus};
use crate::trait_client::PersistenceClient;

pub struct MongoPersistenceClient {
    client: Client,
    thread_repo: MongoThreadRepository,
    message_repo: MongoMessageRepository,
    attachment_repo: MongoAttachmentRepository,
    share_repo: MongoShareRepository,
}

impl MongoPersistenceClient {
    /// Connect to MongoDB, create the repositories and make sure indexes exist
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        let this = Self {
            thread_repo: MongoThreadRepository::new(&client, database),
            message_repo: MongoMessageRepository::new(&client, database),
            attachment_repo: MongoAttachmentRepository::new(&client, database),
            share_repo: MongoShareRepository::new(&client, database),
            client,
        };

        this.thread_repo.create_indexes().await?;
        this.message_repo.create_indexes().await?;
        this.attachment_repo.create_indexes().await?;
        this.share_repo.create_indexes().await?;

        tracing::info!(database = %database, "MongoDB indexes ensured");
        Ok(this)
    }
}

#[async_trait]
impl PersistenceClient for MongoPersistenceClient {
    async fn ping(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    async fn ensure_thread(&self, thread: NewThread) -> Result<Thread> {
        Ok(self.thread_repo.ensure_thread(thread).await?.into())
    }

    async fn get_thread(&self, user_id: &str, thread_id: &str) -> Result<Option<Thread>> {
        let thread = self.thread_repo.get_thread(user_id, thread_id).await?;
        Ok(thread.map(Into::into))
    }

    async fn list_threads(&self, user_id: &str, limit: Option<i64>) -> Result<Vec<Thread>> {
        let threads = self.thread_repo.list_threads(user_id, limit).await?;
        Ok(threads.into_iter().map(Into::into).collect())
    }

    async fn update_thread_title(
        &self,
        user_id: &str,
        thread_id: &str,
        title: &str,
    ) -> Result<()> {
        self.thread_repo
            .update_fields(user_id, thread_id, doc! { "title": title })
            .await
    }

    async fn update_thread_status(
        &self,
        user_id: &str,
        thread_id: &str,
        status: ThreadStatus,
    ) -> Result<()> {
        self.thread_repo
            .update_fields(user_id, thread_id, doc! { "status": status.as_str() })
            .await
    }

    async fn delete_thread(&self, user_id: &str, thread_id: &str) -> Result<()> {
        if self.thread_repo.get_thread(user_id, thread_id).await?.is_none() {
            return Err(PersistError::ThreadNotFound(thread_id.to_string()));
        }

        let message_ids = self.message_repo.message_ids(user_id, thread_id).await?;
        let attachments = self.attachment_repo.delete_for_messages(&message_ids).await?;
        let messages = self
            .message_repo
            .delete_thread_messages(user_id, thread_id)
            .await?;
        self.thread_repo.delete_thread(user_id, thread_id).await?;

        tracing::info!(
            thread_id = %thread_id,
            messages = messages,
            attachments = attachments,
            "Thread deleted"
        );
        Ok(())
    }

    async fn add_message(&self, message: Message) -> Result<()> {
        let message_id = message.message_id.clone();
        let (user_id, thread_id) = (message.user_id.clone(), message.thread_id.clone());
        if self.message_repo.insert_message(message.into()).await? {
            return Ok(());
        }

        match self.message_repo.message_owner(&message_id).await? {
            Some(owner) if owner != (user_id, thread_id) => {
                Err(PersistError::MessageConflict(message_id))
            }
            _ => {
                tracing::debug!(message_id = %message_id, "Message already exists, skipping insert");
                Ok(())
            }
        }
    }

    async fn patch_message(
        &self,
        user_id: &str,
        message_id: &str,
        patch: MessagePatch,
    ) -> Result<Message> {
        self.message_repo
            .patch_message(user_id, message_id, &patch)
            .await?
            .map(Into::into)
            .ok_or_else(|| PersistError::MessageNotFound(message_id.to_string()))
    }

    async fn get_message(&self, user_id: &str, message_id: &str) -> Result<Option<Message>> {
        let message = self.message_repo.get_message(user_id, message_id).await?;
        Ok(message.map(Into::into))
    }

    async fn get_messages(&self, user_id: &str, thread_id: &str) -> Result<Vec<Message>> {
        let messages = self.message_repo.get_messages(user_id, thread_id).await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    async fn find_stale_placeholders(&self, older_than: DateTime<Utc>) -> Result<Vec<Message>> {
        let messages = self
            .message_repo
            .find_stale(bson::DateTime::from_chrono(older_than))
            .await?;
        Ok(messages.into_iter().map(|m: MongoMessage| m.into()).collect())
    }

    async fn add_attachment(&self, attachment: Attachment) -> Result<()> {
        self.attachment_repo
            .insert_attachment(MongoAttachment::from(attachment))
            .await
    }

    async fn get_attachments(
        &self,
        user_id: &str,
        message_ids: &[String],
    ) -> Result<Vec<Attachment>> {
        let attachments = self
            .attachment_repo
            .get_attachments(user_id, message_ids)
            .await?;
        Ok(attachments.into_iter().map(Into::into).collect())
    }

    async fn create_shared_chat(&self, share: SharedChat) -> Result<SharedChat> {
        self.share_repo
            .insert_share(&MongoSharedChat::from(share.clone()))
            .await?;
        Ok(share)
    }

    async fn get_shared_chat(&self, share_id: &str) -> Result<Option<SharedChat>> {
        let share = self.share_repo.get_share(share_id).await?;
        Ok(share.map(Into::into))
    }

    async fn list_shared_chats(&self, owner_id: &str) -> Result<Vec<SharedChat>> {
        let shares = self.share_repo.list_shares(owner_id).await?;
        Ok(shares.into_iter().map(Into::into).collect())
    }

    async fn delete_shared_chat(&self, owner_id: &str, share_id: &str) -> Result<()> {
        if self.share_repo.delete_share(owner_id, share_id).await? {
            Ok(())
        } else {
            Err(PersistError::ShareNotFound(share_id.to_string()))
        }
    }
}
