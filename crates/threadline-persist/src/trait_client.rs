use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Attachment, Message, MessagePatch, NewThread, SharedChat, Thread, ThreadStatus};

/// Trait for database persistence operations
///
/// Implementations provide database-specific storage; callers only ever see
/// the database-agnostic models.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Cheap reachability check for the health route
    async fn ping(&self) -> Result<()>;

    // ---- threads ----

    /// Return the thread for `(user_id, thread_id)`, creating it with status
    /// `generating` if it does not exist. Concurrent calls yield one row.
    async fn ensure_thread(&self, thread: NewThread) -> Result<Thread>;

    async fn get_thread(&self, user_id: &str, thread_id: &str) -> Result<Option<Thread>>;

    /// Threads of a user, most recently updated first
    async fn list_threads(&self, user_id: &str, limit: Option<i64>) -> Result<Vec<Thread>>;

    async fn update_thread_title(&self, user_id: &str, thread_id: &str, title: &str)
        -> Result<()>;

    async fn update_thread_status(
        &self,
        user_id: &str,
        thread_id: &str,
        status: ThreadStatus,
    ) -> Result<()>;

    /// Delete attachments of the thread's messages, then the messages, then
    /// the thread. Not transactional: a failure part way leaves a thread
    /// with fewer messages, never messages without cleanup.
    async fn delete_thread(&self, user_id: &str, thread_id: &str) -> Result<()>;

    // ---- messages ----

    /// Insert a message. Re-inserting an id with the same owner and thread
    /// is a no-op; an id already held by another user or thread fails with
    /// `MessageConflict`.
    async fn add_message(&self, message: Message) -> Result<()>;

    /// Patch a message owned by `user_id`. A miss, another owner, or a
    /// failed `MessagePatch::if_open` guard all yield `MessageNotFound`.
    async fn patch_message(
        &self,
        user_id: &str,
        message_id: &str,
        patch: MessagePatch,
    ) -> Result<Message>;

    async fn get_message(&self, user_id: &str, message_id: &str) -> Result<Option<Message>>;

    /// Messages `user_id` wrote to a thread, in creation order
    async fn get_messages(&self, user_id: &str, thread_id: &str) -> Result<Vec<Message>>;

    /// Assistant messages still `thinking`/`streaming` and untouched since `older_than`
    async fn find_stale_placeholders(&self, older_than: DateTime<Utc>) -> Result<Vec<Message>>;

    // ---- attachments ----

    /// Insert an attachment; an existing attachment id is left as is
    async fn add_attachment(&self, attachment: Attachment) -> Result<()>;

    /// Attachments owned by `user_id` on any of `message_ids`
    async fn get_attachments(
        &self,
        user_id: &str,
        message_ids: &[String],
    ) -> Result<Vec<Attachment>>;

    // ---- shared chats ----

    async fn create_shared_chat(&self, share: SharedChat) -> Result<SharedChat>;

    async fn get_shared_chat(&self, share_id: &str) -> Result<Option<SharedChat>>;

    async fn list_shared_chats(&self, owner_id: &str) -> Result<Vec<SharedChat>>;

    async fn delete_shared_chat(&self, owner_id: &str, share_id: &str) -> Result<()>;
}
