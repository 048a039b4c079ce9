use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use threadline_persist::{
    Attachment, Message, MessagePatch, MessageRole, MessageStatus, ModelParams, NewThread,
    PersistenceClient, ThreadStatus,
};

use crate::error::ApiError;

/// Default refresh period for a live placeholder
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Everything recorded before the provider is contacted
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub user_id: String,
    pub thread_id: String,
    pub model: String,
    pub user_message_id: String,
    pub assistant_message_id: String,
    pub user_content: String,
    pub params: ModelParams,
    /// Already-uploaded files, recorded against the user message
    pub attachments: Vec<Attachment>,
}

/// The assistant placeholder of one chat turn.
///
/// Accumulates streamed text and guarantees the placeholder leaves
/// `thinking`/`streaming` exactly once: through `complete`, `fail`, or, when
/// the turn is dropped early (client disconnect), an `error` patch spawned
/// from `Drop`. While streaming, the placeholder is rewritten every
/// heartbeat so the reconciler sees it as alive.
pub struct ChatTurn {
    persist: Arc<dyn PersistenceClient>,
    user_id: String,
    thread_id: String,
    message_id: String,
    content: String,
    reasoning: String,
    heartbeat: Duration,
    last_write: Option<Instant>,
    finalized: bool,
}

impl ChatTurn {
    /// Record the turn: thread upsert, user message, assistant placeholder,
    /// then the user's attachments.
    pub async fn begin(
        persist: Arc<dyn PersistenceClient>,
        record: TurnRecord,
    ) -> Result<Self, ApiError> {
        let thread = persist
            .ensure_thread(NewThread::new(&record.user_id, &record.thread_id, &record.model))
            .await?;
        if thread.status != ThreadStatus::Generating {
            persist
                .update_thread_status(&record.user_id, &record.thread_id, ThreadStatus::Generating)
                .await?;
        }

        let attachment_ids: Vec<String> = record
            .attachments
            .iter()
            .map(|a| a.attachment_id.clone())
            .collect();

        let user_message = Message::new(
            &record.user_message_id,
            &record.thread_id,
            &record.user_id,
            MessageRole::User,
            &record.model,
        )
        .with_content(record.user_content.as_str())
        .with_status(MessageStatus::Completed)
        .with_attachment_ids(attachment_ids);

        let placeholder = Message::new(
            &record.assistant_message_id,
            &record.thread_id,
            &record.user_id,
            MessageRole::Assistant,
            &record.model,
        )
        .with_status(MessageStatus::Thinking)
        .with_params(record.params.clone());

        for message in [user_message, placeholder] {
            if let Err(e) = persist.add_message(message).await {
                // No placeholder of ours is open yet, only the thread
                set_thread_status(persist.as_ref(), &record.user_id, &record.thread_id, ThreadStatus::Error)
                    .await;
                return Err(e.into());
            }
        }

        let mut turn = Self {
            persist,
            user_id: record.user_id,
            thread_id: record.thread_id,
            message_id: record.assistant_message_id,
            content: String::new(),
            reasoning: String::new(),
            heartbeat: HEARTBEAT_INTERVAL,
            last_write: None,
            finalized: false,
        };

        for attachment in record.attachments {
            if let Err(e) = turn.persist.add_attachment(attachment).await {
                return Err(turn.reject(e.into()).await);
            }
        }

        tracing::debug!(
            thread_id = %turn.thread_id,
            message_id = %turn.message_id,
            "Chat turn recorded"
        );
        Ok(turn)
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Id of the assistant message
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn push_content(&mut self, delta: &str) {
        self.content.push_str(delta);
    }

    pub fn push_reasoning(&mut self, delta: &str) {
        self.reasoning.push_str(delta);
    }

    /// Move the placeholder to `streaming`. Called on every delta: the first
    /// call writes, later calls write again once a heartbeat has passed,
    /// carrying the text received so far.
    pub async fn mark_streaming(&mut self) {
        if self.finalized {
            return;
        }
        if let Some(last) = self.last_write {
            if last.elapsed() < self.heartbeat {
                return;
            }
        }
        self.last_write = Some(Instant::now());

        let patch = MessagePatch::status(MessageStatus::Streaming)
            .content(self.content.as_str())
            .if_open();
        if let Err(e) = self
            .persist
            .patch_message(&self.user_id, &self.message_id, patch)
            .await
        {
            tracing::warn!(message_id = %self.message_id, error = %e, "Failed to mark message streaming");
        }
    }

    /// Store the full text and reasoning trace as `completed`
    pub async fn complete(&mut self) -> Result<(), ApiError> {
        let reasoning = (!self.reasoning.is_empty()).then(|| self.reasoning.clone());
        let patch = MessagePatch::status(MessageStatus::Completed)
            .content(self.content.as_str())
            .model_response(reasoning);
        self.finish(patch, ThreadStatus::Completed).await
    }

    /// Image turns complete with the generated file instead of text
    pub async fn complete_with_attachment(&mut self, attachment_id: String) -> Result<(), ApiError> {
        let patch = MessagePatch::status(MessageStatus::Completed)
            .content("")
            .attachment_ids(vec![attachment_id]);
        self.finish(patch, ThreadStatus::Completed).await
    }

    /// Mark the placeholder `error`, keeping whatever text already arrived
    pub async fn fail(&mut self, reason: &str) {
        if self.finalized {
            return;
        }
        tracing::warn!(
            thread_id = %self.thread_id,
            message_id = %self.message_id,
            reason = %reason,
            "Chat turn failed"
        );
        let reasoning = (!self.reasoning.is_empty()).then(|| self.reasoning.clone());
        let patch = MessagePatch::status(MessageStatus::Error)
            .content(self.content.as_str())
            .model_response(reasoning);
        if let Err(e) = self.finish(patch, ThreadStatus::Error).await {
            tracing::error!(message_id = %self.message_id, error = %e, "Failed to record turn failure");
        }
    }

    /// Fail the turn and hand the error back for the response
    pub async fn reject(&mut self, err: ApiError) -> ApiError {
        self.fail(&err.to_string()).await;
        err
    }

    async fn finish(&mut self, patch: MessagePatch, thread_status: ThreadStatus) -> Result<(), ApiError> {
        if self.finalized {
            return Ok(());
        }
        // One attempt only; a placeholder left open is picked up by the reconciler
        self.finalized = true;

        self.persist
            .patch_message(&self.user_id, &self.message_id, patch)
            .await?;
        set_thread_status(self.persist.as_ref(), &self.user_id, &self.thread_id, thread_status).await;
        Ok(())
    }
}

impl Drop for ChatTurn {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }

        tracing::warn!(
            thread_id = %self.thread_id,
            message_id = %self.message_id,
            "Chat turn dropped before finalizing"
        );

        let persist = Arc::clone(&self.persist);
        let user_id = std::mem::take(&mut self.user_id);
        let thread_id = std::mem::take(&mut self.thread_id);
        let message_id = std::mem::take(&mut self.message_id);
        let patch = MessagePatch::status(MessageStatus::Error).content(std::mem::take(&mut self.content));

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = persist.patch_message(&user_id, &message_id, patch).await {
                        tracing::error!(message_id = %message_id, error = %e, "Failed to finalize dropped turn");
                        return;
                    }
                    set_thread_status(persist.as_ref(), &user_id, &thread_id, ThreadStatus::Error).await;
                });
            }
            Err(_) => {
                tracing::error!(message_id = %message_id, "No runtime to finalize dropped turn");
            }
        }
    }
}

/// Best-effort thread status update; the message row is the source of truth
pub(crate) async fn set_thread_status(
    persist: &dyn PersistenceClient,
    user_id: &str,
    thread_id: &str,
    status: ThreadStatus,
) {
    if let Err(e) = persist.update_thread_status(user_id, thread_id, status).await {
        tracing::warn!(
            thread_id = %thread_id,
            status = status.as_str(),
            error = %e,
            "Failed to update thread status"
        );
    }
}

/// Attachment row for a file already in the bucket
pub fn attachment_record(
    user_id: &str,
    message_id: &str,
    url: &str,
    key: &str,
    file_name: &str,
    file_type: &str,
    file_size: u64,
) -> Attachment {
    Attachment {
        attachment_id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        message_id: message_id.to_string(),
        attachment_url: url.to_string(),
        file_name: file_name.to_string(),
        file_type: file_type.to_string(),
        file_size,
        file_key: key.to_string(),
        created_at: Utc::now(),
    }
}
