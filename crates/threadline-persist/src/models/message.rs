use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database-agnostic message model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub thread_id: String,
    pub user_id: String,
    pub role: MessageRole,
    pub content: String,
    pub model: String,
    pub status: MessageStatus,
    #[serde(default)]
    pub model_params: ModelParams,
    /// Ordered, informational only
    #[serde(default)]
    pub attachment_ids: Vec<String>,
    /// Reasoning trace returned alongside the answer
    pub model_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        message_id: impl Into<String>,
        thread_id: impl Into<String>,
        user_id: impl Into<String>,
        role: MessageRole,
        model: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            message_id: message_id.into(),
            thread_id: thread_id.into(),
            user_id: user_id.into(),
            role,
            content: String::new(),
            model: model.into(),
            status: MessageStatus::Waiting,
            model_params: ModelParams::default(),
            attachment_ids: Vec::new(),
            model_response: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.model_params = params;
        self
    }

    pub fn with_attachment_ids(mut self, ids: Vec<String>) -> Self {
        self.attachment_ids = ids;
        self
    }

    /// Assistant message that has not reached a terminal status
    pub fn is_open_placeholder(&self) -> bool {
        self.role == MessageRole::Assistant && !self.status.is_terminal()
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, patch: &MessagePatch, now: DateTime<Utc>) {
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(model_response) = &patch.model_response {
            self.model_response = Some(model_response.clone());
        }
        if let Some(ids) = &patch.attachment_ids {
            self.attachment_ids = ids.clone();
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Waiting,
    Thinking,
    Streaming,
    Completed,
    Error,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Thinking => "thinking",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// Sampling parameters the caller asked for; all optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub reasoning_effort: Option<String>,
}

/// Partial update for `patch_message`; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub status: Option<MessageStatus>,
    pub model_response: Option<String>,
    pub attachment_ids: Option<Vec<String>>,
    /// Only apply while the message is an open placeholder
    pub only_if_open: bool,
}

impl MessagePatch {
    pub fn status(status: MessageStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn model_response(mut self, model_response: Option<String>) -> Self {
        self.model_response = model_response;
        self
    }

    pub fn attachment_ids(mut self, ids: Vec<String>) -> Self {
        self.attachment_ids = Some(ids);
        self
    }

    pub fn if_open(mut self) -> Self {
        self.only_if_open = true;
        self
    }

    /// Whether the guard set by `if_open` lets this patch through
    pub fn applies_to(&self, message: &Message) -> bool {
        !self.only_if_open || message.is_open_placeholder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_patch_keeps_untouched_fields() {
        let mut msg = Message::new("m1", "t1", "u1", MessageRole::Assistant, "gpt")
            .with_status(MessageStatus::Thinking)
            .with_content("draft");
        let now = Utc::now();

        msg.apply(&MessagePatch::status(MessageStatus::Streaming), now);
        assert_eq!(msg.status, MessageStatus::Streaming);
        assert_eq!(msg.content, "draft");
        assert_eq!(msg.updated_at, now);

        msg.apply(
            &MessagePatch::status(MessageStatus::Completed)
                .content("final")
                .model_response(Some("because".to_string())),
            now,
        );
        assert_eq!(msg.content, "final");
        assert_eq!(msg.model_response.as_deref(), Some("because"));
        assert!(!msg.is_open_placeholder());
    }

    #[test]
    fn test_user_message_is_never_a_placeholder() {
        let msg = Message::new("m1", "t1", "u1", MessageRole::User, "gpt")
            .with_status(MessageStatus::Thinking);
        assert!(!msg.is_open_placeholder());
    }

    #[test]
    fn test_open_guard_skips_finished_messages() {
        let done = Message::new("m1", "t1", "u1", MessageRole::Assistant, "gpt")
            .with_status(MessageStatus::Completed);
        let open = done.clone().with_status(MessageStatus::Streaming);
        let patch = MessagePatch::status(MessageStatus::Error).if_open();

        assert!(!patch.applies_to(&done));
        assert!(patch.applies_to(&open));
        assert!(MessagePatch::status(MessageStatus::Error).applies_to(&done));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(MessageStatus::Thinking).unwrap(),
            serde_json::json!("thinking")
        );
        assert_eq!(MessageStatus::Streaming.as_str(), "streaming");
    }
}
