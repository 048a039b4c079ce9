//! Client-facing JSON shapes (camelCase) of the persisted models

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use threadline_persist::{Attachment, Message, ModelParams, SharedChat, Thread};

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelParamsBody {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    /// `low`, `medium` or `high`
    pub reasoning_effort: Option<String>,
}

impl From<ModelParamsBody> for ModelParams {
    fn from(body: ModelParamsBody) -> Self {
        ModelParams {
            temperature: body.temperature,
            top_p: body.top_p,
            top_k: body.top_k,
            reasoning_effort: body.reasoning_effort,
        }
    }
}

impl From<ModelParams> for ModelParamsBody {
    fn from(params: ModelParams) -> Self {
        ModelParamsBody {
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            reasoning_effort: params.reasoning_effort,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThreadView {
    pub thread_id: String,
    pub model: String,
    pub title: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Thread> for ThreadView {
    fn from(thread: Thread) -> Self {
        ThreadView {
            status: thread.status.as_str().to_string(),
            thread_id: thread.thread_id,
            model: thread.model,
            title: thread.title,
            created_at: thread.created_at,
            updated_at: thread.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
    pub attachment_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
    pub url: String,
    pub key: String,
}

impl From<Attachment> for AttachmentView {
    fn from(a: Attachment) -> Self {
        AttachmentView {
            attachment_id: a.attachment_id,
            name: a.file_name,
            content_type: a.file_type,
            size: a.file_size,
            url: a.attachment_url,
            key: a.file_key,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub message_id: String,
    pub thread_id: String,
    pub role: String,
    pub content: String,
    pub model: String,
    pub status: String,
    pub model_params: ModelParamsBody,
    pub model_response: Option<String>,
    pub attachments: Vec<AttachmentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageView {
    /// Pair each message with its attachments, keeping message order
    pub fn with_attachments(messages: Vec<Message>, attachments: Vec<Attachment>) -> Vec<Self> {
        let mut by_message: HashMap<String, Vec<Attachment>> = HashMap::new();
        for attachment in attachments {
            by_message
                .entry(attachment.message_id.clone())
                .or_default()
                .push(attachment);
        }

        messages
            .into_iter()
            .map(|message| {
                let own = by_message.remove(&message.message_id).unwrap_or_default();
                MessageView::new(message, own)
            })
            .collect()
    }

    fn new(message: Message, attachments: Vec<Attachment>) -> Self {
        MessageView {
            role: message.role.as_str().to_string(),
            status: message.status.as_str().to_string(),
            message_id: message.message_id,
            thread_id: message.thread_id,
            content: message.content,
            model: message.model,
            model_params: message.model_params.into(),
            model_response: message.model_response,
            attachments: attachments.into_iter().map(AttachmentView::from).collect(),
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareView {
    pub share_id: String,
    pub thread_id: String,
    pub title: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<SharedChat> for ShareView {
    fn from(share: SharedChat) -> Self {
        ShareView {
            share_id: share.share_id,
            thread_id: share.thread_id,
            title: share.title,
            is_public: share.is_public,
            created_at: share.created_at,
            expires_at: share.expires_at,
        }
    }
}
