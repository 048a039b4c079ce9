use bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::models::{
    Attachment, Message, MessageRole, MessageStatus, ModelParams, SharedChat, Thread, ThreadStatus,
};

/// MongoDB-specific Thread model; unique on `(user_id, thread_id)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoThread {
    pub thread_id: String,
    pub user_id: String,
    pub model: String,
    pub title: String,
    pub status: ThreadStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// MongoDB-specific Message model; the client-minted id is the `_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub message_id: String,
    pub thread_id: String,
    pub user_id: String,
    pub role: MessageRole,
    pub content: String,
    pub model: String,
    pub status: MessageStatus,
    #[serde(default)]
    pub model_params: ModelParams,
    #[serde(default)]
    pub attachment_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_response: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoAttachment {
    #[serde(rename = "_id")]
    pub attachment_id: String,
    pub user_id: String,
    pub message_id: String,
    pub attachment_url: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub file_key: String,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSharedChat {
    #[serde(rename = "_id")]
    pub share_id: String,
    pub thread_id: String,
    pub owner_id: String,
    pub title: String,
    pub is_public: bool,
    pub created_at: DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime>,
}

// Conversions between database-agnostic and MongoDB-specific models

impl From<MongoThread> for Thread {
    fn from(thread: MongoThread) -> Self {
        Self {
            thread_id: thread.thread_id,
            user_id: thread.user_id,
            model: thread.model,
            title: thread.title,
            status: thread.status,
            created_at: thread.created_at.to_chrono(),
            updated_at: thread.updated_at.to_chrono(),
        }
    }
}

impl From<Message> for MongoMessage {
    fn from(msg: Message) -> Self {
        Self {
            message_id: msg.message_id,
            thread_id: msg.thread_id,
            user_id: msg.user_id,
            role: msg.role,
            content: msg.content,
            model: msg.model,
            status: msg.status,
            model_params: msg.model_params,
            attachment_ids: msg.attachment_ids,
            model_response: msg.model_response,
            created_at: DateTime::from_chrono(msg.created_at),
            updated_at: DateTime::from_chrono(msg.updated_at),
        }
    }
}

impl From<MongoMessage> for Message {
    fn from(msg: MongoMessage) -> Self {
        Self {
            message_id: msg.message_id,
            thread_id: msg.thread_id,
            user_id: msg.user_id,
            role: msg.role,
            content: msg.content,
            model: msg.model,
            status: msg.status,
            model_params: msg.model_params,
            attachment_ids: msg.attachment_ids,
            model_response: msg.model_response,
            created_at: msg.created_at.to_chrono(),
            updated_at: msg.updated_at.to_chrono(),
        }
    }
}

impl From<Attachment> for MongoAttachment {
    fn from(a: Attachment) -> Self {
        Self {
            attachment_id: a.attachment_id,
            user_id: a.user_id,
            message_id: a.message_id,
            attachment_url: a.attachment_url,
            file_name: a.file_name,
            file_type: a.file_type,
            // BSON has no unsigned integers
            file_size: i64::try_from(a.file_size).unwrap_or(i64::MAX),
            file_key: a.file_key,
            created_at: DateTime::from_chrono(a.created_at),
        }
    }
}

impl From<MongoAttachment> for Attachment {
    fn from(a: MongoAttachment) -> Self {
        Self {
            attachment_id: a.attachment_id,
            user_id: a.user_id,
            message_id: a.message_id,
            attachment_url: a.attachment_url,
            file_name: a.file_name,
            file_type: a.file_type,
            file_size: u64::try_from(a.file_size).unwrap_or(0),
            file_key: a.file_key,
            created_at: a.created_at.to_chrono(),
        }
    }
}

impl From<SharedChat> for MongoSharedChat {
    fn from(s: SharedChat) -> Self {
        Self {
            share_id: s.share_id,
            thread_id: s.thread_id,
            owner_id: s.owner_id,
            title: s.title,
            is_public: s.is_public,
            created_at: DateTime::from_chrono(s.created_at),
            expires_at: s.expires_at.map(DateTime::from_chrono),
        }
    }
}

impl From<MongoSharedChat> for SharedChat {
    fn from(s: MongoSharedChat) -> Self {
        Self {
            share_id: s.share_id,
            thread_id: s.thread_id,
            owner_id: s.owner_id,
            title: s.title,
            is_public: s.is_public,
            created_at: s.created_at.to_chrono(),
            expires_at: s.expires_at.map(|d| d.to_chrono()),
        }
    }
}
