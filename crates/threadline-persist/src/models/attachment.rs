use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File stored in the bucket and recorded against one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub attachment_id: String,
    pub user_id: String,
    pub message_id: String,
    pub attachment_url: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub file_key: String,
    pub created_at: DateTime<Utc>,
}
