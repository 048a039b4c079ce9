use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only link over a thread's messages.
/// Deleting a share never touches the thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedChat {
    pub share_id: String,
    pub thread_id: String,
    pub owner_id: String,
    pub title: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SharedChat {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }
}
