use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_THREAD_TITLE: &str = "New Chat";

/// Database-agnostic thread model.
///
/// `thread_id` is minted by the client; a thread is unique per
/// `(user_id, thread_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    pub user_id: String,
    pub model: String,
    pub title: String,
    pub status: ThreadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    Pending,
    Generating,
    Completed,
    Error,
}

impl ThreadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// Input of `ensure_thread`
#[derive(Debug, Clone)]
pub struct NewThread {
    pub thread_id: String,
    pub user_id: String,
    pub model: String,
    pub title: String,
}

impl NewThread {
    pub fn new(
        user_id: impl Into<String>,
        thread_id: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            user_id: user_id.into(),
            model: model.into(),
            title: DEFAULT_THREAD_TITLE.to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// The row this input becomes when no thread exists yet
    pub fn into_thread(self, now: DateTime<Utc>) -> Thread {
        Thread {
            thread_id: self.thread_id,
            user_id: self.user_id,
            model: self.model,
            title: self.title,
            status: ThreadStatus::Generating,
            created_at: now,
            updated_at: now,
        }
    }
}
