use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[cfg(feature = "mongodb")]
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON serialization error: {0}")]
    BsonSerialization(#[from] bson::ser::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON deserialization error: {0}")]
    BsonDeserialization(#[from] bson::de::Error),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Message id already in use: {0}")]
    MessageConflict(String),

    #[error("Shared chat not found: {0}")]
    ShareNotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PersistError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ThreadNotFound(_) | Self::MessageNotFound(_) | Self::ShareNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
