mod client;
pub mod models;
pub mod repositories;

pub use client::MongoPersistenceClient;

/// Server error code for a unique index violation
pub(crate) const DUPLICATE_KEY: i32 = 11000;

pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}
