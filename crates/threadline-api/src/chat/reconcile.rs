use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use threadline_persist::{MessagePatch, MessageStatus, PersistenceClient, Result, ThreadStatus};
use tokio::task::JoinHandle;

use crate::chat::turn::set_thread_status;

/// Close assistant placeholders that stopped moving, e.g. after a crash
/// between placeholder insert and finalize. Returns how many were closed.
pub async fn reconcile_stale_placeholders(
    persist: &dyn PersistenceClient,
    max_age: chrono::Duration,
) -> Result<usize> {
    let cutoff = Utc::now() - max_age;
    let stale = persist.find_stale_placeholders(cutoff).await?;

    let mut closed = 0;
    for message in stale {
        // A turn that finished after the scan no longer matches the guard
        let patch = MessagePatch::status(MessageStatus::Error).if_open();
        match persist
            .patch_message(&message.user_id, &message.message_id, patch)
            .await
        {
            Ok(_) => {
                closed += 1;
                set_thread_status(persist, &message.user_id, &message.thread_id, ThreadStatus::Error)
                    .await;
            }
            // Finished or deleted in the meantime
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
    }

    if closed > 0 {
        tracing::info!(count = closed, "Closed stale assistant placeholders");
    }
    Ok(closed)
}

pub fn spawn_reconciler(
    persist: Arc<dyn PersistenceClient>,
    interval: Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    let max_age = chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::days(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = reconcile_stale_placeholders(persist.as_ref(), max_age).await {
                tracing::warn!(error = %e, "Placeholder reconciliation failed");
            }
        }
    })
}
