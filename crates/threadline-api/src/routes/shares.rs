use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use threadline_persist::{MessageStatus, SharedChat};
use utoipa::ToSchema;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult, ErrorBody},
    routes::{
        dto::{MessageView, ShareView},
        threads::thread_messages,
    },
    state::AppState,
};

const MAX_EXPIRY_HOURS: i64 = 24 * 365;

fn default_public() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareRequest {
    pub thread_id: String,
    #[serde(default = "default_public")]
    pub is_public: bool,
    pub expires_in_hours: Option<i64>,
    /// Defaults to the thread title
    pub title: Option<String>,
}

/// What a share link shows: the share and the finished messages
#[derive(Debug, Serialize, ToSchema)]
pub struct SharedChatView {
    pub share: ShareView,
    pub messages: Vec<MessageView>,
}

#[utoipa::path(
    post,
    path = "/api/shares",
    request_body = CreateShareRequest,
    responses(
        (status = 201, description = "Share created", body = ShareView),
        (status = 404, description = "Thread not found", body = ErrorBody)
    ),
    tag = "shares"
)]
pub async fn create_share(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateShareRequest>,
) -> ApiResult<(StatusCode, Json<ShareView>)> {
    let thread = state
        .persist
        .get_thread(&user.user_id, &req.thread_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Thread {} not found", req.thread_id)))?;

    let expires_at = match req.expires_in_hours {
        Some(hours) if !(1..=MAX_EXPIRY_HOURS).contains(&hours) => {
            return Err(ApiError::Validation(format!(
                "expiresInHours must be between 1 and {}",
                MAX_EXPIRY_HOURS
            )));
        }
        Some(hours) => Some(Utc::now() + Duration::hours(hours)),
        None => None,
    };

    let title = req
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or(thread.title);

    let share = state
        .persist
        .create_shared_chat(SharedChat {
            share_id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread.thread_id,
            owner_id: user.user_id,
            title,
            is_public: req.is_public,
            created_at: Utc::now(),
            expires_at,
        })
        .await?;

    tracing::info!(share_id = %share.share_id, thread_id = %share.thread_id, "Share created");
    Ok((StatusCode::CREATED, Json(share.into())))
}

#[utoipa::path(
    get,
    path = "/api/shares",
    responses(
        (status = 200, description = "Shares owned by the caller", body = Vec<ShareView>)
    ),
    tag = "shares"
)]
pub async fn list_shares(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<ShareView>>> {
    let shares = state.persist.list_shared_chats(&user.user_id).await?;
    Ok(Json(shares.into_iter().map(ShareView::from).collect()))
}

/// Read-only view of a shared thread. Public shares need no session.
#[utoipa::path(
    get,
    path = "/api/shares/{share_id}",
    params(("share_id" = String, Path, description = "Share id")),
    responses(
        (status = 200, description = "Shared chat", body = SharedChatView),
        (status = 404, description = "Missing, expired or private share", body = ErrorBody)
    ),
    tag = "shares"
)]
pub async fn get_share(
    State(state): State<Arc<AppState>>,
    viewer: Option<AuthUser>,
    Path(share_id): Path<String>,
) -> ApiResult<Json<SharedChatView>> {
    let not_found = || ApiError::NotFound(format!("Share {} not found", share_id));

    let share = state
        .persist
        .get_shared_chat(&share_id)
        .await?
        .ok_or_else(not_found)?;

    if share.is_expired(Utc::now()) {
        return Err(not_found());
    }
    // Private shares look missing to everyone but the owner
    let is_owner = viewer.is_some_and(|v| v.user_id == share.owner_id);
    if !share.is_public && !is_owner {
        return Err(not_found());
    }
    if state
        .persist
        .get_thread(&share.owner_id, &share.thread_id)
        .await?
        .is_none()
    {
        return Err(not_found());
    }

    let messages = thread_messages(&state, &share.owner_id, &share.thread_id)
        .await?
        .into_iter()
        .filter(|m| m.status == MessageStatus::Completed.as_str())
        .collect();

    Ok(Json(SharedChatView {
        share: share.into(),
        messages,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/shares/{share_id}",
    params(("share_id" = String, Path, description = "Share id")),
    responses(
        (status = 204, description = "Share deleted"),
        (status = 404, description = "Share not found", body = ErrorBody)
    ),
    tag = "shares"
)]
pub async fn delete_share(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(share_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .persist
        .delete_shared_chat(&user.user_id, &share_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
