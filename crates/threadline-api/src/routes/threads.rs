use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult, ErrorBody},
    routes::dto::{MessageView, ThreadView},
    state::AppState,
};

const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListThreadsQuery {
    /// Page size, at most 100
    pub limit: Option<i64>,
}

/// List the caller's threads, most recently updated first
#[utoipa::path(
    get,
    path = "/api/threads",
    params(ListThreadsQuery),
    responses(
        (status = 200, description = "Threads of the caller", body = Vec<ThreadView>)
    ),
    tag = "threads"
)]
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ListThreadsQuery>,
) -> ApiResult<Json<Vec<ThreadView>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, MAX_LIMIT);
    let threads = state.persist.list_threads(&user.user_id, Some(limit)).await?;

    Ok(Json(threads.into_iter().map(ThreadView::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/threads/{thread_id}",
    params(("thread_id" = String, Path, description = "Thread id")),
    responses(
        (status = 200, description = "Thread", body = ThreadView),
        (status = 404, description = "Thread not found", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ThreadView>> {
    let thread = state
        .persist
        .get_thread(&user.user_id, &thread_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Thread {} not found", thread_id)))?;

    Ok(Json(thread.into()))
}

/// Delete a thread with its messages and attachment records
#[utoipa::path(
    delete,
    path = "/api/threads/{thread_id}",
    params(("thread_id" = String, Path, description = "Thread id")),
    responses(
        (status = 204, description = "Thread deleted"),
        (status = 404, description = "Thread not found", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(thread_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.persist.delete_thread(&user.user_id, &thread_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Messages of a thread in creation order, each with its attachments
#[utoipa::path(
    get,
    path = "/api/threads/{thread_id}/messages",
    params(("thread_id" = String, Path, description = "Thread id")),
    responses(
        (status = 200, description = "Messages", body = Vec<MessageView>),
        (status = 404, description = "Thread not found", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<Vec<MessageView>>> {
    if state.persist.get_thread(&user.user_id, &thread_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Thread {} not found", thread_id)));
    }

    let messages = thread_messages(&state, &user.user_id, &thread_id).await?;
    Ok(Json(messages))
}

/// Messages `user_id` wrote to the thread, with their attachments
pub(crate) async fn thread_messages(
    state: &AppState,
    user_id: &str,
    thread_id: &str,
) -> Result<Vec<MessageView>, ApiError> {
    let messages = state.persist.get_messages(user_id, thread_id).await?;
    let ids: Vec<String> = messages.iter().map(|m| m.message_id.clone()).collect();
    let attachments = if ids.is_empty() {
        Vec::new()
    } else {
        state.persist.get_attachments(user_id, &ids).await?
    };
    Ok(MessageView::with_attachments(messages, attachments))
}
