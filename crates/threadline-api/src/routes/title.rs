use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use threadline_llm::{ChatOptions, ChatRequest, Message};
use utoipa::ToSchema;

use crate::{
    auth::AuthUser,
    chat::prompt::{clean_title, TITLE_PROMPT},
    error::{ApiError, ApiResult, ErrorBody},
    state::AppState,
};

const MAX_QUESTION_CHARS: usize = 2000;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TitleRequest {
    pub thread_id: String,
    pub user_id: String,
    /// First user message of the thread
    pub question: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TitleResponse {
    pub success: bool,
    pub title: String,
}

/// Summarize the first question into a thread title
#[utoipa::path(
    post,
    path = "/api/thread/title",
    request_body = TitleRequest,
    responses(
        (status = 200, description = "Title stored", body = TitleResponse),
        (status = 404, description = "Thread not found", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn generate_title(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<TitleRequest>,
) -> ApiResult<Json<TitleResponse>> {
    user.ensure_matches(&req.user_id)?;

    let question = req.question.trim();
    if question.is_empty() {
        return Err(ApiError::Validation("question is required".to_string()));
    }
    let question: String = question.chars().take(MAX_QUESTION_CHARS).collect();

    let route = state.selector.title_route(&state.config.llm.title_model)?;
    let client = state.clients.chat_client(&route)?;

    let request = ChatRequest::new(
        &route.model,
        vec![Message::system(TITLE_PROMPT), Message::human(question)],
    )
    .with_options(ChatOptions::new().temperature(0.3).max_tokens(30));

    let response = client.chat(request).await?;
    let title = clean_title(response.content.as_deref().unwrap_or_default());

    state
        .persist
        .update_thread_title(&user.user_id, &req.thread_id, &title)
        .await?;

    tracing::info!(thread_id = %req.thread_id, title = %title, "Thread title generated");

    Ok(Json(TitleResponse {
        success: true,
        title,
    }))
}
