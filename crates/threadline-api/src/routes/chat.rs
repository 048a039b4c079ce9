use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use threadline_llm::{ChatOptions, ChatRequest, UserKeys};
use threadline_persist::{MessageRole, ModelParams};
use utoipa::ToSchema;

use crate::{
    auth::AuthUser,
    chat::{
        image::{self, ImageTurnResponse},
        prompt::{build_messages, last_user_text, system_prompt},
        stream::into_sse,
        turn::attachment_record,
        ChatTurn, TurnRecord,
    },
    error::{ApiError, ApiResult, ErrorBody},
    routes::dto::ModelParamsBody,
    state::AppState,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChatMessageInput {
    #[schema(value_type = String, example = "user")]
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
}

/// A file previously returned by `POST /api/upload`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttachmentInput {
    #[serde(alias = "fileName")]
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub key: String,
}

impl AttachmentInput {
    fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Keys the caller brings for providers the server does not pay for
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ApiKeysInput {
    pub openrouter: Option<String>,
    pub openai: Option<String>,
    pub gemini: Option<String>,
}

impl From<ApiKeysInput> for UserKeys {
    fn from(keys: ApiKeysInput) -> Self {
        UserKeys {
            openrouter: keys.openrouter,
            openai: keys.openai,
            gemini: keys.gemini,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    pub user_id: String,
    pub thread_id: String,
    pub model: String,
    /// Full conversation as the client sees it; the last entry is the new user turn
    pub messages: Vec<ChatMessageInput>,
    #[serde(default)]
    pub model_params: ModelParamsBody,
    #[serde(default)]
    pub attachments: Vec<AttachmentInput>,
    #[serde(default)]
    pub api_keys: ApiKeysInput,
    #[serde(default)]
    pub is_theo_mode: bool,
    pub user_message_id: Option<String>,
    pub assistant_message_id: Option<String>,
}

impl ChatRequestBody {
    fn validate(&self) -> Result<(), ApiError> {
        if self.thread_id.trim().is_empty() {
            return Err(ApiError::Validation("threadId is required".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(ApiError::Validation("model is required".to_string()));
        }
        match self.messages.last() {
            None => Err(ApiError::Validation("messages must not be empty".to_string())),
            Some(last) if last.role != MessageRole::User => Err(ApiError::Validation(
                "the last message must come from the user".to_string(),
            )),
            Some(last) if last.content.trim().is_empty() && self.attachments.is_empty() => Err(
                ApiError::Validation("the last message has no content".to_string()),
            ),
            Some(_) => Ok(()),
        }
    }
}

fn message_id(client_id: &Option<String>) -> String {
    client_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn chat_options(params: &ModelParams) -> ChatOptions {
    ChatOptions {
        temperature: params.temperature,
        top_p: params.top_p,
        top_k: params.top_k,
        max_tokens: None,
        reasoning_effort: params.reasoning_effort.clone(),
    }
}

/// Run one chat turn
///
/// Text models answer with an SSE stream (`message`, `reasoning`, then one
/// `done` or `error`). Image models answer with a JSON body once the image
/// is stored.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequestBody,
    responses(
        (status = 200, description = "SSE stream for text models; stored image for image models", body = ImageTurnResponse),
        (status = 400, description = "Missing API key or invalid body", body = ErrorBody),
        (status = 401, description = "Provider rejected the API key", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<ChatRequestBody>,
) -> ApiResult<Response> {
    user.ensure_matches(&body.user_id)?;
    body.validate()?;

    let user_message_id = message_id(&body.user_message_id);
    let assistant_message_id = message_id(&body.assistant_message_id);
    let params: ModelParams = body.model_params.clone().into();

    let attachments = body
        .attachments
        .iter()
        .map(|a| {
            attachment_record(
                &user.user_id,
                &user_message_id,
                &a.url,
                &a.key,
                &a.name,
                &a.content_type,
                a.size,
            )
        })
        .collect();

    let record = TurnRecord {
        user_id: user.user_id.clone(),
        thread_id: body.thread_id.clone(),
        model: body.model.clone(),
        user_message_id,
        assistant_message_id,
        user_content: last_user_text(&body.messages).unwrap_or_default().to_string(),
        params: params.clone(),
        attachments,
    };
    let mut turn = ChatTurn::begin(Arc::clone(&state.persist), record)
        .await?
        .with_heartbeat(state.config.llm.heartbeat_interval());

    let user_keys: UserKeys = body.api_keys.clone().into();
    let route = match state.selector.select(&body.model, &user_keys) {
        Ok(route) => route,
        Err(e) => return Err(turn.reject(e.into()).await),
    };

    tracing::info!(
        thread_id = %body.thread_id,
        message_id = %turn.message_id(),
        provider = %route.provider,
        model = %route.model,
        "Chat turn routed"
    );

    if route.is_image() {
        let prompt = last_user_text(&body.messages).unwrap_or_default();
        return match image::generate(&state, &mut turn, &route, prompt).await {
            Ok(response) => Ok(Json(response).into_response()),
            Err(e) => Err(turn.reject(e).await),
        };
    }

    let client = match state.clients.chat_client(&route) {
        Ok(client) => client,
        Err(e) => return Err(turn.reject(e.into()).await),
    };

    let image_urls: Vec<String> = body
        .attachments
        .iter()
        .filter(|a| a.is_image())
        .map(|a| a.url.clone())
        .collect();
    let messages = build_messages(system_prompt(body.is_theo_mode), &body.messages, &image_urls);
    let request = ChatRequest::new(&route.model, messages).with_options(chat_options(&params));

    let events = match client.chat_stream(request).await {
        Ok(events) => events,
        Err(e) => return Err(turn.reject(e.into()).await),
    };

    Ok(into_sse(turn, events).into_response())
}
