use bytes::Bytes;
use serde::Serialize;
use threadline_llm::{ImageRequest, Route};
use utoipa::ToSchema;

use crate::chat::turn::{attachment_record, ChatTurn};
use crate::error::ApiError;
use crate::state::AppState;

/// Body returned instead of an SSE stream for image models
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageTurnResponse {
    pub success: bool,
    pub message_id: String,
    pub attachment_id: String,
    pub attachment_url: String,
}

/// Generate one image, store it, and complete the assistant message with it
pub async fn generate(
    state: &AppState,
    turn: &mut ChatTurn,
    route: &Route,
    prompt: &str,
) -> Result<ImageTurnResponse, ApiError> {
    let client = state.clients.image_client(route)?;

    tracing::info!(
        provider = %route.provider,
        model = %route.model,
        message_id = %turn.message_id(),
        "Generating image"
    );
    let image = client
        .generate_image(ImageRequest::new(&route.model, prompt))
        .await?;

    let key = format!(
        "generated/{}/{}.{}",
        turn.user_id(),
        uuid::Uuid::new_v4(),
        image.extension()
    );
    let size = image.bytes.len() as u64;
    let url = state
        .storage
        .put_object(&key, Bytes::from(image.bytes), &image.mime_type)
        .await?;

    let file_name = key.rsplit('/').next().unwrap_or(key.as_str()).to_string();
    let attachment = attachment_record(
        turn.user_id(),
        turn.message_id(),
        &url,
        &key,
        &file_name,
        &image.mime_type,
        size,
    );
    let attachment_id = attachment.attachment_id.clone();
    state.persist.add_attachment(attachment).await?;

    turn.complete_with_attachment(attachment_id.clone()).await?;

    Ok(ImageTurnResponse {
        success: true,
        message_id: turn.message_id().to_string(),
        attachment_id,
        attachment_url: url,
    })
}
