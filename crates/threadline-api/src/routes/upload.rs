use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::AuthUser,
    config::UploadConfig,
    error::{ApiError, ApiResult, ErrorBody},
    state::AppState,
};

const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    pub url: String,
    pub key: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
}

struct PendingFile {
    name: String,
    content_type: String,
    bytes: Bytes,
}

/// Upload a batch of images
///
/// The whole batch is validated before anything is written, so a rejected
/// batch leaves the bucket untouched.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "One or more `files` parts"
    ),
    responses(
        (status = 200, description = "Files stored", body = UploadResponse),
        (status = 400, description = "Batch rejected", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody)
    ),
    tag = "uploads"
)]
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let rules = &state.config.upload;
    let mut pending = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if !matches!(field.name(), Some("files") | Some("files[]")) {
            continue;
        }
        if pending.len() == rules.max_files {
            return Err(ApiError::Validation(format!(
                "At most {} files can be uploaded at once",
                rules.max_files
            )));
        }

        let name = field.file_name().unwrap_or("file").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await?;
        pending.push(PendingFile {
            name,
            content_type,
            bytes,
        });
    }

    if pending.is_empty() {
        return Err(ApiError::Validation("No files provided".to_string()));
    }
    for file in &pending {
        validate_file(rules, file)?;
    }

    let mut uploaded = Vec::with_capacity(pending.len());
    for file in pending {
        let key = format!(
            "uploads/{}/{}-{}",
            user.user_id,
            uuid::Uuid::new_v4(),
            sanitize_file_name(&file.name)
        );
        let size = file.bytes.len() as u64;
        let url = state
            .storage
            .put_object(&key, file.bytes, &file.content_type)
            .await?;

        tracing::info!(user_id = %user.user_id, key = %key, size, "File uploaded");
        uploaded.push(UploadedFile {
            name: file.name,
            size,
            content_type: file.content_type,
            url,
            key,
        });
    }

    Ok(Json(UploadResponse { files: uploaded }))
}

fn validate_file(rules: &UploadConfig, file: &PendingFile) -> Result<(), ApiError> {
    if file.bytes.len() > rules.max_file_size_bytes {
        return Err(ApiError::Validation(format!(
            "{} exceeds the {} MB limit",
            file.name,
            rules.max_file_size_bytes / (1024 * 1024)
        )));
    }
    if !rules.allowed_types.iter().any(|t| t == &file.content_type) {
        return Err(ApiError::Validation(format!(
            "{} has unsupported type {}",
            file.name, file.content_type
        )));
    }
    Ok(())
}

/// Keep object keys to `[A-Za-z0-9._-]`
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_CHARS)
        .collect();

    if cleaned.trim_matches(['.', '_']).is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
