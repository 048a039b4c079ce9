use utoipa::OpenApi;

use crate::{
    chat::image::ImageTurnResponse,
    error::ErrorBody,
    routes::{
        chat::{ApiKeysInput, AttachmentInput, ChatMessageInput, ChatRequestBody},
        dto::{AttachmentView, MessageView, ModelParamsBody, ShareView, ThreadView},
        health::{HealthResponse, ServiceStatus},
        shares::{CreateShareRequest, SharedChatView},
        title::{TitleRequest, TitleResponse},
        upload::{UploadResponse, UploadedFile},
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::chat::chat,
        crate::routes::title::generate_title,
        crate::routes::upload::upload_files,
        crate::routes::threads::list_threads,
        crate::routes::threads::get_thread,
        crate::routes::threads::delete_thread,
        crate::routes::threads::list_messages,
        crate::routes::shares::create_share,
        crate::routes::shares::list_shares,
        crate::routes::shares::get_share,
        crate::routes::shares::delete_share,
    ),
    components(schemas(
        ErrorBody,
        ChatRequestBody,
        ChatMessageInput,
        AttachmentInput,
        ApiKeysInput,
        ModelParamsBody,
        ImageTurnResponse,
        TitleRequest,
        TitleResponse,
        UploadResponse,
        UploadedFile,
        ThreadView,
        MessageView,
        AttachmentView,
        ShareView,
        SharedChatView,
        CreateShareRequest,
        HealthResponse,
        ServiceStatus,
    )),
    tags(
        (name = "health", description = "Liveness and dependencies"),
        (name = "chat", description = "Chat turns"),
        (name = "threads", description = "Thread history"),
        (name = "uploads", description = "Image uploads"),
        (name = "shares", description = "Read-only share links"),
    ),
    info(
        title = "Threadline API",
        description = "Multi-provider chat backend"
    )
)]
pub struct ApiDoc;
