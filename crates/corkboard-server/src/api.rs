//! HTTP boundary: a thin axum layer over the shared-storage facade.
//!
//! Handlers only parse the request, forward into [`SharedStorage`], and
//! serialize the returned record; every invariant lives in the store crate.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, Method},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use corkboard_store::{messages, sanitize, Message, MessageUpdate, SharedStorage, UploadFile};

use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<SharedStorage>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let max_upload_size = state.config.max_upload_size;

    Router::new()
        .route("/health", get(health_check))
        .route("/api/messages", get(list_messages))
        .route("/api/messages", post(post_message))
        .route("/api/messages/{id}", patch(update_message))
        .route("/api/messages/{id}", delete(delete_message))
        .route("/api/upload", post(post_upload))
        .route("/api/files", get(list_files))
        .route("/api/files/{name}", delete(delete_file))
        .route("/shared/{name}", get(get_shared_file))
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    name: String,
    version: &'static str,
}

#[derive(Deserialize)]
struct PostMessageRequest {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct DeleteFileResponse {
    deleted: bool,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_messages(State(state): State<AppState>) -> Json<Vec<Message>> {
    Json(state.storage.messages().read_all().await)
}

async fn post_message(
    State(state): State<AppState>,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<Message>, ServerError> {
    let text = req.text.unwrap_or_default();
    let message = state.storage.post_text(&text).await?;
    info!(id = message.id, "posted text message");
    Ok(Json(message))
}

async fn post_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Message>, ServerError> {
    let mut text: Option<String> = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("multipart error: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "text" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("failed to read field: {}", e)))?;
                text = Some(value);
            }
            "files" => {
                let name = field.file_name().unwrap_or("file").to_string();
                let mimetype = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("failed to read field: {}", e)))?;
                uploads.push(UploadFile {
                    data: data.to_vec(),
                    name,
                    mimetype,
                });
            }
            // Unknown fields are ignored rather than rejected.
            _ => {}
        }
    }

    let message = state.storage.post_upload(text.as_deref(), uploads).await?;
    info!(
        id = message.id,
        files = message.files.as_ref().map(Vec::len),
        "posted upload message"
    );
    Ok(Json(message))
}

async fn update_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<MessageUpdate>,
) -> Result<Json<Message>, ServerError> {
    let id = messages::parse_id(&id)?;
    let message = state.storage.messages().update_by_id(id, update).await?;
    Ok(Json(message))
}

async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ServerError> {
    let id = messages::parse_id(&id)?;
    let removed = state.storage.delete_message(id).await?;
    info!(id = removed.id, "deleted message");
    Ok(Json(removed))
}

async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<String>>, ServerError> {
    Ok(Json(state.storage.list_shared_names().await?))
}

async fn delete_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DeleteFileResponse>, ServerError> {
    let deleted = state.storage.files().delete(&name).await?;
    Ok(Json(DeleteFileResponse { deleted }))
}

async fn get_shared_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ServerError> {
    // Reject a hostile path parameter before touching the store at all.
    sanitize::validate_name(&name)?;

    let path = state.storage.files().resolve_path(&name)?;
    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServerError::FileNotFound(name));
        }
        Err(e) => return Err(corkboard_store::StoreError::from(e).into()),
    };

    // Serve with the mimetype the uploader declared, when we still know it.
    let mimetype = state
        .storage
        .messages()
        .read_all()
        .await
        .iter()
        .filter_map(|m| m.files.as_ref())
        .flatten()
        .find(|att| att.filename == name)
        .map(|att| att.mimetype.clone())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok(([(header::CONTENT_TYPE, mimetype)], data).into_response())
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
