//! HTTP surface: thin handlers over the store
//!
//! Routes:
//!   GET    /api/files               list
//!   GET    /api/files/{name}        read
//!   PUT    /api/files/{name}        write (raw body)
//!   DELETE /api/files/{name}        delete
//!   POST   /api/files/{name}/rename {"newName": ...}
//!   POST   /api/files/{name}/share  -> {"publicId", "publicUrl"}
//!   DELETE /api/files/{name}/share
//!   GET    /public/{token}          unauthenticated public read
//!   GET    /healthz
//!
//! All store calls run on the blocking pool: every read/write pays two
//! PBKDF2 stretches, which would stall the async workers.

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use hn_core::config::ServerConfig;
use hn_core::{HnError, HnResult};
use hn_store::store::MAX_PLAINTEXT;
use hn_store::{FileStore, PublicLinkRegistry};

use crate::identity::trusted_identity;

#[derive(Clone)]
struct AppState {
    store: Arc<FileStore>,
    registry: Arc<PublicLinkRegistry>,
    identity_header: String,
    public_base_url: String,
}

pub async fn serve(
    config: &ServerConfig,
    store: Arc<FileStore>,
    registry: Arc<PublicLinkRegistry>,
) -> Result<()> {
    let state = AppState {
        store,
        registry,
        identity_header: config.identity_header.clone(),
        public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
    };

    let app = Router::new()
        .route("/api/files", get(list_files))
        .route(
            "/api/files/{name}",
            get(read_file).put(write_file).delete(delete_file),
        )
        .route("/api/files/{name}/rename", post(rename_file))
        .route(
            "/api/files/{name}/share",
            post(share_file).delete(unshare_file),
        )
        .route("/public/{token}", get(read_public))
        .route("/healthz", get(healthz))
        // Leave headroom above the store's own limit so an oversized
        // save gets the store's 400, not a bare 413.
        .layer(DefaultBodyLimit::max(MAX_PLAINTEXT + 4096))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .map_err(|e| anyhow::anyhow!("bind {}: {e}", config.listen))?;

    info!(addr = %config.listen, "http: listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("http server: {e}"))
}

/// Map a core error onto a status code. `Authentication` is logged as
/// a tamper warning but presented as 404, so the response does not
/// reveal whether a name exists with undecryptable content.
fn into_http(err: HnError) -> Response {
    let (status, msg) = match &err {
        HnError::InvalidInput(m) => (StatusCode::BAD_REQUEST, m.clone()),
        HnError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
        HnError::NotFound(_) => (StatusCode::NOT_FOUND, "not found".to_string()),
        HnError::Conflict(m) => (StatusCode::CONFLICT, format!("already exists: {m}")),
        HnError::Authentication => {
            tracing::warn!("stored blob failed authentication (tampering or key change)");
            (StatusCode::NOT_FOUND, "not found".to_string())
        }
        HnError::Config(m) | HnError::Internal(m) => {
            tracing::error!("request failed: {m}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            )
        }
    };
    (status, msg).into_response()
}

fn require_identity(state: &AppState, headers: &HeaderMap) -> Result<String, Response> {
    trusted_identity(headers, &state.identity_header)
        .ok_or_else(|| into_http(HnError::Unauthorized))
}

/// Run one store operation on the blocking pool.
async fn run_blocking<T, F>(f: F) -> HnResult<T>
where
    F: FnOnce() -> HnResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| HnError::Internal(format!("blocking task: {e}")))?
}

#[derive(Deserialize)]
struct RenameRequest {
    #[serde(rename = "newName")]
    new_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShareResponse {
    public_id: String,
    public_url: String,
}

async fn list_files(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let identity = match require_identity(&state, &headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let store = state.store.clone();
    match run_blocking(move || store.list(&identity)).await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => into_http(e),
    }
}

async fn read_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let identity = match require_identity(&state, &headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let store = state.store.clone();
    match run_blocking(move || store.read(&identity, &name)).await {
        Ok(content) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            content,
        )
            .into_response(),
        Err(e) => into_http(e),
    }
}

async fn write_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let identity = match require_identity(&state, &headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let store = state.store.clone();
    match run_blocking(move || store.write(&identity, &name, &body)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => into_http(e),
    }
}

async fn delete_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let identity = match require_identity(&state, &headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let store = state.store.clone();
    match run_blocking(move || store.delete(&identity, &name)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => into_http(e),
    }
}

async fn rename_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(req): Json<RenameRequest>,
) -> Response {
    let identity = match require_identity(&state, &headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let store = state.store.clone();
    match run_blocking(move || store.rename(&identity, &name, &req.new_name)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => into_http(e),
    }
}

async fn share_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let identity = match require_identity(&state, &headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let registry = state.registry.clone();
    match run_blocking(move || registry.share(&identity, &name)).await {
        Ok(grant) => {
            let public_url = format!("{}/public/{}", state.public_base_url, grant.public_id);
            Json(ShareResponse {
                public_id: grant.public_id,
                public_url,
            })
            .into_response()
        }
        Err(e) => into_http(e),
    }
}

async fn unshare_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let identity = match require_identity(&state, &headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let registry = state.registry.clone();
    match run_blocking(move || registry.unshare(&identity, &name)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => into_http(e),
    }
}

/// Unauthenticated read of a publicly shared file. Token validation and
/// the registry lookup happen before any decryption work.
async fn read_public(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    let registry = state.registry.clone();
    let store = state.store.clone();
    match run_blocking(move || {
        let target = registry.resolve(&token)?;
        store.read(&target.user_id, &target.name)
    })
    .await
    {
        Ok(content) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            content,
        )
            .into_response(),
        Err(e) => into_http(e),
    }
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
