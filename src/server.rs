//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/search?q=cat,dog` | Prefix search; JSON |
//! | `GET`  | `/files/{filename}` | Original media file |
//! | `GET`  | `/thumbs/{filename}` | Generated thumbnail |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Errors are plain text with a matching status: `400 Bad file name`,
//! `404 Not found`, `500 <message>`. A failing request never takes the
//! server down.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::error::CatalogError;
use crate::get::{resolve_path, FileKind};
use crate::search::{search, SearchResponse};
use crate::store::CatalogStore;

const CACHE_CONTROL: &str = "public, max-age=604800";

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn CatalogStore>,
}

/// Serve the catalog until the process is terminated.
pub async fn run_server(config: &Config, store: Arc<dyn CatalogStore>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(store);

    info!("listening on http://{}", bind_addr);
    println!("Listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes and CORS layer over `store`.
pub fn router(store: Arc<dyn CatalogStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search", get(handle_search))
        .route("/files/{filename}", get(handle_file))
        .route("/thumbs/{filename}", get(handle_thumb))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { store })
}

// ============ Error response ============

/// Plain-text error response.
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidFilename(_) => AppError {
                status: StatusCode::BAD_REQUEST,
                message: "Bad file name".to_string(),
            },
            CatalogError::NotFound(_) => AppError {
                status: StatusCode::NOT_FOUND,
                message: "Not found".to_string(),
            },
            other => {
                error!("request failed: {}", other);
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: format!("Failed: {}", other),
                }
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let outcome = search(state.store.as_ref(), &params.q).await?;
    Ok(Json(SearchResponse::from(&outcome)))
}

// ============ GET /files/{filename}, GET /thumbs/{filename} ============

async fn handle_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    serve_file(&state, &filename, FileKind::Original).await
}

async fn handle_thumb(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    serve_file(&state, &filename, FileKind::Thumbnail).await
}

async fn serve_file(state: &AppState, filename: &str, kind: FileKind) -> Result<Response, AppError> {
    let path = resolve_path(state.store.as_ref(), filename, kind).await?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // Thumbnail still pending, or its job failed.
            return Err(CatalogError::NotFound(path.display().to_string()).into());
        }
        Err(e) => return Err(CatalogError::Io(e).into()),
    };

    let content_type = content_type_for(&path);
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL)),
        ],
        bytes,
    )
        .into_response())
}

fn content_type_for(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("gif") => "image/gif",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}
