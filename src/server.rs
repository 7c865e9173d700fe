use crate::document::analyze_document;
use crate::error::{RepoDigestError, Result};
use crate::orchestrator::{Orchestrator, Reply};
use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

/// Build the application router
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/analyze-github", post(analyze_github))
        .route("/api/analyze-file", post(analyze_file))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { orchestrator })
}

/// Bind `addr` and serve until the process is stopped
pub async fn serve(addr: &str, orchestrator: Arc<Orchestrator>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(orchestrator)).await?;
    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn analyze_github(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Reply {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            let err = RepoDigestError::InvalidBody(rejection.body_text());
            return state.orchestrator.error_reply(&err);
        }
    };

    // Missing or non-string url resolves like an empty reference
    let url = body.get("url").and_then(Value::as_str).unwrap_or_default();
    debug!(%url, "repository analysis requested");
    state.orchestrator.respond(url).await
}

async fn analyze_file(multipart: Multipart) -> Response {
    match read_file_field(multipart).await {
        Ok(Some((file_name, bytes))) => {
            let analysis = analyze_document(&file_name, &bytes);
            info!(
                file = %analysis.file_name,
                size = analysis.size,
                lines = analysis.stats.lines,
                "document analyzed"
            );
            Json(analysis).into_response()
        }
        Ok(None) => {
            warn!("upload without a file field");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid file upload" })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "could not read upload");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error",
                    "details": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// Name and bytes of the `file` field, if the form has one
async fn read_file_field(
    mut multipart: Multipart,
) -> std::result::Result<Option<(String, Vec<u8>)>, axum::extract::multipart::MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        // A plain text value is not a file upload
        let Some(file_name) = field.file_name().map(str::to_string) else {
            return Ok(None);
        };
        let bytes = field.bytes().await?;
        return Ok(Some((file_name, bytes.to_vec())));
    }
    Ok(None)
}
