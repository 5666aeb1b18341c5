//! HTTP surface: `POST /analyze` plus static files.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::handler::HandlerWithoutStateExt;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::analyzer::Analyzer;
use crate::error::{AnalyzerError, ErrorKind};
use crate::intake;

/// Client-facing message for every intake failure.
pub const INVALID_REQUEST_MESSAGE: &str = "Empty or missing text.";

/// Client-facing message for every other failure.
pub const ANALYSIS_FAILED_MESSAGE: &str = "Failed to analyze text.";

const NOT_FOUND_MESSAGE: &str = "Not found.";
const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed.";

#[derive(Clone)]
pub struct ServerState {
    pub analyzer: Arc<Analyzer>,
}

impl IntoResponse for AnalyzerError {
    fn into_response(self) -> Response {
        match self.kind() {
            ErrorKind::InvalidRequest => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": INVALID_REQUEST_MESSAGE })),
            )
                .into_response(),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": ANALYSIS_FAILED_MESSAGE,
                    "detalle": self.to_string(),
                })),
            )
                .into_response(),
        }
    }
}

fn is_json_content(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

async fn analyze(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let result = match body {
        Err(rejection) => Err(AnalyzerError::InvalidRequest(format!(
            "could not read the request body: {}",
            rejection.body_text()
        ))),
        Ok(_) if !is_json_content(&headers) => Err(AnalyzerError::InvalidRequest(
            "expected an application/json body".to_string(),
        )),
        Ok(body) => intake::parse_body(&body),
    };

    let request = match result {
        Ok(request) => request,
        Err(e) => {
            info!("Rejected /analyze request: {}", e);
            return e.into_response();
        }
    };

    match state.analyzer.analyze(&request).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            match e.kind() {
                ErrorKind::BackendUnavailable => error!(kind = %e.kind(), "Analysis failed: {}", e),
                _ => warn!(kind = %e.kind(), "Analysis failed: {}", e),
            }
            e.into_response()
        }
    }
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": NOT_FOUND_MESSAGE })),
    )
        .into_response()
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": METHOD_NOT_ALLOWED_MESSAGE })),
    )
        .into_response()
}

/// Build the application router.
///
/// With `static_dir` set, every path other than `/analyze` is served from
/// that directory, and `/` resolves to its `index.html`. `/analyze` bodies
/// are not size-capped.
pub fn make_app(analyzer: Arc<Analyzer>, static_dir: Option<PathBuf>) -> Router {
    let state = ServerState { analyzer };

    let app = Router::new()
        .route(
            "/analyze",
            post(analyze).layer(DefaultBodyLimit::disable()),
        )
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state);

    let app = match static_dir {
        Some(dir) => {
            let static_files_service = ServeDir::new(dir)
                .append_index_html_on_directories(true)
                .not_found_service(not_found.into_service());
            app.fallback_service(static_files_service)
        }
        None => app.fallback(not_found),
    };

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve `app` on `addr` until Ctrl-C.
pub async fn run_server(app: Router, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
