//! HTTP server for budget imports.
//!
//! # API Endpoints
//!
//! | Method | Path           | Description                              |
//! |--------|----------------|------------------------------------------|
//! | GET    | `/health`      | Health check                             |
//! | POST   | `/api/extract` | Upload a budget CSV (multipart `file`)   |
//! | GET    | `/api/logs`    | SSE stream for real-time logs            |

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, ExtractResponse};
use crate::config::ParserConfig;
use crate::enrich::enrich_with_config;
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::extract::extract_parsed;
use crate::parser::parse_grid_bytes;

type ApiError = (StatusCode, Json<Value>);

#[derive(Clone)]
struct AppState {
    config: Arc<ParserConfig>,
}

/// Router with every endpoint, sharing one immutable config.
pub fn router(config: ParserConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/extract", post(extract_upload))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(AppState {
            config: Arc::new(config),
        })
}

/// Start the HTTP server
pub async fn start_server(port: u16, config: ParserConfig) -> ServerResult<()> {
    let enrichment = config.enrichment.enabled;
    let app = router(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Budget import server running on http://localhost:{}", port);
    println!("   POST /api/extract - Upload budget CSV");
    println!("   GET  /api/logs    - SSE log stream");
    println!("   GET  /health      - Health check");
    if enrichment {
        println!();
        println!("🏷️  Classification enrichment enabled");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "budget-import",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "extract": "POST /api/extract",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip what they missed.
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn extract_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(ServerError::BadRequest(format!("Multipart error: {}", e))))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| reject(ServerError::BadRequest(format!("Read error: {}", e))))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| reject(ServerError::BadRequest("No file provided".to_string())))?;

    log_info(format!(
        "New upload: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let config = &state.config;
    let parsed = parse_grid_bytes(&bytes).map_err(|e| reject(PipelineError::from(e).into()))?;
    let mut result = extract_parsed(&parsed, config).map_err(|e| reject(e.into()))?;

    let relabeled = if config.enrichment.enabled {
        enrich_with_config(&mut result, &config.enrichment).await
    } else {
        None
    };

    Ok(Json(ExtractResponse::new(
        result,
        &parsed,
        file_name,
        config.low_confidence_threshold,
        relabeled,
    )))
}

/// Status code for a failed request.
fn status_for(error: &ServerError) -> StatusCode {
    match error {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(PipelineError::Grid(_)) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(PipelineError::Extraction(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        ServerError::Pipeline(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(error: ServerError) -> ApiError {
    log_error(error.to_string());
    (status_for(&error), Json(error_response(&error.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractionError, GridError};

    #[test]
    fn test_status_mapping() {
        let grid: ServerError = PipelineError::from(GridError::Empty).into();
        assert_eq!(status_for(&grid), StatusCode::BAD_REQUEST);

        let header: ServerError = PipelineError::from(ExtractionError::HeaderNotFound {
            rows_scanned: 3,
            best_score: 0,
        })
        .into();
        assert_eq!(status_for(&header), StatusCode::UNPROCESSABLE_ENTITY);

        let bad = ServerError::BadRequest("No file provided".to_string());
        assert_eq!(status_for(&bad), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_reject_body() {
        let (status, Json(body)) = reject(ServerError::BadRequest("No file provided".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().unwrap().contains("No file provided"));
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "budget-import");
    }

    #[test]
    fn test_router_builds() {
        let _ = router(ParserConfig::default());
    }
}
