//! HTTP interface: live trips, stored history and a health check.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::ingest::{IngestError, Ingestor};
use crate::model::{EnrichedTrip, StoredTrip};

#[derive(Clone)]
pub struct AppState {
    ingestor: Arc<Ingestor>,
}

/// Failure of a request, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Ingest(IngestError),
    Internal(anyhow::Error),
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        ApiError::Ingest(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Ingest(e @ (IngestError::Fetch(_) | IngestError::Decode(_))) => {
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            ApiError::Ingest(e @ IngestError::Store(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")),
        };
        error!(status = status.as_u16(), error = %message, "Request failed");

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn create_router(ingestor: Arc<Ingestor>) -> Router {
    let state = AppState { ingestor };
    Router::new()
        .route("/api/trips", get(get_trips))
        .route("/api/history", get(get_history))
        .route("/health", get(health))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serves the API on `listener` until Ctrl+C.
pub async fn serve(listener: TcpListener, ingestor: Arc<Ingestor>) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "Serving trip API");

    axum::serve(listener, create_router(ingestor))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    Ok(())
}

async fn get_trips(State(state): State<AppState>) -> Result<Json<Vec<EnrichedTrip>>, ApiError> {
    let result = state.ingestor.run_cycle().await?;
    Ok(Json(result.trips))
}

async fn get_history(State(state): State<AppState>) -> Result<Json<Vec<StoredTrip>>, ApiError> {
    let trips = state.ingestor.store().list_history().await?;
    Ok(Json(trips))
}

async fn health() -> &'static str {
    "OK"
}
