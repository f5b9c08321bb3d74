//! HTTP API: upload, query and health endpoints over a [`RagPipeline`].

pub mod protocol;

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{AppError, IngestError, LoadError, QueryError, VectorStoreError};
use crate::models::Config;
use crate::services::{RagPipeline, build_pipeline};
use protocol::{ErrorBody, HealthResponse, QueryParams, QueryResponse, UploadResponse};

/// Headroom for multipart boundaries and part headers on top of the file limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(pipeline: RagPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Error response carrying a status and a `{"message": ..}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = self.status.as_u16(), error = %self.message, "request failed");
        }
        (
            self.status,
            Json(ErrorBody {
                message: self.message,
            }),
        )
            .into_response()
    }
}

fn store_status(err: &VectorStoreError) -> StatusCode {
    match err {
        VectorStoreError::ConnectionError(_)
        | VectorStoreError::CollectionError(_)
        | VectorStoreError::InsertError(_)
        | VectorStoreError::SearchError(_) => StatusCode::BAD_GATEWAY,
        VectorStoreError::DimensionMismatch { .. } | VectorStoreError::SnapshotError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        let status = match &err {
            IngestError::Load(LoadError::UnsupportedFormat(_))
            | IngestError::Load(LoadError::InvalidEncoding(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            IngestError::Load(LoadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            IngestError::Load(LoadError::IoError(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            IngestError::Embedding(_) | IngestError::CountMismatch { .. } => {
                StatusCode::BAD_GATEWAY
            }
            IngestError::VectorStore(e) => store_status(e),
        };
        Self::new(status, err.to_string())
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        let status = match &err {
            QueryError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            QueryError::Embedding(_) | QueryError::Generation(_) => StatusCode::BAD_GATEWAY,
            QueryError::VectorStore(e) => store_status(e),
        };
        Self::new(status, err.to_string())
    }
}

impl From<VectorStoreError> for ApiError {
    fn from(err: VectorStoreError) -> Self {
        Self::new(store_status(&err), err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

/// Build the router. `max_upload_bytes` bounds the uploaded file itself.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/query", post(query))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;

        let report = state.pipeline.ingest(&file_name, &bytes).await?;
        return Ok(Json(UploadResponse::ingested(report.chunks_added)));
    }

    Err(ApiError::bad_request("multipart field `file` is required"))
}

async fn query(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryResponse>, ApiError> {
    let question = params.question.unwrap_or_default();
    if question.trim().is_empty() {
        return Err(ApiError::bad_request("query parameter `question` must not be empty"));
    }

    let answer = state.pipeline.answer(&question).await?;
    Ok(Json(QueryResponse {
        question: answer.question,
        answer: answer.answer,
    }))
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let store = state.pipeline.store();
    let entries = store.count().await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        backend: store.name().to_string(),
        entries,
    }))
}

/// Build the pipeline from `config` and serve until Ctrl-C or SIGTERM.
pub async fn run(config: Config) -> Result<(), AppError> {
    let pipeline = build_pipeline(&config).await?;
    let max_upload = usize::try_from(config.indexing.max_file_size).unwrap_or(usize::MAX);
    let app = router(AppState::new(pipeline), max_upload);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, backend = %config.vector_store.driver, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
