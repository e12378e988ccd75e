//! HTTP server implementation with chunked file streaming

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::io::AsyncRead;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::RetrieveError;
use crate::state::ServerState;

/// Route of the download endpoint
pub const FILE_ROUTE: &str = "/get_my_file";

/// File server API for managing the HTTP server
#[derive(Clone)]
pub struct FileServerApi {
    state: ServerState,
}

impl FileServerApi {
    /// Create a new file server API
    ///
    /// # Arguments
    /// * `state` - Shared state holding the base directory and chunk size
    pub fn new(state: ServerState) -> Self {
        Self { state }
    }

    /// Get the server state
    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Create the axum router with all routes configured
    pub fn router(&self) -> Router {
        Router::new()
            .route(FILE_ROUTE, get(get_my_file))
            .route("/", get(root))
            .route("/health", get(health_check))
            .with_state(self.state.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
    }

    /// Start the file server and run until Ctrl-C or SIGTERM
    ///
    /// # Arguments
    /// * `host` - Host to bind to (e.g., "0.0.0.0")
    /// * `port` - Port to bind to (e.g., 8080)
    pub async fn serve(self, host: &str, port: u16) -> crate::Result<()> {
        let addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&addr).await?;
        self.serve_on(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `signal` resolves
    ///
    /// In-flight downloads are allowed to finish before this returns.
    pub async fn serve_on<F>(self, listener: TcpListener, signal: F) -> crate::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("File server listening on {}", listener.local_addr()?);
        tracing::info!(
            "Serving files from {}",
            self.state.retriever().base_dir().display()
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("File server stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received");
}

/// Query string of the download endpoint
#[derive(Debug, Deserialize)]
pub struct FileQuery {
    /// Path relative to the server root
    pub file_path: String,
}

/// Payload of `/`
#[derive(Debug, Serialize)]
pub struct ApiInfo {
    pub message: &'static str,
    pub endpoints: &'static [&'static str],
}

/// Payload of `/health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// API information endpoint
async fn root() -> Json<ApiInfo> {
    Json(ApiInfo {
        message: "File Server API is running",
        endpoints: &[FILE_ROUTE],
    })
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// Download a file, streamed back with chunked transfer encoding
async fn get_my_file(
    State(state): State<ServerState>,
    Query(query): Query<FileQuery>,
) -> Result<Response, RetrieveError> {
    let stream = state.retriever().retrieve(&query.file_path).await?;

    tracing::info!(
        "Streaming {} ({} bytes, {})",
        query.file_path,
        stream.len(),
        stream.content_type()
    );

    let content_type = stream.content_type().to_string();
    let disposition = content_disposition(stream.file_name());
    let body = chunked_body(stream.into_file(), state.chunk_size());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::TRANSFER_ENCODING, "chunked")
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONTENT_TYPE, content_type)
        .body(body)
        .map_err(|e| RetrieveError::Io(format!("Failed to build response: {}", e)))
}

/// Wrap a reader into a response body read `chunk_size` bytes at a time
///
/// The reader is owned by the body and dropped with it, whether the body was
/// sent in full or abandoned after a client disconnect.
pub fn chunked_body<R>(reader: R, chunk_size: usize) -> Body
where
    R: AsyncRead + Send + 'static,
{
    Body::from_stream(ReaderStream::with_capacity(reader, chunk_size))
}

fn is_quotable(c: char) -> bool {
    c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\'
}

/// Build an `attachment` disposition for `file_name`
///
/// Names that cannot sit inside a quoted header value get an ASCII fallback
/// plus an RFC 5987 `filename*` parameter carrying the exact name.
pub fn content_disposition(file_name: &str) -> HeaderValue {
    let value = if file_name.chars().all(is_quotable) {
        format!("attachment; filename=\"{}\"", file_name)
    } else {
        let fallback: String = file_name
            .chars()
            .map(|c| if is_quotable(c) { c } else { '_' })
            .collect();
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(file_name)
        )
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

impl IntoResponse for RetrieveError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!("File request failed: {}", self);
        } else {
            tracing::warn!("File request rejected ({}): {}", status.as_u16(), self);
        }

        (status, self.to_string()).into_response()
    }
}
