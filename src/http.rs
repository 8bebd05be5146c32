use crate::error::{Result, SchemascopeError};
use crate::neo4j::DbCredentials;
use crate::service::SchemaService;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// HTTP front end for [`SchemaService`]
pub struct HttpServer {
    service: Arc<SchemaService>,
    allowed_origins: Vec<String>,
}

/// Body of `POST /api/label-info`
#[derive(Debug, Deserialize)]
pub struct LabelInfoRequest {
    pub labels: Vec<String>,
}

impl HttpServer {
    pub fn new(service: Arc<SchemaService>, allowed_origins: Vec<String>) -> Self {
        Self {
            service,
            allowed_origins,
        }
    }

    /// Run the HTTP server
    pub async fn run(&self, host: &str, port: u16) -> Result<()> {
        let app = self.router();

        let addr = format!("{}:{}", host, port);
        log::info!("Starting HTTP server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            SchemascopeError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to bind to {}: {}. Set http_server.port in config.toml to use another port.",
                    addr, e
                ),
            ))
        })?;

        axum::serve(listener, app).await.map_err(|e| {
            SchemascopeError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP server error: {}", e),
            ))
        })?;

        Ok(())
    }

    /// Create the axum router
    pub fn router(&self) -> Router {
        // No origins configured: allow any (local development)
        let cors = if self.allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/api/nodes", post(handle_refresh))
            .route("/api/label-info", post(handle_label_info))
            .route("/api/schema", post(handle_schema))
            .route("/health", get(handle_health))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(Arc::clone(&self.service))
    }
}

/// Credentials are optional; an absent or empty body means "use the defaults".
fn credentials_from_body(body: &[u8]) -> std::result::Result<DbCredentials, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DbCredentials::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": format!("Invalid JSON: {}", e)})),
        )
            .into_response()
    })
}

/// Handle `POST /api/nodes`: run a full fetch cycle
async fn handle_refresh(State(service): State<Arc<SchemaService>>, body: axum::body::Bytes) -> Response {
    let credentials = match credentials_from_body(&body) {
        Ok(c) => c,
        Err(response) => return response,
    };

    match service.refresh_aggregate(&credentials).await {
        Ok(aggregate) => (StatusCode::OK, Json(aggregate)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Handle `POST /api/schema`: schema only
async fn handle_schema(State(service): State<Arc<SchemaService>>, body: axum::body::Bytes) -> Response {
    let credentials = match credentials_from_body(&body) {
        Ok(c) => c,
        Err(response) => return response,
    };

    match service.describe_schema(&credentials).await {
        Ok(schema) => (StatusCode::OK, Json(schema)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Handle `POST /api/label-info`
async fn handle_label_info(
    State(service): State<Arc<SchemaService>>,
    body: axum::body::Bytes,
) -> Response {
    let request: LabelInfoRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": format!("Invalid JSON: {}", e)})),
            )
                .into_response();
        }
    };

    match service.get_label_info(&request.labels).await {
        Ok(infos) => (StatusCode::OK, Json(infos)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Handle health check endpoint
async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "schemascope",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
        .into_response()
}

/// The single translation from service errors to HTTP responses.
fn error_response(e: SchemascopeError) -> Response {
    let (status, error) = match &e {
        SchemascopeError::AggregateNotFound | SchemascopeError::MalformedAggregate(_) => {
            (StatusCode::NOT_FOUND, "no schema available yet")
        }
        SchemascopeError::Connection(_) | SchemascopeError::Query(_) => {
            (StatusCode::BAD_GATEWAY, "Graph store error")
        }
        SchemascopeError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
    };

    if status.is_server_error() {
        log::error!("Request failed: {}", e);
    } else {
        log::warn!("Request rejected: {}", e);
    }

    (
        status,
        Json(serde_json::json!({
            "error": error,
            "details": e.to_string()
        })),
    )
        .into_response()
}
