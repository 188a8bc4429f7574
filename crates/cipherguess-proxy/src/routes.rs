//! HTTP routes and handlers

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cipherguess_core::{ClassificationRequest, GuessEnvelope, GuessError};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::config::OrchestratorConfig;
use crate::orchestrator::Orchestrator;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Prefix the web frontend uses for the API routes
pub const API_PREFIX: &str = "/api/crypto";

const AVAILABLE_ENDPOINTS: &[&str] = &[
    "GET /",
    "GET /health",
    "GET /algorithms",
    "POST /guess",
    "GET /metrics",
    "GET /api/crypto/health",
    "GET /api/crypto/algorithms",
    "POST /api/crypto/guess",
];

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,

    /// Prometheus handle, present when the binary installed a recorder
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            metrics_handle: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check).fallback(not_found))
        .route("/algorithms", get(algorithms).fallback(not_found))
        .route("/guess", post(guess).fallback(not_found))
}

/// Routes only, without middleware.
///
/// A known path hit with the wrong method gets the same JSON 404 as an
/// unknown path.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).fallback(not_found))
        .route("/metrics", get(render_metrics).fallback(not_found))
        .merge(api_routes())
        .nest(API_PREFIX, api_routes())
        .fallback(not_found)
        .with_state(state)
}

/// Full application: routes plus CORS, body limit, request tracing and panic recovery
pub fn build_app(state: AppState, config: &OrchestratorConfig) -> anyhow::Result<Router> {
    let origin = HeaderValue::from_str(config.frontend_origin())?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Ok(create_router(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic)))
}

async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "Crypto Guessing Backend API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "algorithms": "/algorithms",
            "predict": "/guess"
        }
    }))
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

async fn health_check(State(state): State<AppState>) -> Response {
    metrics::counter!("cipherguess_requests_total", "endpoint" => "health").increment(1);

    let health = state.orchestrator.check_health().await;
    let status = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(health)).into_response()
}

async fn algorithms(State(state): State<AppState>) -> Response {
    metrics::counter!("cipherguess_requests_total", "endpoint" => "algorithms").increment(1);

    match state.orchestrator.list_algorithms().await {
        Ok(payload) => Json(payload).into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch supported algorithms" })),
        )
            .into_response(),
    }
}

#[tracing::instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
async fn guess(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<GuessEnvelope>, AppError> {
    metrics::counter!("cipherguess_requests_total", "endpoint" => "guess").increment(1);

    let body = body.map_err(AppError::Body)?;
    let request = if is_form(&headers) {
        decode_form(&body)
    } else {
        ClassificationRequest::from_body(&body)?
    };
    let envelope = state.orchestrator.submit_classification(&request).await?;

    Ok(Json(envelope))
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
}

/// Decode a `ciphertext=...` form post; the first `ciphertext` field wins
fn decode_form(body: &[u8]) -> ClassificationRequest {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "ciphertext")
        .map(|(_, value)| ClassificationRequest::new(value.into_owned()))
        .unwrap_or_default()
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "available_endpoints": AVAILABLE_ENDPOINTS,
        })),
    )
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    error!("Server error: {}", message);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal server error",
            "message": message,
        })),
    )
        .into_response()
}

/// Error handling for `/guess`
#[derive(Debug)]
pub enum AppError {
    /// The body could not be read, e.g. it exceeds [`MAX_BODY_BYTES`]
    Body(BytesRejection),
    Guess(GuessError),
}

impl From<GuessError> for AppError {
    fn from(err: GuessError) -> Self {
        Self::Guess(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = match self {
            Self::Body(rejection) => {
                return (
                    rejection.status(),
                    Json(json!({
                        "error": "Invalid request body",
                        "message": rejection.body_text(),
                    })),
                )
                    .into_response();
            }
            Self::Guess(err) => err,
        };

        let status = StatusCode::from_u16(err.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match err {
            GuessError::Validation(message) => json!({ "error": message }),
            GuessError::BackendUnreachable { url, reason } => json!({
                "error": "ML prediction service is unavailable",
                "details": format!(
                    "Please ensure the ML service is running at {} ({})",
                    url, reason
                ),
            }),
            GuessError::Backend(failure) => json!({
                "error": "Failed to predict algorithm",
                "details": failure.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
