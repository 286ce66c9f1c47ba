use crate::core::service::TriageService;
use crate::domain::model::{TriageDecision, TriageRequest};
use crate::domain::ports::AuditSink;
use crate::utils::error::TriageError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub const SERVICE_NAME: &str = "TriageFlow API";

/// Shared state for the HTTP handlers.
pub struct AppState<A: AuditSink> {
    backend: Backend<A>,
}

enum Backend<A: AuditSink> {
    Ready(Arc<TriageService<A>>),
    Unavailable(Arc<str>),
}

impl<A: AuditSink> Clone for AppState<A> {
    fn clone(&self) -> Self {
        let backend = match &self.backend {
            Backend::Ready(service) => Backend::Ready(Arc::clone(service)),
            Backend::Unavailable(reason) => Backend::Unavailable(Arc::clone(reason)),
        };
        Self { backend }
    }
}

impl<A: AuditSink + 'static> AppState<A> {
    pub fn ready(service: TriageService<A>) -> Self {
        Self {
            backend: Backend::Ready(Arc::new(service)),
        }
    }

    /// The pipeline could not be constructed; `/triage` answers 503 with `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            backend: Backend::Unavailable(Arc::from(reason.into())),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.backend, Backend::Ready(_))
    }

    pub fn service(&self) -> Option<Arc<TriageService<A>>> {
        match &self.backend {
            Backend::Ready(service) => Some(Arc::clone(service)),
            Backend::Unavailable(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRes {
    pub status: String,
    pub service: String,
    pub version: String,
    pub reasoning_configured: bool,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unavailable(String),
    Internal(String),
}

impl From<TriageError> for ApiError {
    fn from(e: TriageError) -> Self {
        match e {
            TriageError::ValidationError { message } => ApiError::BadRequest(message),
            e if e.is_unavailable() => ApiError::Unavailable(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

// Malformed body, wrong content type: still a client error in the usual shape.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::Unavailable(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Triage service unavailable: {}", detail),
            ),
            ApiError::Internal(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {}", detail),
            ),
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

pub fn router<A: AuditSink + 'static>(state: AppState<A>) -> Router {
    Router::new()
        .route("/", get(health::<A>))
        .route("/health", get(health::<A>))
        .route("/triage", post(triage::<A>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health<A: AuditSink + 'static>(State(state): State<AppState<A>>) -> Json<HealthRes> {
    Json(HealthRes {
        status: "operational".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        reasoning_configured: state.is_ready(),
    })
}

async fn triage<A: AuditSink + 'static>(
    State(state): State<AppState<A>>,
    payload: std::result::Result<Json<TriageRequest>, JsonRejection>,
) -> Result<Json<TriageDecision>, ApiError> {
    let Json(request) = payload?;
    let service = match &state.backend {
        Backend::Ready(service) => Arc::clone(service),
        Backend::Unavailable(reason) => return Err(ApiError::Unavailable(reason.to_string())),
    };

    // Own task: a client disconnect must not cut the run short mid-audit.
    let decision = tokio::spawn(async move { service.assess(request).await })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(decision))
}
