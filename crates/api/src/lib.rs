pub mod config;
pub mod error;

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use clonchat_core::{respond, ProcessMessageRequest, ProcessMessageResponse};
use clonchat_observability::AppMetrics;
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use crate::config::{ConfigError, ServiceConfig};
pub use crate::error::ApiError;

pub const SERVICE_NAME: &str = "chatbot";
pub const SERVICE_VERSION: &str = "1.0.0";

const MAX_BODY_BYTES: usize = 64 * 1024;
const ANALYZE_INTENT_PLACEHOLDER: &str = "Intent analysis endpoint - to be implemented";

#[derive(Clone)]
pub struct ApiState {
    pub metrics: Arc<AppMetrics>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct AnalyzeIntentParams {
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnalyzeIntentResponse {
    message: &'static str,
    input: String,
}

pub fn build_app() -> Router {
    build_router(ApiState {
        metrics: AppMetrics::shared(),
    })
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route(
            "/process-message",
            post(process_message).layer(catch_processing_panics(state.metrics.clone())),
        )
        .route("/analyze-intent", post(analyze_intent))
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            service: SERVICE_NAME,
            version: SERVICE_VERSION,
        }),
    )
}

async fn metrics(State(state): State<ApiState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.metrics.snapshot()))
}

async fn process_message(
    State(state): State<ApiState>,
    payload: Result<Json<ProcessMessageRequest>, JsonRejection>,
) -> Result<Json<ProcessMessageResponse>, ApiError> {
    let Json(request) = payload?;
    let started = Instant::now();

    let response = respond(&request);
    state
        .metrics
        .record_reply(response.detected_intent, started.elapsed());

    info!(
        session_id = %request.session_id,
        business_id = request.business_id,
        intent = %response.detected_intent,
        history_turns = request.conversation_history.len(),
        "message processed"
    );

    Ok(Json(response))
}

/// `message` may arrive as a query parameter or in a JSON body.
async fn analyze_intent(
    query: Result<Query<AnalyzeIntentParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<AnalyzeIntentResponse>, ApiError> {
    let Query(params) = query?;
    let message = match params.message {
        Some(message) => message,
        None => serde_json::from_slice::<AnalyzeIntentParams>(&body)
            .ok()
            .and_then(|params| params.message)
            .ok_or(ApiError::MissingField("message"))?,
    };

    Ok(Json(AnalyzeIntentResponse {
        message: ANALYZE_INTENT_PLACEHOLDER,
        input: message,
    }))
}

fn catch_processing_panics(
    metrics: Arc<AppMetrics>,
) -> CatchPanicLayer<impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone + Send + Sync + 'static>
{
    CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
        let reason = panic_reason(panic.as_ref());
        metrics.inc_processing_error();
        error!(reason = %reason, "message processing failed");
        ApiError::Processing(reason).into_response()
    })
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown error".to_string()
    }
}

// Any origin is accepted. Origins, methods and headers are mirrored because
// wildcards cannot be combined with credentials.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
