//! State and health endpoints.

use axum::{
    body::Bytes,
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use time::OffsetDateTime;
use utoipa::{OpenApi, ToSchema};

use crate::{
    error::{Error, Result},
    store::{StateRecord, StateStore},
    tracing::prelude::*,
};

/// Message returned for failures that are not the caller's fault.
pub const INTERNAL_FAILURE: &str = "internal failure";

/// Shared application state for API endpoints.
#[derive(Clone)]
pub struct AppState {
    /// The single state store, shared by all requests
    pub store: Arc<StateStore>,
}

impl AppState {
    /// Create application state around a store.
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    // Store operations are synchronous file I/O; keep them off the async
    // worker threads.
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&StateStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store)).await?
    }
}

/// Set state request payload.
///
/// Only used to document the endpoint; the handler reads the body as
/// untyped JSON so that it can coerce `count` itself.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct WriteRequest {
    /// New color as `#RRGGBB`
    #[schema(example = "#00ff00")]
    pub color: String,
    /// New LED count, 0 to 8
    #[schema(minimum = 0, maximum = 8)]
    pub count: u8,
}

/// Successful write response: `ok` plus the new record.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct WriteSuccess {
    /// Always true
    pub ok: bool,
    #[serde(flatten)]
    pub state: StateRecord,
}

/// Failed request response.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct Failure {
    /// Always false
    pub ok: bool,
    /// Human-readable reason
    pub error: String,
}

impl Failure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: String,
    /// Server time (UTC)
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub time: OffsetDateTime,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Validation(e) => {
                debug!(reason = %e, "Rejected state write");
                (StatusCode::BAD_REQUEST, Json(Failure::new(e.to_string()))).into_response()
            }
            other => {
                error!(error = %other, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(Failure::new(INTERNAL_FAILURE)),
                )
                    .into_response()
            }
        }
    }
}

/// Get state endpoint handler.
///
/// Polled by the LED device and read by the front-end on page load. Always
/// answers with a complete record; missing or corrupt storage is replaced
/// by the default record.
///
/// # Example
/// ```bash
/// curl http://localhost:5000/api/state
/// ```
#[utoipa::path(
    get,
    path = "/api/state",
    tag = "state",
    responses(
        (status = 200, description = "Current LED state", body = StateRecord),
        (status = 500, description = "Internal failure", body = Failure),
    )
)]
pub async fn get_state(State(state): State<AppState>) -> Result<Json<StateRecord>> {
    let loaded = state.with_store(|store| Ok(store.load())).await?;
    trace!(rev = loaded.record.rev, outcome = ?loaded.outcome, "State read");
    Ok(Json(loaded.record))
}

/*  Set state endpoint handler.

    Called by the front-end when the user changes the color or LED count.
    A body that is not a JSON object is treated as an empty one, which fails
    validation on the color.

    # Example

    curl -X POST http://localhost:5000/api/state \
       -H "Content-Type: application/json" \
       -d '{"color": "#00ff00", "count": 3}'
*/
#[utoipa::path(
    post,
    path = "/api/state",
    tag = "state",
    request_body = WriteRequest,
    responses(
        (status = 200, description = "State updated", body = WriteSuccess),
        (status = 400, description = "Invalid color or count", body = Failure),
        (status = 500, description = "State could not be saved", body = Failure),
    )
)]
pub async fn set_state(State(state): State<AppState>, body: Bytes) -> Result<Json<WriteSuccess>> {
    let (color, count) = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(mut payload)) => (payload.remove("color"), payload.remove("count")),
        _ => (None, None),
    };

    debug!(color = ?color, count = ?count, "API request to set state");

    let record = state
        .with_store(move |store| store.apply_write(color.as_ref(), count.as_ref()))
        .await?;

    Ok(Json(WriteSuccess {
        ok: true,
        state: record,
    }))
}

/// Health check endpoint handler.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses((status = 200, description = "Server is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        time: OffsetDateTime::now_utc(),
    })
}

/// OpenAPI description of the endpoints.
#[derive(OpenApi)]
#[openapi(
    paths(get_state, set_state, health),
    components(schemas(StateRecord, WriteRequest, WriteSuccess, Failure, HealthResponse)),
    tags(
        (name = "state", description = "Shared LED state"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

/// Build the routes mounted under `/api`.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/state", get(get_state).post(set_state))
        .route("/health", get(health))
        .with_state(state)
}
