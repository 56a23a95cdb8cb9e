//! HTTP API server.
//!
//! Serves the shared LED state to polling devices and accepts updates from
//! the front-end. Built on Axum. CORS is open to any origin because the
//! front-end is hosted separately from the API.

mod endpoints;

pub use endpoints::{
    ApiDoc, AppState, Failure, HealthResponse, WriteRequest, WriteSuccess, INTERNAL_FAILURE,
};

use axum::{routing::get, Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{config::Mode, error::Result, store::StateStore, tracing::prelude::*};

/// Path of the OpenAPI document, served in development mode.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Build the complete application router.
pub fn router(store: Arc<StateStore>, mode: Mode) -> Router {
    let mut app = Router::new().nest("/api", endpoints::routes(AppState::new(store)));

    if mode.is_debug() {
        app = app.route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    app.layer(cors).layer(TraceLayer::new_for_http())
}

/// Serve the API on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    store: Arc<StateStore>,
    mode: Mode,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, state_file = %store.path().display(), ?mode, "API listening.");
    info!("Device polls  http://<host>:{}/api/state", addr.port());

    axum::serve(listener, router(store, mode))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    trace!("API stopped.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DEFAULT_COLOR, INITIAL_REV};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app(dir: &TempDir, mode: Mode) -> (Router, Arc<StateStore>) {
        let store = Arc::new(StateStore::new(dir.path().join("state.json")));
        (router(Arc::clone(&store), mode), store)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response: Response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_state(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/state")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_state_on_empty_storage() {
        let dir = TempDir::new().unwrap();
        let (app, store) = test_app(&dir, Mode::Production);

        let (status, body) = send(&app, get_request("/api/state")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["color"], DEFAULT_COLOR);
        assert_eq!(body["count"], 0);
        assert_eq!(body["rev"], INITIAL_REV);
        assert!(body["updatedAt"].is_string());
        assert_eq!(body.as_object().unwrap().len(), 4);
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_post_valid_state() {
        let dir = TempDir::new().unwrap();
        let (app, _store) = test_app(&dir, Mode::Production);
        send(&app, get_request("/api/state")).await;

        let (status, body) =
            send(&app, post_state(r##"{"color":"#00ff00","count":3}"##)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["color"], "#00ff00");
        assert_eq!(body["count"], 3);
        assert_eq!(body["rev"], 2);
        assert!(body["updatedAt"].is_string());

        let (_, state) = send(&app, get_request("/api/state")).await;
        assert_eq!(state["rev"], 2);
        assert_eq!(state["updatedAt"], body["updatedAt"]);
    }

    #[tokio::test]
    async fn test_post_coerces_string_count() {
        let dir = TempDir::new().unwrap();
        let (app, _store) = test_app(&dir, Mode::Production);

        let (status, body) =
            send(&app, post_state(r##"{"color":"#ABCDEF","count":"7"}"##)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["color"], "#ABCDEF");
        assert_eq!(body["count"], 7);
    }

    #[tokio::test]
    async fn test_post_invalid_input() {
        let dir = TempDir::new().unwrap();
        let (app, store) = test_app(&dir, Mode::Production);
        send(&app, post_state(r##"{"color":"#00ff00","count":3}"##)).await;
        let before = fs::read(store.path()).unwrap();

        let cases = [
            (r#"{"color":"blue","count":3}"#, "invalid color — use #RRGGBB format"),
            (
                r##"{"color":"#000000","count":9}"##,
                "count out of range — must be between 0 and 8",
            ),
            (r##"{"color":"#000000","count":2.5}"##, "count must be an integer"),
            (r##"{"color":"#000000"}"##, "count must be an integer"),
            ("not json", "invalid color — use #RRGGBB format"),
            ("[1, 2]", "invalid color — use #RRGGBB format"),
            ("", "invalid color — use #RRGGBB format"),
        ];
        for (payload, reason) in cases {
            let (status, body) = send(&app, post_state(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
            assert_eq!(body, json!({"ok": false, "error": reason}), "{payload}");
        }

        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_corrupt_storage_serves_default() {
        let dir = TempDir::new().unwrap();
        let (app, store) = test_app(&dir, Mode::Production);
        send(&app, post_state(r##"{"color":"#00ff00","count":3}"##)).await;
        fs::write(store.path(), "{\"color\": \"#00f").unwrap();

        let (status, body) = send(&app, get_request("/api/state")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["color"], DEFAULT_COLOR);
        assert_eq!(body["rev"], INITIAL_REV);

        let (_, body) = send(&app, post_state(r##"{"color":"#0000ff","count":1}"##)).await;
        assert_eq!(body["rev"], 2);
    }

    #[tokio::test]
    async fn test_storage_failure_is_internal_error() {
        let dir = TempDir::new().unwrap();
        let (app, store) = test_app(&dir, Mode::Production);
        fs::create_dir(store.path()).unwrap();

        let (status, body) =
            send(&app, post_state(r##"{"color":"#00ff00","count":3}"##)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"ok": false, "error": INTERNAL_FAILURE}));

        // Reads still answer with a usable record.
        let (status, body) = send(&app, get_request("/api/state")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rev"], INITIAL_REV);
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let (app, _store) = test_app(&dir, Mode::Production);

        let (status, body) = send(&app, get_request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        let time = body["time"].as_str().unwrap();
        assert!(time.ends_with('Z'), "{time}");
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let dir = TempDir::new().unwrap();
        let (app, _store) = test_app(&dir, Mode::Production);

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/state")
            .header(header::ORIGIN, "http://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn test_openapi_only_in_development() {
        let dir = TempDir::new().unwrap();

        let (app, _store) = test_app(&dir, Mode::Development);
        let (status, body) = send(&app, get_request(OPENAPI_PATH)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/state"]["post"].is_object());
        assert!(body["paths"]["/api/health"]["get"].is_object());

        let (app, _store) = test_app(&dir, Mode::Production);
        let (status, _) = send(&app, get_request(OPENAPI_PATH)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(StateStore::new(dir.path().join("state.json")));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = CancellationToken::new();

        let server = tokio::spawn(serve(listener, store, Mode::Production, shutdown.clone()));
        shutdown.cancel();
        server.await.unwrap().unwrap();
    }
}
