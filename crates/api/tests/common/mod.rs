#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use pictura_api::config::ServerConfig;
use pictura_api::middleware::auth::USER_ID_HEADER;
use pictura_api::routes;
use pictura_api::state::AppState;
use pictura_api::storage::LocalImageStorage;
use pictura_core::assignment::DelayRange;
use pictura_core::sentiment::LexiconAnalyzer;
use pictura_core::status::ImageStatus;
use pictura_core::types::DbId;
use pictura_db::{AnnotationStore, MemoryStore};
use pictura_events::EventBus;
use pictura_pipeline::{Pipeline, PipelineConfig};

/// Smallest payload that sniffs as PNG.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

const BOUNDARY: &str = "pictura-test-boundary";

/// Build a test `ServerConfig` with safe defaults rooted at `media_root`.
pub fn test_config(media_root: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        media_root,
        max_upload_bytes: 1024 * 1024,
    }
}

/// A running app over the in-memory store with its pipeline.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub bus: Arc<EventBus>,
    pub pipeline: Pipeline,
    pub media: TempDir,
}

/// Build the full application router with all middleware layers.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses. The pipeline runs with no labeling
/// delay so uploads complete quickly.
pub async fn build_test_app() -> TestApp {
    let media = tempfile::tempdir().unwrap();
    let config = test_config(media.path().to_path_buf());

    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(EventBus::default());
    let pipeline_config = PipelineConfig {
        delay: DelayRange::new(0, 0).unwrap(),
        rng_seed: Some(1),
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::start(
        store.clone(),
        bus.clone(),
        Arc::new(LexiconAnalyzer::new()),
        &pipeline_config,
    )
    .await
    .unwrap();

    let state = AppState {
        store: store.clone(),
        config: Arc::new(config.clone()),
        storage: Arc::new(LocalImageStorage::new(media.path())),
        event_bus: bus.clone(),
        catalog: pipeline.catalog(),
        state_machine: pipeline.state_machine(),
        aggregator: pipeline.aggregator(),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes(&config))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    TestApp {
        router,
        store,
        bus,
        pipeline,
        media,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.unwrap()
}

fn builder(method: Method, uri: &str, user: Option<DbId>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match user {
        Some(id) => builder.header(USER_ID_HEADER, id.to_string()),
        None => builder,
    }
}

pub async fn get(app: &TestApp, uri: &str, user: Option<DbId>) -> Response<Body> {
    send(app, builder(Method::GET, uri, user).body(Body::empty()).unwrap()).await
}

pub async fn delete(app: &TestApp, uri: &str, user: Option<DbId>) -> Response<Body> {
    send(app, builder(Method::DELETE, uri, user).body(Body::empty()).unwrap()).await
}

pub async fn post_empty(app: &TestApp, uri: &str, user: Option<DbId>) -> Response<Body> {
    send(app, builder(Method::POST, uri, user).body(Body::empty()).unwrap()).await
}

pub async fn post_json(
    app: &TestApp,
    uri: &str,
    user: Option<DbId>,
    body: serde_json::Value,
) -> Response<Body> {
    let request = builder(Method::POST, uri, user)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// POST a multipart form with one file field named `field`.
pub async fn upload(
    app: &TestApp,
    user: Option<DbId>,
    field: &str,
    bytes: &[u8],
) -> Response<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
             filename=\"upload.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let request = builder(Method::POST, "/api/v1/images", user)
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Upload a PNG as `user` and return the new image id.
pub async fn upload_png(app: &TestApp, user: DbId) -> DbId {
    let response = upload(app, Some(user), "image", PNG_BYTES).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// Poll the store until the image reaches `expected`.
pub async fn wait_for_status(app: &TestApp, image_id: DbId, expected: ImageStatus) {
    for _ in 0..500 {
        let image = app.store.find_image(image_id).await.unwrap().unwrap();
        if image.status == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("image {image_id} never reached {expected}");
}
