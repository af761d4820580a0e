//! Shared-store HTTP API.
//!
//! A deliberately small surface: `GET /api/data` returns the stored state,
//! `POST /api/data` replaces it under optimistic concurrency, and the
//! `/api/config/db-path` pair relocates the backing file. The server treats
//! the payload as opaque JSON — it only reads and stamps `lastUpdated` — so
//! clients on newer schema versions never lose fields by syncing through an
//! older server.
//!
//! Concurrency control: a writer sends the version it based its edits on in
//! the `X-Base-Version` header. A write whose base is older than the stored
//! version gets `409` with the server copy in `serverData`, so the client can
//! merge and retry. No header, or the literal value `force`, bypasses the
//! check.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::types::default_state;
use crate::util::{atomic_write_str, now_ms};

pub const BASE_VERSION_HEADER: &str = "x-base-version";
const CONFIG_FILE: &str = "server-config.json";

struct StoreInner {
    config_dir: PathBuf,
    db_path: PathBuf,
}

/// The shared store behind the API. One mutex covers the whole
/// read-check-write cycle, so concurrent posts serialize.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl SharedStore {
    /// Open (or create) the store under `config_dir`. The backing file
    /// defaults to `data.json` in the same directory unless a previous
    /// `POST /api/config/db-path` relocated it.
    pub fn open(config_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let config_dir = config_dir.into();
        fs::create_dir_all(&config_dir)?;

        let db_path = load_configured_path(&config_dir)
            .unwrap_or_else(|| config_dir.join("data.json"));
        init_db_if_needed(&db_path)?;
        log::info!("Shared store backed by {}", db_path.display());

        Ok(SharedStore {
            inner: Arc::new(Mutex::new(StoreInner {
                config_dir,
                db_path,
            })),
        })
    }
}

fn load_configured_path(config_dir: &Path) -> Option<PathBuf> {
    let raw = fs::read_to_string(config_dir.join(CONFIG_FILE)).ok()?;
    let config: Value = serde_json::from_str(&raw).ok()?;
    config.get("dbPath").and_then(Value::as_str).map(PathBuf::from)
}

/// Seed a fresh backing file with the bootstrap state (one admin account) so
/// a first-time client can log in.
fn init_db_if_needed(db_path: &Path) -> std::io::Result<()> {
    if db_path.exists() {
        return Ok(());
    }
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut seed = default_state().shared_value();
    if let Some(obj) = seed.as_object_mut() {
        obj.insert("lastUpdated".to_string(), json!(now_ms()));
    }
    let json = serde_json::to_string_pretty(&seed)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    atomic_write_str(db_path, &json)
}

fn read_db(db_path: &Path) -> Value {
    fs::read_to_string(db_path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_else(|| json!({}))
}

pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/api/data", get(get_data).post(post_data))
        .route("/api/config/db-path", get(get_db_path).post(set_db_path))
        .layer(CorsLayer::permissive())
        .with_state(store)
}

fn internal_error(context: &str, err: impl std::fmt::Display) -> Response {
    log::error!("{}: {}", context, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": format!("{}: {}", context, err)})),
    )
        .into_response()
}

// ============================================================================
// /api/data
// ============================================================================

async fn get_data(State(store): State<SharedStore>) -> Response {
    let inner = store.inner.lock().await;
    Json(read_db(&inner.db_path)).into_response()
}

async fn post_data(
    State(store): State<SharedStore>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    let mut payload = match payload {
        Value::Object(obj) => obj,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Payload must be a JSON object"})),
            )
                .into_response();
        }
    };

    let inner = store.inner.lock().await;
    let current = read_db(&inner.db_path);
    let current_version = current
        .get("lastUpdated")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    match headers.get(BASE_VERSION_HEADER).map(|v| v.to_str()) {
        None => {}
        Some(Ok("force")) => {
            log::warn!("Forced write, skipping version check");
        }
        Some(Ok(raw)) => match raw.parse::<i64>() {
            // A base at or past the stored version means the writer saw
            // everything currently on disk.
            Ok(base) if base >= current_version => {}
            Ok(base) => {
                log::info!(
                    "Conflict: client base {} behind stored version {}",
                    base,
                    current_version
                );
                return (
                    StatusCode::CONFLICT,
                    Json(json!({"error": "Conflict detected", "serverData": current})),
                )
                    .into_response();
            }
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "Invalid X-Base-Version header"})),
                )
                    .into_response();
            }
        },
        Some(Err(_)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Invalid X-Base-Version header"})),
            )
                .into_response();
        }
    }

    // Fresh versions are strictly monotonic even if the wall clock stalls.
    let version = now_ms().max(current_version + 1);
    payload.insert("lastUpdated".to_string(), json!(version));

    let json = match serde_json::to_string_pretty(&Value::Object(payload)) {
        Ok(json) => json,
        Err(e) => return internal_error("Failed to serialize state", e),
    };
    if let Err(e) = atomic_write_str(&inner.db_path, &json) {
        return internal_error("Failed to write state", e);
    }

    Json(json!({"success": true, "timestamp": version})).into_response()
}

// ============================================================================
// /api/config/db-path
// ============================================================================

async fn get_db_path(State(store): State<SharedStore>) -> Response {
    let inner = store.inner.lock().await;
    Json(json!({"path": inner.db_path.display().to_string()})).into_response()
}

async fn set_db_path(State(store): State<SharedStore>, Json(body): Json<Value>) -> Response {
    let path = match body.get("path").and_then(Value::as_str) {
        Some(path) if !path.trim().is_empty() => PathBuf::from(path.trim()),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Missing 'path'"})),
            )
                .into_response();
        }
    };

    let mut inner = store.inner.lock().await;
    if let Err(e) = init_db_if_needed(&path) {
        return internal_error("Failed to initialize database file", e);
    }

    let config = json!({"dbPath": path.display().to_string()});
    let config_path = inner.config_dir.join(CONFIG_FILE);
    if let Err(e) = atomic_write_str(&config_path, &config.to_string()) {
        return internal_error("Failed to persist server config", e);
    }

    log::info!("Shared store moved to {}", path.display());
    inner.db_path = path.clone();
    Json(json!({"success": true, "path": path.display().to_string()})).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_router(dir: &Path) -> Router {
        router(SharedStore::open(dir).unwrap())
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_request(payload: Value, base_version: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/data")
            .header("content-type", "application/json");
        if let Some(base) = base_version {
            builder = builder.header("X-Base-Version", base);
        }
        builder.body(Body::from(payload.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_fresh_store_serves_bootstrap_admin() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());

        let response = app
            .oneshot(Request::get("/api/data").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let data = body_json(response).await;
        assert_eq!(data["users"][0]["id"], "u1");
        assert!(data["lastUpdated"].is_i64());
    }

    #[tokio::test]
    async fn test_post_stamps_fresh_version() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());

        let before = now_ms();
        let response = app
            .clone()
            .oneshot(post_request(json!({"users": [], "teams": []}), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert!(body["timestamp"].as_i64().unwrap() >= before);

        let data = body_json(
            app.oneshot(Request::get("/api/data").body(Body::empty()).unwrap())
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(data["lastUpdated"], body["timestamp"]);
    }

    #[tokio::test]
    async fn test_stale_base_version_conflicts_with_server_copy() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());

        let first = body_json(
            app.clone()
                .oneshot(post_request(json!({"users": [], "marker": "A"}), None))
                .await
                .unwrap(),
        )
        .await;
        let v1 = first["timestamp"].as_i64().unwrap();

        // Writer B lands on top of A.
        let second = app
            .clone()
            .oneshot(post_request(
                json!({"users": [], "marker": "B"}),
                Some(&v1.to_string()),
            ))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);

        // Writer C still bases on v1: rejected, gets B's copy back.
        let third = app
            .clone()
            .oneshot(post_request(
                json!({"users": [], "marker": "C"}),
                Some(&v1.to_string()),
            ))
            .await
            .unwrap();
        assert_eq!(third.status(), StatusCode::CONFLICT);
        let body = body_json(third).await;
        assert_eq!(body["error"], "Conflict detected");
        assert_eq!(body["serverData"]["marker"], "B");

        // The rejected write left the stored state untouched.
        let data = body_json(
            app.oneshot(Request::get("/api/data").body(Body::empty()).unwrap())
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(data["marker"], "B");
    }

    #[tokio::test]
    async fn test_force_bypasses_version_check() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());

        app.clone()
            .oneshot(post_request(json!({"users": [], "marker": "A"}), None))
            .await
            .unwrap();

        let forced = app
            .clone()
            .oneshot(post_request(json!({"users": [], "marker": "F"}), Some("force")))
            .await
            .unwrap();
        assert_eq!(forced.status(), StatusCode::OK);

        let data = body_json(
            app.oneshot(Request::get("/api/data").body(Body::empty()).unwrap())
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(data["marker"], "F");
    }

    #[tokio::test]
    async fn test_unknown_fields_survive_the_server() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());

        app.clone()
            .oneshot(post_request(
                json!({"users": [], "futureCollection": [{"id": "x"}]}),
                None,
            ))
            .await
            .unwrap();

        let data = body_json(
            app.oneshot(Request::get("/api/data").body(Body::empty()).unwrap())
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(data["futureCollection"][0]["id"], "x");
    }

    #[tokio::test]
    async fn test_invalid_base_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());

        let response = app
            .oneshot(post_request(json!({"users": []}), Some("not-a-number")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_db_path_relocation() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());
        let new_path = dir.path().join("nested").join("moved.json");

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/config/db-path")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({"path": new_path.display().to_string()}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(new_path.exists());

        let config = body_json(
            app.oneshot(
                Request::get("/api/config/db-path")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
        )
        .await;
        assert_eq!(config["path"], new_path.display().to_string());
    }
}
