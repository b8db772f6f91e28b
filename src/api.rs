// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP API served to mesh peers.
//!
//! All secret operations are POST with JSON bodies under `/api/`. The caller
//! is resolved to a mesh identity via whois before any store access; requests
//! from addresses the mesh cannot attribute are rejected. `/debug/` carries
//! the health and metrics endpoints, which the plain listener serves without
//! redirecting.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::{AppState, Metrics, MetricsSnapshot};
use crate::store::{SecretInfo, SecretValue};

#[derive(Debug, Serialize, Deserialize)]
pub struct InfoRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetRequest {
    pub name: String,
    /// Pin a specific version; default is the active one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Return the active value only if it differs from this version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_changed_since: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PutRequest {
    pub name: String,
    /// Base64-encoded value bytes.
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PutResponse {
    pub version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivateRequest {
    pub name: String,
    pub version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteVersionRequest {
    pub name: String,
    pub version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Build the request router: secret API plus debug endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/list", post(list))
        .route("/api/info", post(info))
        .route("/api/get", post(get_value))
        .route("/api/put", post(put_value))
        .route("/api/activate", post(activate))
        .route("/api/delete", post(delete_secret))
        .route("/api/delete-version", post(delete_version))
        .route("/debug/healthz", get(healthz))
        .route("/debug/varz", get(varz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve the request's mesh identity to an auditable principal.
async fn caller(state: &AppState, addr: SocketAddr) -> Result<String, ApiError> {
    match state.mesh.whois(addr).await {
        Ok(identity) => Ok(identity.principal()),
        Err(e) => {
            Metrics::incr(&state.metrics.errors);
            Err(e.into())
        }
    }
}

fn count_error<T>(state: &AppState, result: Result<T, crate::error::Error>) -> Result<T, ApiError> {
    result.map_err(|e| {
        Metrics::incr(&state.metrics.errors);
        e.into()
    })
}

async fn list(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Json<Vec<SecretInfo>>, ApiError> {
    let who = caller(&state, addr).await?;
    let store = state.store.read().await;
    let infos = count_error(&state, store.list(&who))?;
    Ok(Json(infos))
}

async fn info(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<InfoRequest>,
) -> Result<Json<SecretInfo>, ApiError> {
    let who = caller(&state, addr).await?;
    let store = state.store.read().await;
    let info = count_error(&state, store.info(&who, &req.name))?;
    Ok(Json(info))
}

async fn get_value(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<GetRequest>,
) -> Result<Json<SecretValue>, ApiError> {
    let who = caller(&state, addr).await?;
    let store = state.store.read().await;
    let result = match (req.version, req.if_changed_since) {
        (Some(version), _) => store.get_version(&who, &req.name, version),
        (None, Some(since)) => store.get_if_changed(&who, &req.name, since),
        (None, None) => store.get(&who, &req.name),
    };
    let value = count_error(&state, result)?;
    Metrics::incr(&state.metrics.gets);
    Ok(Json(value))
}

async fn put_value(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<PutRequest>,
) -> Result<Json<PutResponse>, ApiError> {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    let who = caller(&state, addr).await?;
    let value = BASE64
        .decode(&req.value)
        .map_err(|e| ApiError::bad_request(format!("value is not valid base64: {e}")))?;
    let mut store = state.store.write().await;
    let version = count_error(&state, store.put(&who, &req.name, &value))?;
    Metrics::incr(&state.metrics.puts);
    Ok(Json(PutResponse { version }))
}

async fn activate(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ActivateRequest>,
) -> Result<StatusCode, ApiError> {
    let who = caller(&state, addr).await?;
    let mut store = state.store.write().await;
    count_error(&state, store.activate(&who, &req.name, req.version))?;
    Metrics::incr(&state.metrics.activates);
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_secret(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<DeleteRequest>,
) -> Result<StatusCode, ApiError> {
    let who = caller(&state, addr).await?;
    let mut store = state.store.write().await;
    count_error(&state, store.delete(&who, &req.name))?;
    Metrics::incr(&state.metrics.deletes);
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_version(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<DeleteVersionRequest>,
) -> Result<StatusCode, ApiError> {
    let who = caller(&state, addr).await?;
    let mut store = state.store.write().await;
    count_error(&state, store.delete_version(&who, &req.name, req.version))?;
    Metrics::incr(&state.metrics.deletes);
    Ok(StatusCode::NO_CONTENT)
}

/// Liveness check. Always 200 while the process serves.
async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Metrics snapshot for debugging and scraping.
async fn varz(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    let store = state.store.read().await;
    Json(
        state
            .metrics
            .snapshot(store.secret_count(), store.version_count()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::kek::DevKek;
    use crate::mesh::MockMeshClient;
    use crate::store::{Store, StoreConfig};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const PEER: &str = "100.64.0.9:50000";

    async fn test_state(temp: &TempDir) -> AppState {
        let mesh = MockMeshClient::running(&["coffer.mesh.internal"]);
        mesh.add_caller(
            "100.64.0.9".parse().unwrap(),
            "alice",
            "laptop.mesh.internal",
        )
        .await;
        let audit = AuditLog::open(temp.path().join("audit.log")).unwrap();
        let store = Store::open(StoreConfig {
            db_path: temp.path().join("database"),
            kek: Arc::new(DevKek),
            audit,
            backup: None,
        })
        .unwrap();
        AppState::new(store, Arc::new(mesh))
    }

    fn api_request(path: &str, peer: &str, body: serde_json::Value) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo::<SocketAddr>(peer.parse().unwrap()));
        req
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn put_then_get() {
        let temp = TempDir::new().unwrap();
        let app = router(test_state(&temp).await);

        let put = serde_json::json!({"name": "db-pass", "value": BASE64.encode(b"hunter2")});
        let response = app
            .clone()
            .oneshot(api_request("/api/put", PEER, put))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["version"], 1);

        let get = serde_json::json!({"name": "db-pass"});
        let response = app
            .oneshot(api_request("/api/get", PEER, get))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["version"], 1);
        assert_eq!(body["value"], BASE64.encode(b"hunter2"));
    }

    #[tokio::test]
    async fn unknown_peer_is_forbidden() {
        let temp = TempDir::new().unwrap();
        let app = router(test_state(&temp).await);

        let response = app
            .oneshot(api_request(
                "/api/list",
                "100.64.0.250:4000",
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_secret_is_not_found() {
        let temp = TempDir::new().unwrap();
        let app = router(test_state(&temp).await);

        let response = app
            .oneshot(api_request(
                "/api/get",
                PEER,
                serde_json::json!({"name": "ghost"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unchanged_value_is_304() {
        let temp = TempDir::new().unwrap();
        let app = router(test_state(&temp).await);

        let put = serde_json::json!({"name": "s", "value": BASE64.encode(b"v")});
        app.clone()
            .oneshot(api_request("/api/put", PEER, put))
            .await
            .unwrap();

        let response = app
            .oneshot(api_request(
                "/api/get",
                PEER,
                serde_json::json!({"name": "s", "if_changed_since": 1}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn delete_active_version_conflicts() {
        let temp = TempDir::new().unwrap();
        let app = router(test_state(&temp).await);

        let put = serde_json::json!({"name": "s", "value": BASE64.encode(b"v")});
        app.clone()
            .oneshot(api_request("/api/put", PEER, put))
            .await
            .unwrap();

        let response = app
            .oneshot(api_request(
                "/api/delete-version",
                PEER,
                serde_json::json!({"name": "s", "version": 1}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn debug_endpoints_answer_without_identity() {
        let temp = TempDir::new().unwrap();
        let app = router(test_state(&temp).await);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/debug/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/debug/varz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["secret_count"], 0);
    }

    #[tokio::test]
    async fn metrics_count_requests_and_errors() {
        let temp = TempDir::new().unwrap();
        let state = test_state(&temp).await;
        let app = router(state.clone());

        let put = serde_json::json!({"name": "s", "value": BASE64.encode(b"v")});
        app.clone()
            .oneshot(api_request("/api/put", PEER, put))
            .await
            .unwrap();
        app.clone()
            .oneshot(api_request(
                "/api/get",
                PEER,
                serde_json::json!({"name": "ghost"}),
            ))
            .await
            .unwrap();

        let store = state.store.read().await;
        let snap = state
            .metrics
            .snapshot(store.secret_count(), store.version_count());
        assert_eq!(snap.puts, 1);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.secret_count, 1);
    }
}
