// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mesh LocalAPI client abstraction.
//!
//! The trait allows both a real client (HTTP to the mesh daemon) and an
//! in-memory mock, so bootstrap and API handlers are testable without a
//! live mesh.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::{DEFAULT_MESH_SOCKET, MESH_API_ENV};
use crate::error::{Error, Result};

/// Client for the mesh daemon's LocalAPI.
#[async_trait]
pub trait MeshClient: Send + Sync {
    /// Current node status.
    async fn status(&self) -> Result<MeshStatus>;

    /// Resolve the mesh identity behind a request's remote address.
    async fn whois(&self, addr: SocketAddr) -> Result<CallerIdentity>;

    /// Fetch the PEM certificate/key pair for a certificate domain.
    async fn cert_pair(&self, domain: &str) -> Result<Vec<u8>>;
}

/// Node status reported by the LocalAPI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeshStatus {
    /// Backend state (e.g. "Running", "Stopped", "NeedsLogin").
    pub backend_state: String,

    /// This node's information.
    #[serde(rename = "Self")]
    pub self_node: SelfNode,

    /// Domains the mesh can issue TLS certificates for. Populated only once
    /// the node is fully converged; querying earlier returns an empty or
    /// stale list.
    #[serde(default)]
    pub cert_domains: Vec<String>,
}

impl MeshStatus {
    /// Whether the node is fully up.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.backend_state == "Running"
    }
}

/// This node's information from status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SelfNode {
    /// Hostname.
    pub host_name: String,

    /// DNS name.
    #[serde(rename = "DNSName")]
    pub dns_name: String,

    /// Mesh IP addresses.
    #[serde(rename = "MeshIPs", default)]
    pub mesh_ips: Vec<IpAddr>,

    /// Whether this node is online.
    pub online: bool,
}

/// Caller metadata resolved from a request's network-level identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallerIdentity {
    /// Login name of the user (or tagged node) behind the address.
    pub login_name: String,

    /// DNS name of the calling node.
    pub node_name: String,
}

impl CallerIdentity {
    /// Stable principal string recorded in audit logs.
    #[must_use]
    pub fn principal(&self) -> String {
        format!("{}@{}", self.login_name, self.node_name)
    }
}

/// Real LocalAPI client over HTTP.
pub struct LocalApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl LocalApiClient {
    /// Create a client for the default daemon socket, honoring the
    /// `COFFER_MESH_API` HTTP override if set.
    pub fn from_env() -> Result<Self> {
        match std::env::var(MESH_API_ENV) {
            Ok(url) => Self::with_http(url),
            Err(_) => Self::with_socket(DEFAULT_MESH_SOCKET),
        }
    }

    /// Create a client using a daemon Unix socket path.
    pub fn with_socket(socket_path: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::MeshApi(e.to_string()))?;
        Ok(Self {
            client,
            base_url: format!("http://local-mesh-daemon.sock{socket_path}"),
        })
    }

    /// Create a client using an HTTP URL (tests, or a daemon exposed over
    /// TCP).
    pub fn with_http(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::MeshApi(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn get_response(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::MeshApi(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::MeshApi(format!("{status}: {body}")));
        }
        Ok(response)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        self.get_response(path)
            .await?
            .json()
            .await
            .map_err(|e| Error::MeshApi(format!("parsing response: {e}")))
    }
}

#[async_trait]
impl MeshClient for LocalApiClient {
    async fn status(&self) -> Result<MeshStatus> {
        self.get_json("/localapi/v0/status").await
    }

    async fn whois(&self, addr: SocketAddr) -> Result<CallerIdentity> {
        self.get_json(&format!("/localapi/v0/whois?addr={addr}"))
            .await
    }

    async fn cert_pair(&self, domain: &str) -> Result<Vec<u8>> {
        let response = self
            .get_response(&format!("/localapi/v0/cert/{domain}?type=pair"))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::MeshApi(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Mock mesh client for tests.
///
/// Stores node state in memory so bootstrap and handler tests can run
/// without a mesh daemon.
#[derive(Clone, Default)]
pub struct MockMeshClient {
    inner: Arc<RwLock<MockState>>,
}

#[derive(Default)]
struct MockState {
    backend_state: String,
    cert_domains: Vec<String>,
    callers: HashMap<IpAddr, CallerIdentity>,
    cert_pair: Vec<u8>,
    /// Status polls remaining before `backend_state` flips to Running.
    polls_until_running: u32,
}

impl MockMeshClient {
    /// Create a converged mock node with the given certificate domains.
    #[must_use]
    pub fn running(cert_domains: &[&str]) -> Self {
        let state = MockState {
            backend_state: "Running".to_string(),
            cert_domains: cert_domains.iter().map(ToString::to_string).collect(),
            ..Default::default()
        };
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Create a mock node that reports "Starting" for `polls` status calls
    /// before converging.
    #[must_use]
    pub fn converging_after(polls: u32, cert_domains: &[&str]) -> Self {
        let state = MockState {
            backend_state: "Starting".to_string(),
            cert_domains: cert_domains.iter().map(ToString::to_string).collect(),
            polls_until_running: polls,
            ..Default::default()
        };
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Register a caller identity for an address.
    pub async fn add_caller(&self, addr: IpAddr, login_name: &str, node_name: &str) {
        self.inner.write().await.callers.insert(
            addr,
            CallerIdentity {
                login_name: login_name.to_string(),
                node_name: node_name.to_string(),
            },
        );
    }

    /// Set the PEM blob returned by `cert_pair`.
    pub async fn set_cert_pair(&self, pem: Vec<u8>) {
        self.inner.write().await.cert_pair = pem;
    }
}

#[async_trait]
impl MeshClient for MockMeshClient {
    async fn status(&self) -> Result<MeshStatus> {
        let mut inner = self.inner.write().await;
        if inner.polls_until_running > 0 {
            inner.polls_until_running -= 1;
            if inner.polls_until_running == 0 {
                inner.backend_state = "Running".to_string();
            }
        }
        let running = inner.backend_state == "Running";
        Ok(MeshStatus {
            backend_state: inner.backend_state.clone(),
            self_node: SelfNode {
                host_name: "mock-node".to_string(),
                dns_name: "mock-node.mesh.internal.".to_string(),
                mesh_ips: vec!["100.64.0.1".parse().expect("literal ip")],
                online: running,
            },
            cert_domains: if running {
                inner.cert_domains.clone()
            } else {
                Vec::new()
            },
        })
    }

    async fn whois(&self, addr: SocketAddr) -> Result<CallerIdentity> {
        self.inner
            .read()
            .await
            .callers
            .get(&addr.ip())
            .cloned()
            .ok_or_else(|| Error::CallerUnknown(format!("no mesh peer at {addr}")))
    }

    async fn cert_pair(&self, _domain: &str) -> Result<Vec<u8>> {
        let pair = self.inner.read().await.cert_pair.clone();
        if pair.is_empty() {
            return Err(Error::MeshApi("no certificate available".into()));
        }
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn running_mock_reports_cert_domains() {
        let mock = MockMeshClient::running(&["coffer.mesh.internal"]);
        let status = mock.status().await.unwrap();
        assert!(status.is_running());
        assert_eq!(status.cert_domains, vec!["coffer.mesh.internal"]);
    }

    #[tokio::test]
    async fn whois_unknown_address_fails() {
        let mock = MockMeshClient::running(&["coffer.mesh.internal"]);
        let err = mock
            .whois("100.64.0.9:55000".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CallerUnknown(_)));
    }

    #[tokio::test]
    async fn whois_returns_registered_caller() {
        let mock = MockMeshClient::running(&["coffer.mesh.internal"]);
        mock.add_caller("100.64.0.9".parse().unwrap(), "alice", "laptop.mesh.internal")
            .await;

        let who = mock
            .whois("100.64.0.9:55000".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(who.login_name, "alice");
        assert_eq!(who.principal(), "alice@laptop.mesh.internal");
    }

    #[test]
    fn status_parses_localapi_shape() {
        let raw = r#"{
            "BackendState": "Running",
            "Self": {
                "HostName": "coffer",
                "DNSName": "coffer.mesh.internal.",
                "MeshIPs": ["100.64.0.2"],
                "Online": true
            },
            "CertDomains": ["coffer.mesh.internal"]
        }"#;
        let status: MeshStatus = serde_json::from_str(raw).unwrap();
        assert!(status.is_running());
        assert_eq!(status.self_node.host_name, "coffer");
        assert_eq!(status.cert_domains.len(), 1);
    }
}
