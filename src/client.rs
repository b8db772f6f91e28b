// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the coffer API, used by the CLI subcommands.
//!
//! The server address comes from `--server` or the `COFFER_SERVER`
//! environment variable. Error responses carry a JSON `{"error": ...}` body;
//! that message is surfaced verbatim so confirmation-token errors remain
//! copy-pastable.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::api::{
    ActivateRequest, DeleteRequest, DeleteVersionRequest, GetRequest, InfoRequest, PutRequest,
    PutResponse,
};
use crate::error::{Error, Result};
use crate::store::{SecretInfo, SecretValue};

/// Client for a running coffer server.
pub struct Client {
    http: reqwest::Client,
    server: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl Client {
    /// Create a client for the given server URL.
    pub fn new(server: &str) -> Result<Self> {
        if server.is_empty() {
            return Err(Error::Client("no server address is set".into()));
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;
        Ok(Self {
            http,
            server: server.trim_end_matches('/').to_string(),
        })
    }

    /// List all secrets visible to the caller.
    pub async fn list(&self) -> Result<Vec<SecretInfo>> {
        self.post("/api/list", &serde_json::json!({})).await
    }

    /// Get metadata for one secret.
    pub async fn info(&self, name: &str) -> Result<SecretInfo> {
        self.post(
            "/api/info",
            &InfoRequest {
                name: name.to_string(),
            },
        )
        .await
    }

    /// Get the active value of a secret.
    pub async fn get(&self, name: &str) -> Result<SecretValue> {
        self.get_with(name, None, None).await
    }

    /// Get a pinned version of a secret.
    pub async fn get_version(&self, name: &str, version: u32) -> Result<SecretValue> {
        self.get_with(name, Some(version), None).await
    }

    /// Get the active value only if it changed from `since`.
    pub async fn get_if_changed(&self, name: &str, since: u32) -> Result<SecretValue> {
        self.get_with(name, None, Some(since)).await
    }

    async fn get_with(
        &self,
        name: &str,
        version: Option<u32>,
        if_changed_since: Option<u32>,
    ) -> Result<SecretValue> {
        self.post(
            "/api/get",
            &GetRequest {
                name: name.to_string(),
                version,
                if_changed_since,
            },
        )
        .await
    }

    /// Store a new value, returning the version it was saved as.
    pub async fn put(&self, name: &str, value: &[u8]) -> Result<u32> {
        use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
        let response: PutResponse = self
            .post(
                "/api/put",
                &PutRequest {
                    name: name.to_string(),
                    value: BASE64.encode(value),
                },
            )
            .await?;
        Ok(response.version)
    }

    /// Set the active version of a secret.
    pub async fn activate(&self, name: &str, version: u32) -> Result<()> {
        self.post_no_body(
            "/api/activate",
            &ActivateRequest {
                name: name.to_string(),
                version,
            },
        )
        .await
    }

    /// Delete a non-active version of a secret.
    pub async fn delete_version(&self, name: &str, version: u32) -> Result<()> {
        self.post_no_body(
            "/api/delete-version",
            &DeleteVersionRequest {
                name: name.to_string(),
                version,
            },
        )
        .await
    }

    /// Delete all versions of a secret.
    pub async fn delete(&self, name: &str) -> Result<()> {
        self.post_no_body(
            "/api/delete",
            &DeleteRequest {
                name: name.to_string(),
            },
        )
        .await
    }

    async fn send<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = format!("{}{path}", self.server);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Client(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::NOT_MODIFIED {
            return Err(Error::NotModified);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("server returned {status}"),
        };
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(message));
        }
        Err(Error::Client(message))
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(path, body)
            .await?
            .json()
            .await
            .map_err(|e| Error::Client(format!("parsing response: {e}")))
    }

    async fn post_no_body<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        self.send(path, body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_server_address_is_rejected() {
        let err = Client::new("").err().unwrap();
        assert!(matches!(err, Error::Client(_)));
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let client = Client::new("https://coffer.mesh.internal/").unwrap();
        assert_eq!(client.server, "https://coffer.mesh.internal");
    }
}
