// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for the coffer server and CLI.
//!
//! Startup errors (identity, network, key material, listener bind) are fatal;
//! the process never partially starts. Confirmation and whitespace errors are
//! local to a single client invocation and carry everything the caller needs
//! to self-correct on retry.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Result type for coffer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the coffer server and CLI.
#[derive(Debug, Error)]
pub enum Error {
    /// The mesh state directory could not be created or used.
    #[error("mesh identity unavailable: {0}")]
    Identity(String),

    /// The mesh network did not converge to a usable state.
    #[error("mesh network did not come up: {0}")]
    NetworkTimeout(String),

    /// The mesh reported no TLS certificate domains after convergence.
    #[error("mesh did not provide TLS certificate domains")]
    NoCertDomains,

    /// Serialized key material could not be parsed.
    #[error("reading keyset: {0}")]
    KeyMaterial(String),

    /// A KEK could not be built from otherwise-parseable key material.
    #[error("constructing KEK: {0}")]
    KeyConstruction(String),

    /// A network listener could not be bound at startup.
    #[error("binding {listener} listener: {source}")]
    ListenerBind {
        listener: &'static str,
        source: std::io::Error,
    },

    /// A listener failed while serving; fatal in steady state.
    #[error("serving {listener}: {message}")]
    Serve {
        listener: &'static str,
        message: String,
    },

    /// A destructive operation was attempted without a confirmation token.
    #[error("confirmation required for {request:?}, use token {token:?}")]
    ConfirmationRequired { request: String, token: String },

    /// The supplied confirmation token does not match the current window.
    #[error("incorrect confirmation for {request:?}, use token {token:?}")]
    ConfirmationMismatch { request: String, token: String },

    /// A text secret value has surrounding whitespace and no disposition.
    #[error(
        "text value has surrounding whitespace, specify --verbatim to keep \
         the space or --trim-space to remove it"
    )]
    AmbiguousWhitespace,

    /// AEAD seal/open failure (wrong key, tampered database, bad prefix).
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The named secret or secret version does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The active value is unchanged from the version the caller holds.
    #[error("value not modified")]
    NotModified,

    /// A version that is currently active cannot be deleted.
    #[error("version {version} of {name:?} is active and cannot be deleted")]
    ActiveVersion { name: String, version: u32 },

    /// Persistent store I/O or serialization failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// The caller's mesh identity could not be resolved.
    #[error("caller identity unknown: {0}")]
    CallerUnknown(String),

    /// Mesh LocalAPI request failed.
    #[error("mesh LocalAPI: {0}")]
    MeshApi(String),

    /// API client error (transport or server-reported failure).
    #[error("server request failed: {0}")]
    Client(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// HTTP-facing error with a status code and JSON body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::NotModified => StatusCode::NOT_MODIFIED,
            Error::ActiveVersion { .. } => StatusCode::CONFLICT,
            Error::CallerUnknown(_) => StatusCode::FORBIDDEN,
            Error::AmbiguousWhitespace => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
