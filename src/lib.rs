// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Coffer - versioned secret distribution over a private mesh
//!
//! A small service that stores versioned secrets encrypted at rest and
//! serves them over TLS to other nodes on the same mesh network. The mesh
//! supplies both the server's certificate and the identity of every caller,
//! so there is no separate credential layer.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `client` - HTTP client used by the CLI subcommands
//! - `confirm` - time-windowed confirmation tokens for destructive commands
//! - `kek` - key-encryption-key provisioning
//! - `mesh` - mesh daemon client, identity bootstrap, TLS credentials
//! - `serve` - dual plain/TLS listeners with bounded graceful shutdown
//! - `store` - the versioned secret store, envelope-encrypted on disk

pub mod api;
pub mod audit;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod disposition;
pub mod error;
pub mod kek;
pub mod mesh;
pub mod serve;
pub mod state;
pub mod store;

pub use error::{Error, Result};
