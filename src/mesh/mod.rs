// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mesh overlay-network integration.
//!
//! The mesh daemon provides machine identity, reachability, and TLS
//! certificate issuance independent of public DNS. This module wraps its
//! LocalAPI behind a trait (mockable for tests), and implements the startup
//! bootstrap: wait for convergence, resolve certificate domains, and fetch
//! the TLS credentials the service will present.

mod bootstrap;
mod client;

pub use bootstrap::{bring_up, fetch_tls_credentials, ServerIdentity};
pub use client::{
    CallerIdentity, LocalApiClient, MeshClient, MeshStatus, MockMeshClient, SelfNode,
};
