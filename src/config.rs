// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names, default values, and fixed
//! protocol constants used throughout the application.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `COFFER_SERVER` | Server URL used by client commands | Required for client commands |
//! | `COFFER_MESH_API` | Mesh LocalAPI override (HTTP URL, for tests) | daemon Unix socket |
//! | `RUST_LOG` | Log level filter | `info` |

use std::time::Duration;

/// Environment variable naming the server URL for client commands.
pub const SERVER_ENV: &str = "COFFER_SERVER";

/// Environment variable overriding the mesh LocalAPI endpoint with an HTTP
/// URL. Used by integration tests; production talks to the Unix socket.
pub const MESH_API_ENV: &str = "COFFER_MESH_API";

/// Default mesh LocalAPI Unix socket path.
pub const DEFAULT_MESH_SOCKET: &str = "/var/run/tailscale/tailscaled.sock";

/// State directory auto-created when running with `--dev`.
pub const DEV_STATE_DIR: &str = "coffer-dev.state";

/// Mesh hostname used when running with `--dev` and no `--hostname`.
pub const DEV_HOSTNAME: &str = "coffer-dev";

/// Database file name under the state directory.
pub const DATABASE_FILE: &str = "database";

/// Audit log file name under the state directory.
pub const AUDIT_FILE: &str = "audit.log";

/// Subdirectory of the state directory owned by the mesh layer.
pub const MESH_STATE_SUBDIR: &str = "mesh";

/// Bounded deadline for graceful TLS shutdown; in-flight requests still
/// active past this point are abandoned.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Interval between mesh convergence polls during bootstrap.
pub const MESH_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Ceiling on the mesh convergence wait before startup fails.
pub const MESH_CONVERGE_TIMEOUT: Duration = Duration::from_secs(300);

/// Width of a confirmation-token time bucket, in seconds.
pub const CONFIRM_WINDOW_SECS: i64 = 60;

/// Reserved path prefix served directly on the plain listener instead of
/// being redirected to TLS.
pub const DEBUG_PREFIX: &str = "/debug";
