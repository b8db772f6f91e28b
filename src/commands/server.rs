// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The `server` subcommand: bring up the mesh identity, open the store, and
//! serve the API until a termination signal arrives.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::router;
use crate::audit::AuditLog;
use crate::cli::ServerArgs;
use crate::config::{AUDIT_FILE, DATABASE_FILE, DEV_HOSTNAME, DEV_STATE_DIR};
use crate::kek::{self, Mode};
use crate::mesh::{self, LocalApiClient, MeshClient};
use crate::serve::{serve, ServeOptions};
use crate::state::AppState;
use crate::store::{BackupTarget, Store, StoreConfig};

pub async fn run(args: ServerArgs) -> Result<()> {
    let (state_dir, hostname) = resolve_identity(&args)?;

    let kek = if args.dev {
        warn!("running in development mode, stored secrets are NOT protected");
        kek::provision(Mode::Development)?
    } else {
        info!("reading key-encryption keyset from stdin");
        kek::provision(Mode::Production {
            key_stream: Box::new(std::io::stdin()),
        })?
    };

    let mesh: Arc<dyn MeshClient> = Arc::new(LocalApiClient::from_env()?);
    let identity = mesh::bring_up(mesh.as_ref(), &hostname, &state_dir).await?;

    let (certs, key) = mesh::fetch_tls_credentials(mesh.as_ref(), identity.fqdn()).await?;
    let tls = RustlsConfig::from_pem(certs, key)
        .await
        .context("building TLS configuration")?;

    let audit = AuditLog::open(state_dir.join(AUDIT_FILE))?;
    let store = Store::open(StoreConfig {
        db_path: state_dir.join(DATABASE_FILE),
        kek,
        audit,
        backup: backup_target(&args),
    })?;
    info!(
        secrets = store.secret_count(),
        versions = store.version_count(),
        "store opened"
    );

    let app = router(AppState::new(store, mesh));

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    serve(app, &identity, tls, ServeOptions::default(), shutdown).await?;
    Ok(())
}

/// Resolve state directory and hostname, filling in development defaults.
/// Production mode requires both explicitly.
fn resolve_identity(args: &ServerArgs) -> Result<(PathBuf, String)> {
    let state_dir = match &args.state_dir {
        Some(dir) => dir.clone(),
        None if args.dev => PathBuf::from(DEV_STATE_DIR),
        None => bail!("--state-dir is required without --dev"),
    };
    let hostname = match &args.hostname {
        Some(name) => name.clone(),
        None if args.dev => DEV_HOSTNAME.to_string(),
        None => bail!("--hostname is required without --dev"),
    };
    Ok((state_dir, hostname))
}

fn backup_target(args: &ServerArgs) -> Option<BackupTarget> {
    match (
        &args.backup_bucket,
        &args.backup_bucket_region,
        &args.backup_role,
    ) {
        (Some(bucket), Some(region), Some(role)) => Some(BackupTarget {
            bucket: bucket.clone(),
            region: region.clone(),
            role: role.clone(),
        }),
        _ => None,
    }
}

/// Cancel the token on SIGINT or SIGTERM. The serving loop owns the rest of
/// the shutdown sequence.
fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut terminate = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
        shutdown.cancel();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_args() -> ServerArgs {
        ServerArgs {
            state_dir: None,
            hostname: None,
            dev: false,
            backup_bucket: None,
            backup_bucket_region: None,
            backup_role: None,
        }
    }

    #[test]
    fn dev_mode_fills_in_defaults() {
        let args = ServerArgs {
            dev: true,
            ..bare_args()
        };
        let (state_dir, hostname) = resolve_identity(&args).unwrap();
        assert_eq!(state_dir, PathBuf::from(DEV_STATE_DIR));
        assert_eq!(hostname, DEV_HOSTNAME);
    }

    #[test]
    fn production_mode_requires_explicit_identity() {
        assert!(resolve_identity(&bare_args()).is_err());

        let args = ServerArgs {
            state_dir: Some(PathBuf::from("/var/lib/coffer")),
            ..bare_args()
        };
        assert!(resolve_identity(&args).is_err());

        let args = ServerArgs {
            state_dir: Some(PathBuf::from("/var/lib/coffer")),
            hostname: Some("vault".into()),
            ..bare_args()
        };
        let (state_dir, hostname) = resolve_identity(&args).unwrap();
        assert_eq!(state_dir, PathBuf::from("/var/lib/coffer"));
        assert_eq!(hostname, "vault");
    }

    #[test]
    fn backup_target_needs_the_full_triple() {
        assert!(backup_target(&bare_args()).is_none());

        let args = ServerArgs {
            backup_bucket: Some("coffer-backups".into()),
            backup_bucket_region: Some("us-east-2".into()),
            backup_role: Some("arn:aws:iam::123:role/backup".into()),
            ..bare_args()
        };
        let target = backup_target(&args).unwrap();
        assert_eq!(target.bucket, "coffer-backups");
    }
}
