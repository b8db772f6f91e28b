// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CLI argument parsing with clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::SERVER_ENV;

/// Coffer - versioned secret distribution over a private mesh
#[derive(Parser, Debug)]
#[command(name = "coffer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the coffer server
    #[arg(short, long, global = true, env = SERVER_ENV)]
    pub server: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the secrets server
    Server(ServerArgs),

    /// List the names of all stored secrets
    List,

    /// Show metadata for a secret
    Info(InfoArgs),

    /// Fetch the value of a secret
    Get(GetArgs),

    /// Store a new version of a secret
    Put(PutArgs),

    /// Set the active version of a secret
    Activate(ActivateArgs),

    /// Delete one version of a secret
    DeleteVersion(DeleteVersionArgs),

    /// Delete all versions of a secret
    Delete(DeleteArgs),

    /// Generate a fresh key-encryption key
    GenerateKey,
}

#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Directory for mesh state, the database, and the audit log
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Hostname to claim on the mesh
    #[arg(long)]
    pub hostname: Option<String>,

    /// Run in development mode with a throwaway key and local defaults
    #[arg(long)]
    pub dev: bool,

    /// Bucket to mirror the encrypted database to
    #[arg(long, requires_all = ["backup_bucket_region", "backup_role"])]
    pub backup_bucket: Option<String>,

    /// Region of the backup bucket
    #[arg(long, requires_all = ["backup_bucket", "backup_role"])]
    pub backup_bucket_region: Option<String>,

    /// Role to assume when writing backups
    #[arg(long, requires_all = ["backup_bucket", "backup_bucket_region"])]
    pub backup_role: Option<String>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Secret name
    pub name: String,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Secret name
    pub name: String,

    /// Fetch this specific version instead of the active one
    #[arg(long, conflicts_with = "if_changed")]
    pub version: Option<u32>,

    /// Fetch the active version only if it differs from this one
    #[arg(long)]
    pub if_changed: Option<u32>,
}

#[derive(Args, Debug)]
pub struct PutArgs {
    /// Secret name
    pub name: String,

    /// Read the value from this file instead of the terminal
    #[arg(long)]
    pub from_file: Option<PathBuf>,

    /// Allow storing an empty value
    #[arg(long)]
    pub empty_ok: bool,

    /// Keep surrounding whitespace in a text value; wins over --trim-space
    #[arg(long)]
    pub verbatim: bool,

    /// Remove surrounding whitespace from a text value
    #[arg(long)]
    pub trim_space: bool,
}

#[derive(Args, Debug)]
pub struct ActivateArgs {
    /// Secret name
    pub name: String,

    /// Version to make active
    pub version: u32,
}

#[derive(Args, Debug)]
pub struct DeleteVersionArgs {
    /// Secret name
    pub name: String,

    /// Version to delete
    pub version: u32,

    /// Confirmation token printed by a previous invocation
    pub confirm: Option<String>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Secret name
    pub name: String,

    /// Confirmation token printed by a previous invocation
    pub confirm: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_get_with_version() {
        let cli = Cli::parse_from(["coffer", "-s", "https://vault", "get", "db-pass", "--version", "3"]);
        assert_eq!(cli.server.as_deref(), Some("https://vault"));
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.name, "db-pass");
                assert_eq!(args.version, Some(3));
                assert!(args.if_changed.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_version_with_if_changed() {
        let err = Cli::try_parse_from([
            "coffer",
            "get",
            "db-pass",
            "--version",
            "3",
            "--if-changed",
            "2",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn put_accepts_both_whitespace_flags() {
        let cli = Cli::parse_from(["coffer", "put", "cert", "--verbatim", "--trim-space"]);
        match cli.command {
            Commands::Put(args) => {
                assert!(args.verbatim);
                assert!(args.trim_space);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn backup_flags_come_as_a_set() {
        let err = Cli::try_parse_from(["coffer", "server", "--backup-bucket", "b"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
