// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use coffer::cli::{Cli, Commands};
use coffer::commands;

#[tokio::main]
async fn main() -> Result<()> {
    // Install the ring crypto provider for rustls (required for rustls 0.23+)
    // before any TLS operations
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let server = cli.server.unwrap_or_default();
    match cli.command {
        Commands::Server(args) => commands::server::run(args).await,
        Commands::List => commands::list::run(&server).await,
        Commands::Info(args) => commands::info::run(&server, args).await,
        Commands::Get(args) => commands::get::run(&server, args).await,
        Commands::Put(args) => commands::put::run(&server, args).await,
        Commands::Activate(args) => commands::activate::run(&server, args).await,
        Commands::DeleteVersion(args) => commands::delete::run_delete_version(&server, args).await,
        Commands::Delete(args) => commands::delete::run_delete(&server, args).await,
        Commands::GenerateKey => commands::generate_key::run(),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
