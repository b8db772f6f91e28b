// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use anyhow::Result;

use crate::cli::ActivateArgs;
use crate::client::Client;

pub async fn run(server: &str, args: ActivateArgs) -> Result<()> {
    let client = Client::new(server)?;
    client.activate(&args.name, args.version).await?;
    println!("Version {} of {:?} is now active", args.version, args.name);
    Ok(())
}
