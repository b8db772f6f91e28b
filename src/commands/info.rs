// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use anyhow::Result;

use crate::cli::InfoArgs;
use crate::client::Client;

pub async fn run(server: &str, args: InfoArgs) -> Result<()> {
    let client = Client::new(server)?;
    let info = client.info(&args.name).await?;

    let versions = info
        .versions
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    println!("Name:     {}", info.name);
    println!("Active:   {}", info.active_version);
    println!("Versions: {versions}");
    Ok(())
}
