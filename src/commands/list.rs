// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use anyhow::Result;

use crate::client::Client;

pub async fn run(server: &str) -> Result<()> {
    let client = Client::new(server)?;
    let secrets = client.list().await?;

    if secrets.is_empty() {
        println!("no secrets stored");
        return Ok(());
    }

    let width = secrets.iter().map(|s| s.name.len()).max().unwrap_or(0).max(4);
    println!("{:width$}  {:>6}  VERSIONS", "NAME", "ACTIVE");
    for secret in secrets {
        let versions = secret
            .versions
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        println!("{:width$}  {:>6}  {versions}", secret.name, secret.active_version);
    }
    Ok(())
}
