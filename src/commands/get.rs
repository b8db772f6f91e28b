// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::io::{IsTerminal, Write};

use anyhow::Result;

use crate::cli::GetArgs;
use crate::client::Client;

pub async fn run(server: &str, args: GetArgs) -> Result<()> {
    let client = Client::new(server)?;
    let value = if let Some(version) = args.version {
        client.get_version(&args.name, version).await?
    } else if let Some(since) = args.if_changed {
        client.get_if_changed(&args.name, since).await?
    } else {
        client.get(&args.name).await?
    };

    let bytes = value.bytes()?;
    let mut stdout = std::io::stdout();
    // On a terminal, printable values get a trailing newline; raw bytes
    // going into a pipe are passed through untouched.
    match std::str::from_utf8(&bytes) {
        Ok(text) if stdout.is_terminal() => println!("{text}"),
        _ => stdout.write_all(&bytes)?,
    }
    Ok(())
}
