// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::io::{IsTerminal, Read};

use anyhow::{bail, Context, Result};
use dialoguer::Password;

use crate::cli::PutArgs;
use crate::client::Client;
use crate::disposition::dispose_text;

pub async fn run(server: &str, args: PutArgs) -> Result<()> {
    let client = Client::new(server)?;

    let raw = read_value(&args)?;
    let value = dispose_text(&raw, args.verbatim, args.trim_space)?;
    if value.is_empty() && !args.empty_ok {
        bail!("empty secret value, use --empty-ok to store it anyway");
    }

    let version = client.put(&args.name, &value).await?;
    println!("Secret saved as {:?}, version {version}", args.name);
    if version != 1 {
        println!(
            "Note: version {version} is not active, run \"coffer activate {} {version}\" to activate it",
            args.name
        );
    }
    Ok(())
}

/// Read the raw value from a file, a pipe, or an interactive double prompt.
fn read_value(args: &PutArgs) -> Result<Vec<u8>> {
    if let Some(path) = &args.from_file {
        return std::fs::read(path).with_context(|| format!("reading {}", path.display()));
    }

    let mut stdin = std::io::stdin();
    if !stdin.is_terminal() {
        let mut buf = Vec::new();
        stdin.read_to_end(&mut buf).context("reading stdin")?;
        return Ok(buf);
    }

    let first = Password::new()
        .with_prompt(format!("Enter value for {:?}", args.name))
        .allow_empty_password(true)
        .interact()?;
    let second = Password::new()
        .with_prompt("Confirm value")
        .allow_empty_password(true)
        .interact()?;
    if first != second {
        bail!("values do not match");
    }
    Ok(first.into_bytes())
}
