// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Destructive subcommands. Both run twice by design: the first invocation
//! prints a short-lived confirmation token, the second presents it back as a
//! trailing argument and performs the deletion.

use anyhow::Result;

use crate::cli::{DeleteArgs, DeleteVersionArgs};
use crate::client::Client;
use crate::confirm;
use crate::error::Error;

pub async fn run_delete(server: &str, args: DeleteArgs) -> Result<()> {
    let client = Client::new(server)?;
    let request = confirm::delete_secret_request(&args.name);
    let token = require_confirmation(&request, args.confirm.as_deref())?;
    confirm::verify(&request, token)?;

    client.delete(&args.name).await?;
    println!("Deleted all versions of {:?}", args.name);
    Ok(())
}

pub async fn run_delete_version(server: &str, args: DeleteVersionArgs) -> Result<()> {
    let client = Client::new(server)?;
    let request = confirm::delete_version_request(&args.name, args.version);
    let token = require_confirmation(&request, args.confirm.as_deref())?;
    confirm::verify(&request, token)?;

    client.delete_version(&args.name, args.version).await?;
    println!("Deleted version {} of {:?}", args.version, args.name);
    Ok(())
}

fn require_confirmation<'a>(request: &str, token: Option<&'a str>) -> Result<&'a str, Error> {
    match token {
        Some(token) => Ok(token),
        None => Err(Error::ConfirmationRequired {
            request: request.to_string(),
            token: confirm::generate(request),
        }),
    }
}
