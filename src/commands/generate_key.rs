// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use anyhow::Result;

use crate::kek;

/// Write a fresh keyset to stdout. Meant to be redirected into whatever
/// secret-management channel feeds the production server's stdin.
pub fn run() -> Result<()> {
    kek::generate_key(&mut std::io::stdout())?;
    Ok(())
}
