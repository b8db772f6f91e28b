// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CLI command implementations

pub mod activate;
pub mod delete;
pub mod generate_key;
pub mod get;
pub mod info;
pub mod list;
pub mod put;
pub mod server;
