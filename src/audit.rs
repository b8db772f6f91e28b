// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Append-only audit log for secret access and mutation.
//!
//! Records are JSONL, one object per line, written to a single file under
//! the server state directory. The writer is opened once at startup and
//! handed to the store; a failure to open is fatal, a failure to append is
//! surfaced to the request that caused it.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Audited operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AuditAction {
    List,
    Info,
    Get,
    Put,
    Activate,
    DeleteVersion,
    DeleteSecret,
}

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record ID.
    pub id: String,
    /// When the operation happened.
    pub timestamp: DateTime<Utc>,
    /// Operation performed.
    pub action: AuditAction,
    /// Mesh identity of the caller.
    pub principal: String,
    /// Secret the operation targeted, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Secret version the operation targeted, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if the operation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditRecord {
    /// Create a new successful record for `action` by `principal`.
    pub fn new(action: AuditAction, principal: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action,
            principal: principal.into(),
            secret: None,
            version: None,
            success: true,
            error: None,
        }
    }

    /// Set the target secret.
    pub fn with_secret(mut self, name: impl Into<String>) -> Self {
        self.secret = Some(name.into());
        self
    }

    /// Set the target version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Mark as failed with an error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Append-only JSONL audit writer.
pub struct AuditLog {
    file: Mutex<File>,
}

impl AuditLog {
    /// Open (creating if needed) the audit log at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|e| {
                Error::Identity(format!(
                    "opening audit log {}: {e}",
                    path.as_ref().display()
                ))
            })?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Append one record.
    pub fn log(&self, record: &AuditRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = self
            .file
            .lock()
            .map_err(|_| Error::Storage("audit log lock poisoned".into()))?;
        file.write_all(line.as_bytes())
            .map_err(|e| Error::Storage(format!("appending audit record: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn builder_sets_fields() {
        let record = AuditRecord::new(AuditAction::Put, "alice@mesh")
            .with_secret("db-pass")
            .with_version(3);
        assert_eq!(record.action, AuditAction::Put);
        assert_eq!(record.principal, "alice@mesh");
        assert_eq!(record.secret.as_deref(), Some("db-pass"));
        assert_eq!(record.version, Some(3));
        assert!(record.success);
    }

    #[test]
    fn failed_records_carry_the_error() {
        let record =
            AuditRecord::new(AuditAction::DeleteSecret, "bob@mesh").failed("not authorized");
        assert!(!record.success);
        assert_eq!(record.error.as_deref(), Some("not authorized"));
    }

    #[test]
    fn appends_one_json_object_per_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("audit.log");
        let log = AuditLog::open(&path).unwrap();

        log.log(&AuditRecord::new(AuditAction::Get, "alice@mesh").with_secret("a"))
            .unwrap();
        log.log(&AuditRecord::new(AuditAction::List, "bob@mesh"))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AuditRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.action, AuditAction::Get);
        assert_eq!(first.secret.as_deref(), Some("a"));

        let second: AuditRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.action, AuditAction::List);
        assert_eq!(second.secret, None);
    }

    #[test]
    fn reopening_appends_rather_than_truncating() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("audit.log");

        {
            let log = AuditLog::open(&path).unwrap();
            log.log(&AuditRecord::new(AuditAction::Put, "alice@mesh"))
                .unwrap();
        }
        {
            let log = AuditLog::open(&path).unwrap();
            log.log(&AuditRecord::new(AuditAction::Activate, "alice@mesh"))
                .unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn open_fails_for_unusable_path() {
        let temp = TempDir::new().unwrap();
        let err = AuditLog::open(temp.path().join("missing").join("audit.log"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Identity(_)));
    }
}
