// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Versioned secret store with envelope encryption at rest.
//!
//! The database is a single JSON file holding two sealed blobs: the
//! data-encryption key (DEK) wrapped by the KEK, and the secret table sealed
//! by the DEK. The KEK itself never touches disk. Every mutation persists
//! atomically (write-temp-then-rename) before it is acknowledged, and every
//! operation is recorded to the audit log with the caller's mesh identity.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditAction, AuditLog, AuditRecord};
use crate::error::{Error, Result};
use crate::kek::{ChaChaKek, Kek};

/// AAD binding the wrapped DEK blob to its role.
const DEK_AAD: &[u8] = b"coffer-dek";

/// AAD binding the sealed secret table to its role.
const DB_AAD: &[u8] = b"coffer-db";

/// Optional backup destination, threaded through as configuration for an
/// external backup hook. No backup client ships in this crate.
#[derive(Debug, Clone)]
pub struct BackupTarget {
    pub bucket: String,
    pub region: String,
    pub role: String,
}

/// Configuration for opening the store.
pub struct StoreConfig {
    /// Path of the database file.
    pub db_path: PathBuf,
    /// Key-encryption key wrapping the DEK.
    pub kek: Arc<dyn Kek>,
    /// Audit sink; one record per operation.
    pub audit: AuditLog,
    /// Backup destination, if configured.
    pub backup: Option<BackupTarget>,
}

/// Metadata for one secret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretInfo {
    pub name: String,
    pub active_version: u32,
    pub versions: Vec<u32>,
}

/// A secret value together with the version that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretValue {
    /// Base64 on the wire; raw bytes in memory via accessors.
    pub value: String,
    pub version: u32,
}

impl SecretValue {
    /// Decode the value bytes.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.value)
            .map_err(|e| Error::Storage(format!("corrupt value encoding: {e}")))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Secret {
    active: u32,
    /// Highest version number ever assigned. Numbers are never reused, even
    /// after the version holding one is deleted, so the audit history stays
    /// unambiguous.
    #[serde(default)]
    latest: u32,
    /// Version number to base64 value bytes.
    versions: BTreeMap<u32, String>,
}

/// On-disk layout of the database file.
#[derive(Serialize, Deserialize)]
struct DbFile {
    /// KEK-sealed DEK, base64.
    wrapped_dek: String,
    /// DEK-sealed JSON secret table, base64.
    sealed: String,
}

/// The secret store. All methods take the resolved caller principal so the
/// audit trail is complete.
pub struct Store {
    db_path: PathBuf,
    dek: ChaChaKek,
    wrapped_dek: Vec<u8>,
    secrets: BTreeMap<String, Secret>,
    audit: AuditLog,
    backup: Option<BackupTarget>,
}

impl Store {
    /// Open (or create) the database at `config.db_path`.
    ///
    /// A missing file yields an empty store with a freshly generated DEK,
    /// persisted immediately. An existing file is unwrapped with the KEK;
    /// a KEK that does not match fails with a crypto error rather than
    /// silently serving an empty table.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let StoreConfig {
            db_path,
            kek,
            audit,
            backup,
        } = config;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("creating {}: {e}", parent.display())))?;
        }

        if db_path.exists() {
            let file = File::open(&db_path)
                .map_err(|e| Error::Storage(format!("opening {}: {e}", db_path.display())))?;
            let db: DbFile = serde_json::from_reader(file)?;

            let wrapped_dek = BASE64
                .decode(&db.wrapped_dek)
                .map_err(|e| Error::Storage(format!("corrupt wrapped DEK: {e}")))?;
            let dek_bytes = kek.open(&wrapped_dek, DEK_AAD)?;
            let dek = ChaChaKek::new(&dek_bytes)?;

            let sealed = BASE64
                .decode(&db.sealed)
                .map_err(|e| Error::Storage(format!("corrupt database blob: {e}")))?;
            let table = dek.open(&sealed, DB_AAD)?;
            let secrets: BTreeMap<String, Secret> = serde_json::from_slice(&table)?;

            Ok(Self {
                db_path,
                dek,
                wrapped_dek,
                secrets,
                audit,
                backup,
            })
        } else {
            let mut dek_bytes = [0u8; 32];
            OsRng.fill_bytes(&mut dek_bytes);
            let wrapped_dek = kek.seal(&dek_bytes, DEK_AAD)?;
            let dek = ChaChaKek::new(&dek_bytes)?;

            let store = Self {
                db_path,
                dek,
                wrapped_dek,
                secrets: BTreeMap::new(),
                audit,
                backup,
            };
            store.persist()?;
            Ok(store)
        }
    }

    /// Whether a backup destination is configured.
    #[must_use]
    pub fn backup_target(&self) -> Option<&BackupTarget> {
        self.backup.as_ref()
    }

    /// Number of secrets.
    #[must_use]
    pub fn secret_count(&self) -> usize {
        self.secrets.len()
    }

    /// Total number of stored versions across all secrets.
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.secrets.values().map(|s| s.versions.len()).sum()
    }

    /// List metadata for all secrets, sorted by name.
    pub fn list(&self, caller: &str) -> Result<Vec<SecretInfo>> {
        self.audit.log(&AuditRecord::new(AuditAction::List, caller))?;
        Ok(self
            .secrets
            .iter()
            .map(|(name, secret)| info_of(name, secret))
            .collect())
    }

    /// Metadata for one secret.
    pub fn info(&self, caller: &str, name: &str) -> Result<SecretInfo> {
        let record = AuditRecord::new(AuditAction::Info, caller).with_secret(name);
        let Some(secret) = self.secrets.get(name) else {
            self.audit.log(&record.failed("not found"))?;
            return Err(not_found(name));
        };
        self.audit.log(&record)?;
        Ok(info_of(name, secret))
    }

    /// Get the active value of a secret.
    pub fn get(&self, caller: &str, name: &str) -> Result<SecretValue> {
        let secret = self.lookup(caller, name, None)?;
        value_of(secret, secret.active).ok_or_else(|| not_found(name))
    }

    /// Get a specific version of a secret.
    pub fn get_version(&self, caller: &str, name: &str, version: u32) -> Result<SecretValue> {
        let secret = self.lookup(caller, name, Some(version))?;
        value_of(secret, version)
            .ok_or_else(|| Error::NotFound(format!("secret {name:?} version {version}")))
    }

    /// Get the active value only if it differs from `since`.
    pub fn get_if_changed(&self, caller: &str, name: &str, since: u32) -> Result<SecretValue> {
        let secret = self.lookup(caller, name, None)?;
        if secret.active == since {
            return Err(Error::NotModified);
        }
        value_of(secret, secret.active).ok_or_else(|| not_found(name))
    }

    /// Store a new value, returning its version number. The first version of
    /// a secret becomes active automatically; later versions require an
    /// explicit activate.
    pub fn put(&mut self, caller: &str, name: &str, value: &[u8]) -> Result<u32> {
        if name.is_empty() {
            return Err(Error::Storage("secret name must not be empty".into()));
        }
        let secret = self.secrets.entry(name.to_string()).or_default();
        // max() covers database files written before the counter existed.
        let version = secret
            .latest
            .max(secret.versions.keys().next_back().copied().unwrap_or(0))
            + 1;
        secret.latest = version;
        secret.versions.insert(version, BASE64.encode(value));
        if version == 1 {
            secret.active = 1;
        }
        self.persist()?;
        self.audit.log(
            &AuditRecord::new(AuditAction::Put, caller)
                .with_secret(name)
                .with_version(version),
        )?;
        Ok(version)
    }

    /// Set the active version of a secret.
    pub fn activate(&mut self, caller: &str, name: &str, version: u32) -> Result<()> {
        let record = AuditRecord::new(AuditAction::Activate, caller)
            .with_secret(name)
            .with_version(version);
        let Some(secret) = self.secrets.get_mut(name) else {
            self.audit.log(&record.failed("not found"))?;
            return Err(not_found(name));
        };
        if !secret.versions.contains_key(&version) {
            self.audit.log(&record.failed("version not found"))?;
            return Err(Error::NotFound(format!(
                "secret {name:?} version {version}"
            )));
        }
        secret.active = version;
        self.persist()?;
        self.audit.log(&record)?;
        Ok(())
    }

    /// Delete one non-active version of a secret.
    pub fn delete_version(&mut self, caller: &str, name: &str, version: u32) -> Result<()> {
        let record = AuditRecord::new(AuditAction::DeleteVersion, caller)
            .with_secret(name)
            .with_version(version);
        let Some(secret) = self.secrets.get_mut(name) else {
            self.audit.log(&record.failed("not found"))?;
            return Err(not_found(name));
        };
        if secret.active == version {
            self.audit.log(&record.failed("version is active"))?;
            return Err(Error::ActiveVersion {
                name: name.to_string(),
                version,
            });
        }
        if secret.versions.remove(&version).is_none() {
            self.audit.log(&record.failed("version not found"))?;
            return Err(Error::NotFound(format!(
                "secret {name:?} version {version}"
            )));
        }
        self.persist()?;
        self.audit.log(&record)?;
        Ok(())
    }

    /// Delete a secret and all of its versions, including the active one.
    pub fn delete(&mut self, caller: &str, name: &str) -> Result<()> {
        let record = AuditRecord::new(AuditAction::DeleteSecret, caller).with_secret(name);
        if self.secrets.remove(name).is_none() {
            self.audit.log(&record.failed("not found"))?;
            return Err(not_found(name));
        }
        self.persist()?;
        self.audit.log(&record)?;
        Ok(())
    }

    fn lookup(&self, caller: &str, name: &str, version: Option<u32>) -> Result<&Secret> {
        let mut record = AuditRecord::new(AuditAction::Get, caller).with_secret(name);
        if let Some(v) = version {
            record = record.with_version(v);
        }
        let Some(secret) = self.secrets.get(name) else {
            self.audit.log(&record.failed("not found"))?;
            return Err(not_found(name));
        };
        self.audit.log(&record)?;
        Ok(secret)
    }

    /// Seal and atomically rewrite the database file.
    fn persist(&self) -> Result<()> {
        let table = serde_json::to_vec(&self.secrets)?;
        let sealed = self.dek.seal(&table, DB_AAD)?;
        let db = DbFile {
            wrapped_dek: BASE64.encode(&self.wrapped_dek),
            sealed: BASE64.encode(sealed),
        };

        // Write to a temp file first, then rename for atomicity.
        let temp_path = self.db_path.with_extension("tmp");
        {
            let file = File::create(&temp_path)
                .map_err(|e| Error::Storage(format!("creating {}: {e}", temp_path.display())))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &db)?;
            writer
                .flush()
                .map_err(|e| Error::Storage(format!("flushing database: {e}")))?;
        }
        std::fs::rename(&temp_path, &self.db_path)
            .map_err(|e| Error::Storage(format!("replacing database: {e}")))?;
        Ok(())
    }
}

fn info_of(name: &str, secret: &Secret) -> SecretInfo {
    SecretInfo {
        name: name.to_string(),
        active_version: secret.active,
        versions: secret.versions.keys().copied().collect(),
    }
}

fn value_of(secret: &Secret, version: u32) -> Option<SecretValue> {
    secret.versions.get(&version).map(|value| SecretValue {
        value: value.clone(),
        version,
    })
}

fn not_found(name: &str) -> Error {
    Error::NotFound(format!("secret {name:?}"))
}
