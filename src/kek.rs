// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key-encryption-key (KEK) provisioning.
//!
//! The KEK is the authenticated-encryption primitive the store uses to wrap
//! its data-encryption key. It is provisioned exactly once at startup and
//! held in memory for the process lifetime; nothing in this module caches,
//! rotates, or persists it.
//!
//! Two operating modes exist, made unrepresentable-by-accident with a tagged
//! enum: `Development` yields a labeled passthrough that performs no
//! encryption, and `Production` reads a serialized keyset from a trusted
//! stream (normally stdin) and builds ChaCha20-Poly1305 from it.

use std::io::{Read, Write};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Label prepended by the development KEK so its output is recognizable as
/// unprotected in any hex dump.
const DEV_KEK_LABEL: &[u8] = b"coffer-dev-only-insecure-kek:";

/// Keyset algorithm name accepted for production keys.
const CHACHA20_POLY1305: &str = "chacha20poly1305";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Authenticated-encryption capability used to wrap the store's keys.
pub trait Kek: Send + Sync {
    /// Encrypt `plaintext`, binding `aad` into the authentication tag.
    fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt and authenticate `ciphertext` produced by [`Kek::seal`].
    fn open(&self, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>>;

    /// Human-readable primitive label, surfaced in startup logs.
    fn label(&self) -> &'static str;
}

/// Operating mode chosen once at startup.
pub enum Mode {
    /// Dummy KEK, relaxed defaults. NOT SAFE for production use.
    Development,
    /// Real KEK built from a serialized keyset read from `key_stream`.
    Production {
        key_stream: Box<dyn Read + Send>,
    },
}

/// Serialized keyset, readable from a stream at startup and writable by the
/// offline `generate-key` step. Treated as an opaque blob by everything else.
#[derive(Debug, Serialize, Deserialize)]
pub struct Keyset {
    pub primary: KeyEntry,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeyEntry {
    pub algorithm: String,
    /// Base64-encoded raw key bytes.
    pub key: String,
}

/// Select or construct the KEK for the given mode.
pub fn provision(mode: Mode) -> Result<Arc<dyn Kek>> {
    match mode {
        Mode::Development => Ok(Arc::new(DevKek)),
        Mode::Production { mut key_stream } => {
            let mut raw = String::new();
            key_stream
                .read_to_string(&mut raw)
                .map_err(|e| Error::KeyMaterial(e.to_string()))?;
            let keyset: Keyset =
                serde_json::from_str(&raw).map_err(|e| Error::KeyMaterial(e.to_string()))?;
            Ok(Arc::new(ChaChaKek::from_keyset(&keyset)?))
        }
    }
}

/// Generate a fresh random production keyset and write it to `out`.
///
/// Offline provisioning step; never invoked during server startup.
pub fn generate_key(out: &mut dyn Write) -> Result<()> {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    let keyset = Keyset {
        primary: KeyEntry {
            algorithm: CHACHA20_POLY1305.to_string(),
            key: BASE64.encode(key),
        },
    };
    serde_json::to_writer_pretty(&mut *out, &keyset)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// ChaCha20-Poly1305 KEK. Output layout: 12-byte random nonce followed by
/// the ciphertext and tag.
pub struct ChaChaKek {
    cipher: ChaCha20Poly1305,
}

impl ChaChaKek {
    /// Build from raw key bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(Error::KeyConstruction(format!(
                "key must be {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        })
    }

    fn from_keyset(keyset: &Keyset) -> Result<Self> {
        if keyset.primary.algorithm != CHACHA20_POLY1305 {
            return Err(Error::KeyConstruction(format!(
                "unsupported algorithm {:?}",
                keyset.primary.algorithm
            )));
        }
        let key = BASE64
            .decode(&keyset.primary.key)
            .map_err(|e| Error::KeyMaterial(format!("key is not valid base64: {e}")))?;
        Self::new(&key)
    }
}

impl Kek for ChaChaKek {
    fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ct = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| Error::Crypto("encryption failed".into()))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ct.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ct);
        Ok(out)
    }

    fn open(&self, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN {
            return Err(Error::Crypto("ciphertext too short".into()));
        }
        let (nonce, ct) = ciphertext.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), Payload { msg: ct, aad })
            .map_err(|_| Error::Crypto("decryption failed, wrong key or tampered data".into()))
    }

    fn label(&self) -> &'static str {
        "chacha20poly1305"
    }
}

/// Development-only KEK: prepends a fixed label, performs no encryption.
///
/// Cannot be selected without the explicit `--dev` flag; [`Mode`] has no
/// other path to it.
pub struct DevKek;

impl Kek for DevKek {
    fn seal(&self, plaintext: &[u8], _aad: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(DEV_KEK_LABEL.len() + plaintext.len());
        out.extend_from_slice(DEV_KEK_LABEL);
        out.extend_from_slice(plaintext);
        Ok(out)
    }

    fn open(&self, ciphertext: &[u8], _aad: &[u8]) -> Result<Vec<u8>> {
        ciphertext
            .strip_prefix(DEV_KEK_LABEL)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::Crypto("data was not sealed by the dev KEK".into()))
    }

    fn label(&self) -> &'static str {
        "dev-only-insecure"
    }
}
