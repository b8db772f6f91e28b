// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Confirmation tokens for destructive operations.
//!
//! A confirmation token is not a security feature: it is a request digest
//! with a timestamp, required so that deleting a secret is always a two-step
//! interaction. Run the command once to obtain the token, then re-run it with
//! the token appended. Tokens expire after roughly one minute as a hedge
//! against copy-paste from old script output or shell history. No secret key
//! is mixed into the digest; anyone who can run the command can mint one.

use sha2::{Digest, Sha256};

use crate::config::CONFIRM_WINDOW_SECS;
use crate::error::{Error, Result};

/// Generate the confirmation token for a canonical request string.
///
/// Token format: `<hex-time-window>.<hex-8-byte-digest>`. The time window is
/// the current unix time rounded up to the next minute bucket, with one extra
/// bucket of slack so a token minted late in a minute survives into the next.
pub fn generate(request: &str) -> String {
    token_at(request, chrono::Utc::now().timestamp())
}

/// Verify a supplied token against the current time window.
///
/// An empty token yields [`Error::ConfirmationRequired`] carrying a freshly
/// generated token; any mismatch (including a token from an adjacent window)
/// yields [`Error::ConfirmationMismatch`] carrying the currently expected
/// token. Callers should retry with the embedded token rather than reusing a
/// rejected one.
pub fn verify(request: &str, token: &str) -> Result<()> {
    let want = generate(request);
    if token.is_empty() {
        return Err(Error::ConfirmationRequired {
            request: request.to_string(),
            token: want,
        });
    }
    if token != want {
        return Err(Error::ConfirmationMismatch {
            request: request.to_string(),
            token: want,
        });
    }
    Ok(())
}

/// Canonical request string for deleting every version of a secret.
pub fn delete_secret_request(name: &str) -> String {
    format!("delete-secret:{name}")
}

/// Canonical request string for deleting one version of a secret.
pub fn delete_version_request(name: &str, version: u32) -> String {
    format!("delete-version:{name}:{version}")
}

fn token_at(request: &str, now_unix: i64) -> String {
    let window = (now_unix + 2 * CONFIRM_WINDOW_SECS - 1) / CONFIRM_WINDOW_SECS;
    let digest = Sha256::digest(request.as_bytes());
    format!("{window:x}.{}", hex::encode(&digest[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_within_a_window() {
        // Second 10 and second 50 of the same minute bucket.
        let base = 1_700_000_040; // a minute boundary
        let t1 = token_at("delete-secret:alpha", base + 10);
        let t2 = token_at("delete-secret:alpha", base + 50);
        assert_eq!(t1, t2);
    }

    #[test]
    fn rejected_across_window_boundary() {
        let base = 1_700_000_040;
        let early = token_at("delete-secret:alpha", base + 10);
        let next_bucket = token_at("delete-secret:alpha", base + 65);
        assert_ne!(early, next_bucket);
    }

    #[test]
    fn distinct_requests_distinct_tokens() {
        let now = 1_700_000_000;
        let a = token_at("delete-secret:alpha", now);
        let b = token_at("delete-secret:beta", now);
        let v = token_at("delete-version:alpha:3", now);
        assert_ne!(a, b);
        assert_ne!(a, v);
        // Same window prefix though, since the time is identical.
        assert_eq!(a.split('.').next(), b.split('.').next());
    }

    #[test]
    fn verify_accepts_fresh_token() {
        let req = delete_version_request("alpha", 2);
        let token = generate(&req);
        verify(&req, &token).unwrap();
    }

    #[test]
    fn verify_empty_token_embeds_current() {
        let req = delete_secret_request("alpha");
        match verify(&req, "") {
            Err(Error::ConfirmationRequired { request, token }) => {
                assert_eq!(request, req);
                assert_eq!(token, generate(&req));
            }
            other => panic!("expected ConfirmationRequired, got {other:?}"),
        }
    }

    #[test]
    fn verify_rejects_stale_token() {
        let req = delete_secret_request("alpha");
        // A token minted two buckets ago can never match the current window.
        let stale = token_at(&req, chrono::Utc::now().timestamp() - 3 * 60);
        match verify(&req, &stale) {
            Err(Error::ConfirmationMismatch { token, .. }) => {
                assert_eq!(token, generate(&req));
            }
            other => panic!("expected ConfirmationMismatch, got {other:?}"),
        }
    }

    #[test]
    fn token_shape() {
        let token = token_at("delete-secret:alpha", 1_700_000_000);
        let (window, digest) = token.split_once('.').unwrap();
        assert!(window.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest.len(), 16); // 8 bytes, hex encoded
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn request_strings_are_canonical() {
        assert_eq!(delete_secret_request("db-pass"), "delete-secret:db-pass");
        assert_eq!(
            delete_version_request("db-pass", 7),
            "delete-version:db-pass:7"
        );
    }
}
