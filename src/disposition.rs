// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Whitespace disposition for to-be-stored secret values.
//!
//! Applied on the write path only, before a value is sent to the server.
//! Binary payloads are never inspected or altered; plain UTF-8 text with
//! leading or trailing whitespace requires the caller to choose between
//! `--verbatim` and `--trim-space`. Use `--verbatim` for values where the
//! whitespace matters, such as PEM certificates and SSH keys.

use crate::error::{Error, Result};

/// Decide how surrounding whitespace in a secret value is handled.
///
/// Returns the value unchanged if it is not valid UTF-8 or carries no
/// surrounding whitespace. Otherwise `verbatim` wins over `trim`; with
/// neither set the caller gets [`Error::AmbiguousWhitespace`] naming both
/// override flags.
pub fn dispose_text(raw: &[u8], verbatim: bool, trim: bool) -> Result<Vec<u8>> {
    let Ok(text) = std::str::from_utf8(raw) else {
        return Ok(raw.to_vec()); // binary value, always handled verbatim
    };
    let trimmed = text.trim();
    if trimmed.len() == raw.len() {
        return Ok(raw.to_vec()); // no surrounding whitespace, leave it alone
    }
    if verbatim {
        return Ok(raw.to_vec());
    }
    if trim {
        return Ok(trimmed.as_bytes().to_vec());
    }
    Err(Error::AmbiguousWhitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_passes_through_regardless_of_flags() {
        let raw = [0xff, 0xfe, b'x', 0x00, 0x00];
        assert_eq!(dispose_text(&raw, false, false).unwrap(), raw);
        assert_eq!(dispose_text(&raw, true, false).unwrap(), raw);
        assert_eq!(dispose_text(&raw, false, true).unwrap(), raw);
    }

    #[test]
    fn clean_text_unchanged() {
        assert_eq!(dispose_text(b"hello", false, false).unwrap(), b"hello");
    }

    #[test]
    fn surrounded_text_requires_a_choice() {
        let err = dispose_text(b"  hello\n", false, false).unwrap_err();
        assert!(matches!(err, Error::AmbiguousWhitespace));
    }

    #[test]
    fn verbatim_keeps_whitespace() {
        assert_eq!(
            dispose_text(b"  hello\n", true, false).unwrap(),
            b"  hello\n"
        );
    }

    #[test]
    fn trim_removes_whitespace() {
        assert_eq!(dispose_text(b"  hello\n", false, true).unwrap(), b"hello");
    }

    #[test]
    fn verbatim_wins_when_both_set() {
        assert_eq!(
            dispose_text(b"  hello\n", true, true).unwrap(),
            b"  hello\n"
        );
    }

    #[test]
    fn idempotent_on_own_outputs() {
        let once = dispose_text(b"\thello world \n", false, true).unwrap();
        let twice = dispose_text(&once, false, true).unwrap();
        assert_eq!(once, twice);

        let kept = dispose_text(b" pem data ", true, false).unwrap();
        let kept_again = dispose_text(&kept, true, false).unwrap();
        assert_eq!(kept, kept_again);
    }

    #[test]
    fn interior_whitespace_is_not_surrounding() {
        assert_eq!(
            dispose_text(b"hello world", false, false).unwrap(),
            b"hello world"
        );
    }
}
