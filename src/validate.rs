#![forbid(unsafe_code)]

//! Strict format check for external video identifiers.
//!
//! The router already performs a loose length match on the path segment; this
//! module is the second, authoritative layer. Both layers stay in place on
//! purpose so a segment that slips through the path match (trailing
//! punctuation and similar quirks) still gets rejected here.

use std::fmt;

const MIN_ID_LEN: usize = 10;
const MAX_ID_LEN: usize = 11;

/// A validated external video identifier.
///
/// Instances only exist for tokens that passed [`validate`], so downstream
/// code (resolver, renderer) can splice the value into URLs without further
/// escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accepts tokens of 10 or 11 ASCII letters, digits, `-` or `_`; rejects
/// everything else. Pure and idempotent.
pub fn validate(token: &str) -> Option<VideoId> {
    if !(MIN_ID_LEN..=MAX_ID_LEN).contains(&token.len()) {
        return None;
    }
    if !token.bytes().all(is_id_byte) {
        return None;
    }
    Some(VideoId(token.to_string()))
}

fn is_id_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_'
}
