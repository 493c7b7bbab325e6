//! Session identifiers: generation, validation and cookie-value escaping.

use crate::error::{Result, SessionError};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::rngs::OsRng;
use rand::TryRngCore;
use std::fmt;

/// Identifiers must carry at least 256 bits of entropy
pub const MIN_ID_BYTES: usize = 32;

/// Longest identifier accepted from a client
pub const MAX_SID_LEN: usize = 512;

/// Query-component escaping: everything but alphanumerics and `-_.~`
const QUERY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Source of fresh session identifiers.
pub trait IdGenerator: Send + Sync + fmt::Debug {
    /// Produce a new unique, URL-safe identifier. Must fail rather than
    /// return a weak or empty one.
    fn generate(&self) -> Result<String>;
}

/// Identifiers from the operating system's CSPRNG, base64url-encoded.
#[derive(Debug, Clone)]
pub struct RandomIdGenerator {
    bytes: usize,
}

impl RandomIdGenerator {
    pub fn new(bytes: usize) -> Result<Self> {
        if bytes < MIN_ID_BYTES {
            return Err(SessionError::Config(format!(
                "session identifiers need at least {} random bytes (got {})",
                MIN_ID_BYTES, bytes
            )));
        }
        Ok(RandomIdGenerator { bytes })
    }
}

impl Default for RandomIdGenerator {
    fn default() -> Self {
        RandomIdGenerator { bytes: 64 }
    }
}

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> Result<String> {
        let mut buf = vec![0u8; self.bytes];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| SessionError::IdGeneration(e.to_string()))?;
        Ok(URL_SAFE.encode(&buf))
    }
}

/// Syntactic check for identifiers presented by clients.
pub fn is_valid_sid(sid: &str) -> bool {
    !sid.is_empty()
        && sid.len() <= MAX_SID_LEN
        && sid
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'='))
}

/// Escape an identifier for use as a cookie value
pub fn escape(sid: &str) -> String {
    utf8_percent_encode(sid, QUERY_ESCAPE).to_string()
}

/// Reverse [`escape`]. `+` decodes to a space, as in query strings.
pub fn unescape(value: &str) -> Option<String> {
    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

/// Decode a raw cookie value into an identifier, if it is one.
pub fn from_cookie_value(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    unescape(value).filter(|sid| is_valid_sid(sid))
}

/// Short prefix of an identifier for log lines
pub fn short(sid: &str) -> &str {
    sid.get(..8).unwrap_or(sid)
}
