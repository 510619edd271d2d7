use std::borrow::Cow;

use serde_json::Value;
use tracing::debug;

use crate::router::RouteMatch;

/// Separator between the request head and the body section.
pub const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// A raw request split into head text and body bytes.
#[derive(Debug, PartialEq, Eq)]
pub struct RawRequest<'a> {
    /// Request line and headers
    pub head: Cow<'a, str>,
    /// Bytes after the first blank line (empty if there is none)
    pub body: &'a [u8],
}

impl RawRequest<'_> {
    /// Decode the body section as JSON.
    ///
    /// A missing or whitespace-only body yields `Ok(None)`. Anything else must
    /// be valid JSON.
    pub fn decode_body(&self) -> Result<Option<Value>, serde_json::Error> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(self.body).map(Some)
    }
}

/// Split a buffered request at the first blank line (`\r\n\r\n`).
#[must_use]
pub fn split_request(raw: &[u8]) -> RawRequest<'_> {
    let (head, body) = match find_subsequence(raw, HEAD_TERMINATOR) {
        Some(pos) => (&raw[..pos], &raw[pos + HEAD_TERMINATOR.len()..]),
        None => (raw, &raw[raw.len()..]),
    };
    debug!(
        head_bytes = head.len(),
        body_bytes = body.len(),
        "Split control request"
    );
    RawRequest {
        head: String::from_utf8_lossy(head),
        body,
    }
}

/// Position of the first occurrence of `needle` in `haystack`.
#[must_use]
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// A routed request with its decoded body, as handed to a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    /// Route and captured identifiers
    pub route: RouteMatch,
    /// Decoded JSON body, if a body section was present
    pub body: Option<Value>,
}
