use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Opaque key for one active connection in the [`Registry`](crate::registry::Registry).
///
/// Backed by a ULID so handles are unique for the life of the process and sort by
/// accept time in logs.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub struct ConnectionHandle(pub ulid::Ulid);

impl ConnectionHandle {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for ConnectionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConnectionHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConnectionHandle {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = ulid::Ulid::from_string(s)?;
        Ok(ConnectionHandle(id))
    }
}

/// Mint a fresh identifier in canonical UUID text form (8-4-4-4-12 lowercase hex).
///
/// Used wherever this crate itself has to hand out actor, application or port ids
/// that must later be addressable through the `{uuid}` route captures.
#[must_use]
pub fn uuid_string() -> String {
    format_uuid(ulid::Ulid::new().0)
}

/// Format a 128-bit value as a hyphenated lowercase UUID string.
#[must_use]
pub fn format_uuid(value: u128) -> String {
    let hex = format!("{value:032x}");
    let mut out = String::with_capacity(36);
    for (i, ch) in hex.chars().enumerate() {
        if matches!(i, 8 | 12 | 16 | 20) {
            out.push('-');
        }
        out.push(ch);
    }
    out
}
