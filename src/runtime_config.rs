//! # Runtime Configuration Module
//!
//! Environment-driven settings for the coroutines that serve the control API.
//!
//! ## Environment Variables
//!
//! ### `BRRTC_STACK_SIZE`
//!
//! Stack size for the tick, accept and per-connection reader coroutines.
//! Accepts decimal (`65536`) or hexadecimal (`0x10000`). Default: `0x10000`.
//!
//! ### `BRRTC_TICK_INTERVAL_MS`
//!
//! Pause between two dispatcher ticks, in milliseconds. Default: `5`.
//!
//! ### `BRRTC_MAX_REQUEST_BYTES`
//!
//! Upper bound on buffered bytes for a single request. A connection that
//! exceeds it without completing a request is dropped. Default: 1 MiB.
//!
//! ### `BRRTC_BODY_GRACE_MS`
//!
//! How long a `POST`/`PUT` without `Content-Length` may sit with an incomplete
//! body before it is dispatched as-is. The wait restarts with every segment
//! received and ends early at EOF. Default: `100`.
//!
//! ## Usage
//!
//! ```rust
//! use brrtcontrol::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.stack_size > 0);
//! ```

use std::env;
use std::time::Duration;

const DEFAULT_STACK_SIZE: usize = 0x10000;
const DEFAULT_TICK_INTERVAL_MS: u64 = 5;
const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;
const DEFAULT_BODY_GRACE_MS: u64 = 100;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes (default: 64 KB / 0x10000)
    pub stack_size: usize,
    /// Pause between dispatcher ticks
    pub tick_interval: Duration,
    /// Largest request a connection may buffer
    pub max_request_bytes: usize,
    /// Idle time after which an unframed body is taken as complete
    pub body_grace: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            body_grace: Duration::from_millis(DEFAULT_BODY_GRACE_MS),
        }
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal size.
fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    if let Some(hex) = val.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let stack_size = env::var("BRRTC_STACK_SIZE")
            .ok()
            .and_then(|v| parse_size(&v))
            .filter(|&n| n > 0)
            .unwrap_or(defaults.stack_size);
        let tick_interval = env::var("BRRTC_TICK_INTERVAL_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(defaults.tick_interval, Duration::from_millis);
        let max_request_bytes = env::var("BRRTC_MAX_REQUEST_BYTES")
            .ok()
            .and_then(|v| parse_size(&v))
            .filter(|&n| n > 0)
            .unwrap_or(defaults.max_request_bytes);
        let body_grace = env::var("BRRTC_BODY_GRACE_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(defaults.body_grace, Duration::from_millis);
        RuntimeConfig {
            stack_size,
            tick_interval,
            max_request_bytes,
            body_grace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("0x4000"), Some(0x4000));
        assert_eq!(parse_size("32768"), Some(32768));
        assert_eq!(parse_size(" 16 "), Some(16));
        assert_eq!(parse_size("big"), None);
        assert_eq!(parse_size("0xzz"), None);
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.stack_size, 0x10000);
        assert_eq!(config.tick_interval, Duration::from_millis(5));
        assert_eq!(config.max_request_bytes, 1 << 20);
        assert_eq!(config.body_grace, Duration::from_millis(100));
    }
}
