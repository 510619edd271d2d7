//! Wire formatting and writing of control responses.
//!
//! Two shapes exist: a terminal response (status line, fixed headers, optional
//! JSON body, then the transport is closed) and the event-stream header that
//! opens the log channel and leaves the transport open.

use serde_json::Value;
use tracing::{debug, warn};

use super::Connection;
use crate::ids::ConnectionHandle;

const CORS_HEADERS: &str = "Access-Control-Allow-Methods: GET, POST, PUT, DELETE, OPTIONS\r\n\
                            Access-Control-Allow-Origin: *\r\n";

pub(crate) fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

/// Terminal JSON response with CORS headers.
#[must_use]
pub fn json_response(status: u16, body: &Value) -> Vec<u8> {
    let payload = body.to_string();
    let mut out = format!(
        "HTTP/1.0 {status} {}\r\nContent-Type: application/json\r\n{CORS_HEADERS}\r\n",
        status_reason(status)
    )
    .into_bytes();
    out.extend_from_slice(payload.as_bytes());
    out
}

/// Terminal 404 response with an empty body.
#[must_use]
pub fn not_found_response() -> Vec<u8> {
    format!("HTTP/1.0 404 Not Found\r\n{CORS_HEADERS}\r\n").into_bytes()
}

/// Header that opens a `text/event-stream` channel.
#[must_use]
pub fn stream_header() -> Vec<u8> {
    format!("HTTP/1.0 200 OK\r\nContent-Type: text/event-stream\r\n{CORS_HEADERS}\r\n")
        .into_bytes()
}

/// Write a terminal response and close the transport.
///
/// A connection already lost is closed without writing. Returns whether the
/// bytes were handed to the transport.
pub fn write_terminal(
    handle: ConnectionHandle,
    connection: &mut dyn Connection,
    bytes: &[u8],
) -> bool {
    if connection.is_lost() {
        warn!(handle = %handle, "Connection lost before response, dropping it");
        connection.close();
        return false;
    }
    let written = match connection.send(bytes) {
        Ok(()) => {
            debug!(handle = %handle, bytes = bytes.len(), "Response written");
            true
        }
        Err(err) => {
            warn!(handle = %handle, error = %err, "Failed to write response");
            false
        }
    };
    connection.close();
    written
}

/// Write the event-stream header, leaving the transport open.
pub fn write_stream_header(handle: ConnectionHandle, connection: &mut dyn Connection) -> bool {
    if connection.is_lost() {
        warn!(handle = %handle, "Log subscriber lost before stream header");
        return false;
    }
    match connection.send(&stream_header()) {
        Ok(()) => true,
        Err(err) => {
            warn!(handle = %handle, error = %err, "Failed to write stream header");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(400), "Bad Request");
        assert_eq!(status_reason(404), "Not Found");
    }

    #[test]
    fn test_json_response_layout() {
        let bytes = json_response(200, &json!({"id": "abc123"}));
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.0 200 OK\r\nContent-Type: application/json\r\n"));
        assert!(text.contains("Access-Control-Allow-Origin: *\r\n"));
        assert!(text.contains("Access-Control-Allow-Methods: GET, POST, PUT, DELETE, OPTIONS\r\n"));
        let (_, body) = text.split_once("\r\n\r\n").unwrap();
        assert_eq!(body, r#"{"id":"abc123"}"#);
    }

    #[test]
    fn test_not_found_has_no_body() {
        let text = String::from_utf8(not_found_response()).unwrap();
        assert!(text.starts_with("HTTP/1.0 404 Not Found\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
        assert!(!text.contains("Content-Type"));
    }

    #[test]
    fn test_stream_header_layout() {
        let text = String::from_utf8(stream_header()).unwrap();
        assert!(text.starts_with("HTTP/1.0 200 OK\r\nContent-Type: text/event-stream\r\n"));
        assert!(text.ends_with("Access-Control-Allow-Origin: *\r\n\r\n"));
    }
}
