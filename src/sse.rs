//! # Log Stream Module
//!
//! Server-Sent Events channel carrying actor firing traces to a single
//! subscriber.
//!
//! ## Overview
//!
//! `GET /log` promotes its connection to the one and only log subscription: the
//! connection leaves the registry, receives a `text/event-stream` header, and is
//! then held open by the [`LogSink`]. Every call to [`LogSink::publish`] writes one
//! frame to it:
//!
//! ```text
//! data: {"timestamp":"2026-10-18 09:14:03","node_id":"...","type":"fire",...}
//!
//! ```
//!
//! ## Subscription policy
//!
//! - At most one subscriber. A new `GET /log` replaces the current one. The old
//!   connection gets no further frames and no notification: it is parked, still
//!   open, until its peer goes away.
//! - The sink never closes a subscriber itself. When the transport reports the
//!   peer gone, the next publish or subscribe forgets the connection.
//! - Publishing with no subscriber is a no-op.
//!
//! `publish` may be called from any coroutine or thread at any time. The slot is
//! a `may::sync::Mutex`, so a coroutine waiting on it (or blocked in a write
//! while holding it) parks instead of stalling a worker thread.
//!
//! ## Client-Side
//!
//! ```javascript
//! const events = new EventSource('http://127.0.0.1:5001/log');
//! events.onmessage = (event) => console.log(JSON.parse(event.data));
//! ```

use std::sync::PoisonError;

use may::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde_json::Value;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::ids::ConnectionHandle;
use crate::server::Connection;

/// Event type tag carried by firing traces.
pub const FIRE_EVENT: &str = "fire";

/// One actor firing, as serialized into a log frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiringEvent {
    /// Wall-clock time, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    pub node_id: String,
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub actor: String,
    pub action_method: String,
    pub produced: u64,
    pub consumed: u64,
    pub production: Value,
}

/// Format one `text/event-stream` frame.
#[must_use]
pub fn frame(data: &str) -> String {
    let mut out = String::with_capacity(data.len() + 8);
    out.push_str("data: ");
    out.push_str(data);
    out.push_str("\n\n");
    out
}

/// Local wall-clock time at second precision, falling back to UTC when the local
/// offset cannot be determined.
#[must_use]
pub fn timestamp_now() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_default()
}

struct Subscriber {
    handle: ConnectionHandle,
    connection: Box<dyn Connection>,
}

#[derive(Default)]
struct SinkState {
    current: Option<Subscriber>,
    /// Replaced subscribers, held open until their peer leaves
    superseded: Vec<Subscriber>,
}

impl SinkState {
    fn forget_departed(&mut self) {
        self.superseded.retain(|s| {
            let gone = s.connection.peer_gone();
            if gone {
                debug!(handle = %s.handle, "Superseded log subscriber left");
            }
            !gone
        });
    }
}

/// Single-subscriber sink for firing traces.
pub struct LogSink {
    node_id: String,
    state: Mutex<SinkState>,
}

impl LogSink {
    #[must_use]
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            state: Mutex::new(SinkState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `connection` as the log subscriber.
    ///
    /// Returns the handle of the subscriber it replaced, if any. The replaced
    /// connection is left open and receives nothing more.
    pub fn subscribe(
        &self,
        handle: ConnectionHandle,
        connection: Box<dyn Connection>,
    ) -> Option<ConnectionHandle> {
        let mut state = self.state();
        state.forget_departed();
        let previous = state.current.replace(Subscriber { handle, connection });
        let replaced = previous.map(|s| {
            let replaced = s.handle;
            state.superseded.push(s);
            replaced
        });
        info!(
            handle = %handle,
            replaced = ?replaced.map(|h| h.to_string()),
            "Log subscriber installed"
        );
        replaced
    }

    /// Handle of the current subscriber.
    #[must_use]
    pub fn subscriber(&self) -> Option<ConnectionHandle> {
        self.state().current.as_ref().map(|s| s.handle)
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.state().current.is_some()
    }

    /// Number of replaced subscribers whose peers are still connected.
    #[must_use]
    pub fn superseded(&self) -> usize {
        self.state().superseded.len()
    }

    /// Publish an actor firing to the subscriber.
    ///
    /// Returns whether a frame was written. With no subscriber this does nothing.
    pub fn publish(
        &self,
        actor: &str,
        action_method: &str,
        produced: u64,
        consumed: u64,
        production: Value,
    ) -> bool {
        let event = FiringEvent {
            timestamp: timestamp_now(),
            node_id: self.node_id.clone(),
            event_type: FIRE_EVENT,
            actor: actor.to_string(),
            action_method: action_method.to_string(),
            produced,
            consumed,
            production,
        };
        let data = match serde_json::to_string(&event) {
            Ok(data) => data,
            Err(err) => {
                warn!(error = %err, actor = %actor, "Failed to serialize firing event");
                return false;
            }
        };
        let frame = frame(&data);

        let mut state = self.state();
        state.forget_departed();
        let Some(subscriber) = state.current.as_mut() else {
            return false;
        };

        if subscriber.connection.peer_gone() {
            debug!(handle = %subscriber.handle, "Log subscriber lost, clearing slot");
            state.current = None;
            return false;
        }

        match subscriber.connection.send(frame.as_bytes()) {
            Ok(()) => true,
            Err(err) => {
                warn!(handle = %subscriber.handle, error = %err, "Failed to write log frame");
                false
            }
        }
    }

    /// Close and drop every subscriber, current and superseded. Used at
    /// shutdown only.
    pub fn clear(&self) {
        let mut state = self.state();
        let superseded = std::mem::take(&mut state.superseded);
        for mut subscriber in state.current.take().into_iter().chain(superseded) {
            subscriber.connection.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex as StdMutex};

    #[test]
    fn test_frame_format() {
        assert_eq!(frame(r#"{"a":1}"#), "data: {\"a\":1}\n\n");
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = timestamp_now();
        assert_eq!(ts.len(), 19, "{ts}");
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
        assert_eq!(&ts[13..14], ":");
    }

    #[test]
    fn test_event_serializes_type_tag() {
        let event = FiringEvent {
            timestamp: "2026-10-18 09:14:03".to_string(),
            node_id: "n1".to_string(),
            event_type: FIRE_EVENT,
            actor: "src".to_string(),
            action_method: "emit".to_string(),
            produced: 1,
            consumed: 0,
            production: json!([42]),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "fire");
        assert_eq!(value["production"], json!([42]));
    }

    #[test]
    fn test_publish_without_subscriber_is_noop() {
        let sink = LogSink::new("n1");
        assert!(!sink.publish("src", "emit", 1, 0, Value::Null));
        assert!(!sink.is_subscribed());
    }

    #[derive(Default)]
    struct Line {
        frames: usize,
        closed: bool,
        gone: bool,
    }

    struct LineConnection(Arc<StdMutex<Line>>);

    impl Connection for LineConnection {
        fn data_available(&self) -> bool {
            false
        }
        fn take_request(&mut self) -> Vec<u8> {
            Vec::new()
        }
        fn send(&mut self, _bytes: &[u8]) -> std::io::Result<()> {
            self.0.lock().unwrap().frames += 1;
            Ok(())
        }
        fn close(&mut self) {
            self.0.lock().unwrap().closed = true;
        }
        fn is_lost(&self) -> bool {
            self.0.lock().unwrap().closed
        }
        fn peer_gone(&self) -> bool {
            let line = self.0.lock().unwrap();
            line.closed || line.gone
        }
    }

    impl Drop for LineConnection {
        fn drop(&mut self) {
            // Mirrors the TCP transport, which shuts its socket down on drop.
            self.0.lock().unwrap().closed = true;
        }
    }

    fn line() -> (Box<dyn Connection>, Arc<StdMutex<Line>>) {
        let line = Arc::new(StdMutex::new(Line::default()));
        (Box::new(LineConnection(Arc::clone(&line))), line)
    }

    #[test]
    fn test_replaced_subscriber_stays_open_until_peer_leaves() {
        let sink = LogSink::new("n1");
        let (first, first_line) = line();
        let (second, second_line) = line();
        let first_handle = ConnectionHandle::new();
        sink.subscribe(first_handle, first);
        assert_eq!(sink.subscribe(ConnectionHandle::new(), second), Some(first_handle));

        assert!(sink.publish("src", "emit", 1, 0, Value::Null));
        assert!(!first_line.lock().unwrap().closed);
        assert_eq!(first_line.lock().unwrap().frames, 0);
        assert_eq!(second_line.lock().unwrap().frames, 1);
        assert_eq!(sink.superseded(), 1);

        first_line.lock().unwrap().gone = true;
        assert!(sink.publish("src", "emit", 1, 0, Value::Null));
        assert_eq!(sink.superseded(), 0);
    }

    #[test]
    fn test_clear_closes_current_and_superseded() {
        let sink = LogSink::new("n1");
        let (first, first_line) = line();
        let (second, second_line) = line();
        sink.subscribe(ConnectionHandle::new(), first);
        sink.subscribe(ConnectionHandle::new(), second);

        sink.clear();
        assert!(first_line.lock().unwrap().closed);
        assert!(second_line.lock().unwrap().closed);
        assert!(!sink.is_subscribed());
        assert_eq!(sink.superseded(), 0);
    }
}
