//! Tests for the `/log` event stream: subscription, replacement, publishing
//! and loss of the subscriber.

mod common;

use common::Harness;
use serde_json::{json, Value};

const LOG: &str = "GET /log HTTP/1.0\r\n\r\n";

fn frames(text: &str) -> Vec<Value> {
    let (_, stream) = text.split_once("\r\n\r\n").unwrap();
    stream
        .split("\n\n")
        .filter(|f| !f.is_empty())
        .map(|f| serde_json::from_str(f.strip_prefix("data: ").unwrap()).unwrap())
        .collect()
}

#[test]
fn test_log_request_opens_stream() {
    let mut harness = Harness::new("n1");
    let peer = harness.call(LOG);

    let text = peer.written_text();
    assert!(text.starts_with("HTTP/1.0 200 OK\r\nContent-Type: text/event-stream\r\n"));
    assert!(text.contains("Access-Control-Allow-Origin: *\r\n"));
    assert!(text.ends_with("\r\n\r\n"));
    assert!(!peer.is_closed());
    assert_eq!(harness.registry_len(), 0);
    assert!(harness.control.log_sink().is_subscribed());
}

#[test]
fn test_publish_writes_one_frame_per_firing() {
    let mut harness = Harness::new("n1");
    let peer = harness.call(LOG);
    let sink = harness.control.log_sink();

    assert!(sink.publish("src", "emit", 1, 0, json!([42])));
    assert!(sink.publish("snk", "log", 0, 1, Value::Null));

    let frames = frames(&peer.written_text());
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["node_id"], "n1");
    assert_eq!(frames[0]["type"], "fire");
    assert_eq!(frames[0]["actor"], "src");
    assert_eq!(frames[0]["action_method"], "emit");
    assert_eq!(frames[0]["produced"], 1);
    assert_eq!(frames[0]["consumed"], 0);
    assert_eq!(frames[0]["production"], json!([42]));
    assert_eq!(frames[1]["actor"], "snk");
    assert_eq!(frames[0]["timestamp"].as_str().unwrap().len(), 19);
    assert!(!peer.is_closed());
}

#[test]
fn test_second_subscriber_replaces_first() {
    let mut harness = Harness::new("n1");
    let first = harness.call(LOG);
    let second = harness.call(LOG);
    let sink = harness.control.log_sink();

    sink.publish("src", "emit", 1, 0, Value::Null);

    assert!(frames(&first.written_text()).is_empty());
    assert_eq!(frames(&second.written_text()).len(), 1);
    assert!(!first.is_closed());
    assert_eq!(sink.superseded(), 1);

    first.hang_up();
    sink.publish("src", "emit", 1, 0, Value::Null);
    assert_eq!(sink.superseded(), 0);
    assert_eq!(frames(&second.written_text()).len(), 2);
}

#[test]
fn test_publish_without_subscriber_is_noop() {
    let harness = Harness::new("n1");
    assert!(!harness.control.log_sink().publish("src", "emit", 1, 0, Value::Null));
}

#[test]
fn test_lost_subscriber_is_cleared_on_publish() {
    let mut harness = Harness::new("n1");
    let peer = harness.call(LOG);
    let sink = harness.control.log_sink();
    let header_len = peer.written().len();

    peer.hang_up();
    assert!(!sink.publish("src", "emit", 1, 0, Value::Null));
    assert!(!sink.is_subscribed());
    assert_eq!(peer.written().len(), header_len);
}

#[test]
fn test_log_stream_ignores_ticks_and_closes_at_shutdown() {
    let mut harness = Harness::new("n1");
    let peer = harness.call(LOG);
    peer.send("GET /id HTTP/1.0\r\n\r\n");
    let report = harness.control.tick().unwrap();
    assert_eq!(report.dispatched, 0);

    let successor = harness.call(LOG);

    harness.control.shutdown();
    assert!(peer.is_closed());
    assert!(successor.is_closed());
    assert!(!harness.control.log_sink().is_subscribed());
}
