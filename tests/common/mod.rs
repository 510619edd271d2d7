#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use brrtcontrol::dispatcher::Control;
use brrtcontrol::node::memory::MemoryNode;
use brrtcontrol::node::Node;
use brrtcontrol::server::{Connection, Listener};
use serde_json::Value;

#[derive(Default)]
struct Wire {
    inbound: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    closed: bool,
    hung_up: bool,
}

/// Server side of an in-memory connection.
pub struct MemoryConnection {
    wire: Arc<Mutex<Wire>>,
}

impl Connection for MemoryConnection {
    fn data_available(&self) -> bool {
        !self.wire.lock().unwrap().inbound.is_empty()
    }

    fn take_request(&mut self) -> Vec<u8> {
        self.wire
            .lock()
            .unwrap()
            .inbound
            .pop_front()
            .unwrap_or_default()
    }

    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut wire = self.wire.lock().unwrap();
        if wire.closed || wire.hung_up {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        wire.written.extend_from_slice(bytes);
        Ok(())
    }

    fn close(&mut self) {
        self.wire.lock().unwrap().closed = true;
    }

    fn is_lost(&self) -> bool {
        let wire = self.wire.lock().unwrap();
        wire.closed || wire.hung_up
    }

    fn peer(&self) -> Option<String> {
        Some("memory".to_string())
    }
}

/// Client side of an in-memory connection.
#[derive(Clone)]
pub struct MemoryPeer {
    wire: Arc<Mutex<Wire>>,
}

impl MemoryPeer {
    /// Queue one complete request.
    pub fn send(&self, request: &str) {
        self.wire
            .lock()
            .unwrap()
            .inbound
            .push_back(request.as_bytes().to_vec());
    }

    pub fn hang_up(&self) {
        self.wire.lock().unwrap().hung_up = true;
    }

    pub fn written(&self) -> Vec<u8> {
        self.wire.lock().unwrap().written.clone()
    }

    pub fn written_text(&self) -> String {
        String::from_utf8(self.written()).unwrap()
    }

    pub fn is_closed(&self) -> bool {
        self.wire.lock().unwrap().closed
    }

    /// Parse the single terminal response written to this connection.
    pub fn response(&self) -> Response {
        parse_response(&self.written_text())
    }
}

/// In-memory listener; clones share the accept queue.
#[derive(Clone, Default)]
pub struct MemoryListener {
    pending: Arc<Mutex<VecDeque<MemoryConnection>>>,
}

impl MemoryListener {
    /// Open a new connection, to be accepted on the next tick.
    pub fn connect(&self) -> MemoryPeer {
        let wire = Arc::new(Mutex::new(Wire::default()));
        self.pending.lock().unwrap().push_back(MemoryConnection {
            wire: Arc::clone(&wire),
        });
        MemoryPeer { wire }
    }

    /// Open a connection that has already sent `request`.
    pub fn request(&self, request: &str) -> MemoryPeer {
        let peer = self.connect();
        peer.send(request);
        peer
    }
}

impl Listener for MemoryListener {
    fn try_accept(&mut self) -> Option<Box<dyn Connection>> {
        self.pending
            .lock()
            .unwrap()
            .pop_front()
            .map(|c| Box::new(c) as Box<dyn Connection>)
    }
}

#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub fn parse_response(text: &str) -> Response {
    let (head, body) = text.split_once("\r\n\r\n").unwrap_or((text, ""));
    let mut lines = head.lines();
    let status_line = lines.next().unwrap_or_default();
    assert!(status_line.starts_with("HTTP/1.0 "), "{status_line}");
    let status = status_line
        .split_whitespace()
        .nth(1)
        .unwrap()
        .parse()
        .unwrap();
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();
    let body = if body.is_empty() {
        None
    } else {
        Some(serde_json::from_str(body).unwrap())
    };
    Response {
        status,
        headers,
        body,
    }
}

/// Control over a fresh in-memory node.
pub struct Harness {
    pub control: Control,
    pub listener: MemoryListener,
    pub node: Arc<MemoryNode>,
}

impl Harness {
    pub fn new(node_id: &str) -> Self {
        let node = Arc::new(MemoryNode::with_id(node_id));
        let listener = MemoryListener::default();
        let control_node: Arc<dyn Node> = Arc::clone(&node) as Arc<dyn Node>;
        let control = Control::new(control_node, Box::new(listener.clone()));
        Self {
            control,
            listener,
            node,
        }
    }

    pub fn tick(&mut self) {
        self.control.tick().unwrap();
    }

    /// Send `request` on a new connection, run one tick, return the peer.
    pub fn call(&mut self, request: &str) -> MemoryPeer {
        let peer = self.listener.request(request);
        self.tick();
        peer
    }

    pub fn registry_len(&self) -> usize {
        self.control.registry().lock().len()
    }
}

pub fn post(path: &str, body: &Value) -> String {
    format!("POST {path} HTTP/1.0\r\nContent-Type: application/json\r\n\r\n{body}")
}
