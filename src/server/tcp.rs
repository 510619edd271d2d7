//! TCP transport for the control server, built on `may::net`.
//!
//! An accept coroutine hands new sockets to the dispatcher through a `may`
//! channel. Each socket gets a reader coroutine that appends to a shared inbox;
//! the dispatcher only ever inspects that inbox, so nothing on the tick path
//! waits on the network.
//!
//! Framing: a request is complete once its head (`\r\n\r\n`) is buffered and,
//! if it declares a `Content-Length`, that many body bytes follow. A `POST` or
//! `PUT` without `Content-Length` is complete once its body parses as JSON, at
//! EOF, or after no new bytes have arrived for the body grace period. Other
//! verbs without `Content-Length` are complete at the head.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use may::coroutine::{self, JoinHandle};
use may::net::{TcpListener, TcpStream};
use may::sync::mpsc;
use serde::de::IgnoredAny;
use tracing::{debug, error, warn};

use super::request::{find_subsequence, HEAD_TERMINATOR};
use super::{Connection, Listener};
use crate::runtime_config::RuntimeConfig;

const READ_CHUNK: usize = 4096;

/// Length of the first complete request in `buf`, if there is one.
///
/// `eof` is whether the peer has finished sending; at EOF whatever is buffered
/// counts as the final request. `idle` is whether the body grace period has
/// passed since the last segment, which only completes an unframed body.
#[must_use]
pub fn frame_len(buf: &[u8], eof: bool, idle: bool) -> Option<usize> {
    if buf.is_empty() {
        return None;
    }
    let Some(pos) = find_subsequence(buf, HEAD_TERMINATOR) else {
        return eof.then_some(buf.len());
    };
    let head_end = pos + HEAD_TERMINATOR.len();
    let head = &buf[..pos];
    match content_length(head) {
        Some(len) if buf.len() >= head_end + len => Some(head_end + len),
        Some(_) => eof.then_some(buf.len()),
        None if !expects_body(head) => Some(buf.len()),
        None if body_is_complete(&buf[head_end..]) => Some(buf.len()),
        None => (eof || idle).then_some(buf.len()),
    }
}

fn content_length(head: &[u8]) -> Option<usize> {
    String::from_utf8_lossy(head).lines().skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// Verbs whose control routes read a JSON body.
fn expects_body(head: &[u8]) -> bool {
    head.starts_with(b"POST ") || head.starts_with(b"PUT ")
}

fn body_is_complete(body: &[u8]) -> bool {
    !body.iter().all(u8::is_ascii_whitespace) && serde_json::from_slice::<IgnoredAny>(body).is_ok()
}

#[derive(Default)]
struct Inbox {
    buf: Vec<u8>,
    eof: bool,
    failed: bool,
    closed: bool,
    last_read: Option<Instant>,
}

impl Inbox {
    fn idle(&self, grace: Duration) -> bool {
        self.last_read.is_some_and(|at| at.elapsed() >= grace)
    }

    fn frame(&self, grace: Duration) -> Option<usize> {
        frame_len(&self.buf, self.eof, self.idle(grace))
    }
}

/// One accepted control socket.
pub struct TcpConnection {
    stream: TcpStream,
    peer: Option<SocketAddr>,
    inbox: Arc<Mutex<Inbox>>,
    body_grace: Duration,
    awaiting: bool,
}

impl TcpConnection {
    /// Wrap `stream` and start its reader coroutine.
    pub fn open(stream: TcpStream, config: &RuntimeConfig) -> io::Result<Self> {
        let peer = stream.peer_addr().ok();
        let mut reader = stream.try_clone()?;
        let inbox = Arc::new(Mutex::new(Inbox::default()));
        let shared = Arc::clone(&inbox);
        let max_request_bytes = config.max_request_bytes;

        // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the may runtime.
        // The closure owns everything it touches and never uses thread-local storage.
        let reader_handle = unsafe {
            coroutine::Builder::new()
                .name("brrtc-conn-reader".to_owned())
                .stack_size(config.stack_size)
                .spawn(move || read_loop(&mut reader, &shared, max_request_bytes))
        }?;
        drop(reader_handle);

        Ok(Self {
            stream,
            peer,
            inbox,
            body_grace: config.body_grace,
            awaiting: false,
        })
    }

    fn inbox(&self) -> MutexGuard<'_, Inbox> {
        lock_inbox(&self.inbox)
    }
}

fn lock_inbox(inbox: &Mutex<Inbox>) -> MutexGuard<'_, Inbox> {
    inbox.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read_loop(reader: &mut TcpStream, inbox: &Mutex<Inbox>, max_request_bytes: usize) {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => {
                lock_inbox(inbox).eof = true;
                return;
            }
            Ok(n) => {
                let mut inbox = lock_inbox(inbox);
                if inbox.closed {
                    return;
                }
                inbox.buf.extend_from_slice(&chunk[..n]);
                inbox.last_read = Some(Instant::now());
                if inbox.buf.len() > max_request_bytes && frame_len(&inbox.buf, false, false).is_none() {
                    warn!(
                        buffered = inbox.buf.len(),
                        limit = max_request_bytes,
                        "Request exceeds size limit, dropping connection"
                    );
                    inbox.failed = true;
                    return;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                let mut inbox = lock_inbox(inbox);
                if !inbox.closed {
                    debug!(error = %err, "Control socket read failed");
                }
                inbox.failed = true;
                return;
            }
        }
    }
}

impl Connection for TcpConnection {
    fn data_available(&self) -> bool {
        let inbox = self.inbox();
        !inbox.failed && inbox.frame(self.body_grace).is_some()
    }

    fn take_request(&mut self) -> Vec<u8> {
        self.awaiting = true;
        let grace = self.body_grace;
        let mut inbox = self.inbox();
        match inbox.frame(grace) {
            Some(len) => inbox.buf.drain(..len).collect(),
            None => Vec::new(),
        }
    }

    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let result = self.stream.write_all(bytes).and_then(|()| self.stream.flush());
        if result.is_err() {
            self.inbox().failed = true;
        }
        result
    }

    fn close(&mut self) {
        self.inbox().closed = true;
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            debug!(peer = ?self.peer, error = %err, "Socket shutdown failed");
        }
    }

    /// Lost means the socket failed, was closed locally, or the peer hung up
    /// before sending a request.
    fn is_lost(&self) -> bool {
        let inbox = self.inbox();
        inbox.failed || inbox.closed || (inbox.eof && inbox.buf.is_empty() && !self.awaiting)
    }

    fn peer_gone(&self) -> bool {
        let inbox = self.inbox();
        inbox.failed || inbox.closed || inbox.eof
    }

    fn peer(&self) -> Option<String> {
        self.peer.map(|addr| addr.to_string())
    }
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        // The reader coroutine still holds a clone of the socket.
        if !self.inbox().closed {
            if let Err(err) = self.stream.shutdown(Shutdown::Both) {
                debug!(peer = ?self.peer, error = %err, "Socket shutdown on drop failed");
            }
        }
    }
}

/// Listener side: sockets accepted by a background coroutine.
pub struct TcpAcceptor {
    local_addr: SocketAddr,
    incoming: mpsc::Receiver<TcpConnection>,
    accept_handle: Option<JoinHandle<()>>,
}

impl TcpAcceptor {
    /// Bind `addr` and start accepting.
    pub fn bind(addr: SocketAddr, config: RuntimeConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let local_addr = listener.local_addr()?;
        let (tx, rx) = mpsc::channel();

        // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the may runtime.
        // The accept loop owns the listener and the sender; it holds no borrowed state.
        let accept_handle = unsafe {
            coroutine::Builder::new()
                .name("brrtc-accept".to_owned())
                .stack_size(config.stack_size)
                .spawn(move || {
                    for stream in listener.incoming() {
                        let stream = match stream {
                            Ok(stream) => stream,
                            Err(err) => {
                                warn!(error = %err, "Control accept failed");
                                continue;
                            }
                        };
                        match TcpConnection::open(stream, &config) {
                            Ok(connection) => {
                                if tx.send(connection).is_err() {
                                    debug!("Control dispatcher gone, stopping accept loop");
                                    return;
                                }
                            }
                            Err(err) => {
                                error!(error = %err, "Failed to start connection reader");
                            }
                        }
                    }
                })
        }?;

        Ok(Self {
            local_addr,
            incoming: rx,
            accept_handle: Some(accept_handle),
        })
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Listener for TcpAcceptor {
    fn try_accept(&mut self) -> Option<Box<dyn Connection>> {
        self.incoming
            .try_recv()
            .ok()
            .map(|connection| Box::new(connection) as Box<dyn Connection>)
    }
}

impl Drop for TcpAcceptor {
    fn drop(&mut self) {
        if let Some(handle) = self.accept_handle.take() {
            // SAFETY: may::CoroutineHandle::coroutine().cancel() is marked unsafe by the may runtime.
            // The accept coroutine owns only the listener and a channel sender, both of
            // which are released when it unwinds.
            unsafe {
                handle.coroutine().cancel();
            }
            if handle.join().is_err() {
                debug!(addr = %self.local_addr, "Accept coroutine ended by cancellation");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_head_waits() {
        assert_eq!(frame_len(b"", false, false), None);
        assert_eq!(frame_len(b"GET /id HTTP/1.0\r\n", false, true), None);
    }

    #[test]
    fn test_head_only_request() {
        let raw = b"GET /id HTTP/1.0\r\n\r\n";
        assert_eq!(frame_len(raw, false, false), Some(raw.len()));
    }

    #[test]
    fn test_content_length_bounds_the_body() {
        let raw = b"POST /peer_setup HTTP/1.0\r\nContent-Length: 4\r\n\r\n{}{}GET /id";
        let head = raw.len() - b"{}{}GET /id".len();
        assert_eq!(frame_len(raw, false, false), Some(head + 4));
    }

    #[test]
    fn test_short_body_waits_for_more() {
        let raw = b"POST /connect HTTP/1.0\r\ncontent-length: 10\r\n\r\n{}";
        assert_eq!(frame_len(raw, false, false), None);
        assert_eq!(frame_len(raw, false, true), None);
        assert_eq!(frame_len(raw, true, false), Some(raw.len()));
    }

    #[test]
    fn test_eof_flushes_partial_head() {
        assert_eq!(frame_len(b"GET /id HTTP/1.0", true, false), Some(16));
    }

    #[test]
    fn test_unframed_post_waits_for_its_body() {
        let head = b"POST /peer_setup HTTP/1.0\r\n\r\n";
        assert_eq!(frame_len(head, false, false), None);
        assert_eq!(frame_len(head, false, true), Some(head.len()));
        assert_eq!(frame_len(head, true, false), Some(head.len()));

        let partial = b"POST /peer_setup HTTP/1.0\r\n\r\n{\"peers\": [";
        assert_eq!(frame_len(partial, false, false), None);

        let whole = b"POST /peer_setup HTTP/1.0\r\n\r\n{\"peers\": []}";
        assert_eq!(frame_len(whole, false, false), Some(whole.len()));
    }

    #[test]
    fn test_unframed_get_is_complete_at_head() {
        let raw = b"DELETE /node HTTP/1.0\r\n\r\n";
        assert_eq!(frame_len(raw, false, false), Some(raw.len()));
    }

    #[test]
    fn test_idle_after_grace() {
        let mut inbox = Inbox::default();
        assert!(!inbox.idle(Duration::ZERO));
        inbox.last_read = Some(Instant::now());
        assert!(inbox.idle(Duration::ZERO));
        assert!(!inbox.idle(Duration::from_secs(60)));

        inbox.buf = b"POST /connect HTTP/1.0\r\n\r\n".to_vec();
        assert_eq!(inbox.frame(Duration::from_secs(60)), None);
        inbox.eof = true;
        assert_eq!(inbox.frame(Duration::from_secs(60)), Some(inbox.buf.len()));
    }
}
