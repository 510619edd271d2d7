//! Transport contract consumed by the control loop.
//!
//! The dispatcher never touches sockets directly. It sees accepted connections
//! through [`Listener`] and talks to each one through [`Connection`]. The TCP
//! implementation lives in [`super::tcp`]; tests plug in in-memory doubles.

use std::io;

/// One accepted, non-blocking transport connection.
///
/// All methods must return immediately. Reads are buffered by the transport; the
/// control loop only asks whether a complete request is waiting and takes it.
pub trait Connection: Send {
    /// Whether at least one complete request is buffered.
    fn data_available(&self) -> bool;

    /// Remove and return the next buffered request.
    ///
    /// Returns an empty buffer if nothing is available. Any bytes beyond the first
    /// request stay buffered for a later call.
    fn take_request(&mut self) -> Vec<u8>;

    /// Queue bytes for the peer.
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Close the transport. Idempotent.
    fn close(&mut self);

    /// Whether the transport has been torn down (by the peer, by an I/O error, or
    /// by [`close`](Connection::close)). Writes to a lost connection are skipped.
    fn is_lost(&self) -> bool;

    /// Whether the far end has gone away for good, including an orderly close
    /// after it sent its request. Long-lived streams use this to notice a
    /// departed subscriber.
    fn peer_gone(&self) -> bool {
        self.is_lost()
    }

    /// Peer description for logs.
    fn peer(&self) -> Option<String> {
        None
    }
}

/// Source of newly accepted connections.
pub trait Listener: Send {
    /// Take one pending accepted connection, if any, without blocking.
    fn try_accept(&mut self) -> Option<Box<dyn Connection>>;
}
