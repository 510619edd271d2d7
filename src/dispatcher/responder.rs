use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::ids::ConnectionHandle;
use crate::registry::SharedRegistry;
use crate::router::RouteId;
use crate::server::response::{json_response, not_found_response, write_stream_header, write_terminal};
use crate::sse::LogSink;

struct Pending {
    handle: ConnectionHandle,
    route: RouteId,
    registry: SharedRegistry,
    completed: AtomicBool,
}

impl Drop for Pending {
    fn drop(&mut self) {
        if *self.completed.get_mut() {
            return;
        }
        // Every clone is gone and nobody answered: the collaborator dropped its
        // callback. Free the connection rather than leak the registry entry.
        let connection = self.registry.lock().remove(self.handle);
        if let Some(mut connection) = connection {
            warn!(
                handle = %self.handle,
                route = self.route.handler_name(),
                "Response abandoned, closing connection"
            );
            connection.close();
        }
    }
}

/// Continuation for one in-flight request.
///
/// A `Responder` names the connection by handle only; it never borrows the
/// connection. Clones share a completed flag, so whichever clone answers first
/// writes the response and every later attempt is ignored. It is safe to answer
/// from any thread, at any time, including after the far end has gone away.
#[derive(Clone)]
pub struct Responder {
    inner: Arc<Pending>,
}

impl Responder {
    pub(crate) fn new(handle: ConnectionHandle, route: RouteId, registry: SharedRegistry) -> Self {
        Self {
            inner: Arc::new(Pending {
                handle,
                route,
                registry,
                completed: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn handle(&self) -> ConnectionHandle {
        self.inner.handle
    }

    #[must_use]
    pub fn route(&self) -> RouteId {
        self.inner.route
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.completed.load(Ordering::Acquire)
    }

    fn claim(&self) -> bool {
        let first = !self.inner.completed.swap(true, Ordering::AcqRel);
        if !first {
            debug!(handle = %self.inner.handle, "Response already written, ignoring");
        }
        first
    }

    fn finish(&self, bytes: &[u8]) -> bool {
        let connection = self.inner.registry.lock().remove(self.inner.handle);
        match connection {
            Some(mut connection) => write_terminal(self.inner.handle, connection.as_mut(), bytes),
            None => {
                debug!(handle = %self.inner.handle, "Connection already evicted, dropping response");
                false
            }
        }
    }

    /// Write `body` with `status`, close the connection and evict it.
    ///
    /// Returns whether bytes reached the transport. Never fails: a vanished or
    /// lost connection just drops the response.
    pub fn respond(&self, status: u16, body: &Value) -> bool {
        if !self.claim() {
            return false;
        }
        info!(
            handle = %self.inner.handle,
            route = self.inner.route.handler_name(),
            status,
            "Control response"
        );
        self.finish(&json_response(status, body))
    }

    /// `respond(200, body)`
    pub fn json(&self, body: Value) -> bool {
        self.respond(200, &body)
    }

    pub fn not_found(&self) -> bool {
        if !self.claim() {
            return false;
        }
        self.finish(&not_found_response())
    }

    /// Move the connection out of the registry and install it as the log
    /// subscriber, replacing any previous one.
    pub fn promote_to_stream(&self, sink: &LogSink) -> bool {
        if !self.claim() {
            return false;
        }
        let handle = self.inner.handle;
        let Some(mut connection) = self.inner.registry.lock().remove(handle) else {
            debug!(handle = %handle, "Connection evicted before log subscription");
            return false;
        };
        if !write_stream_header(handle, connection.as_mut()) {
            connection.close();
            return false;
        }
        if let Some(previous) = sink.subscribe(handle, connection) {
            debug!(handle = %handle, replaced = %previous, "Previous log subscriber superseded");
        }
        true
    }
}
