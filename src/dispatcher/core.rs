use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info, warn};

use super::Responder;
use crate::error::ControlError;
use crate::handlers::{handler_for, HandlerContext, Reply};
use crate::ids::ConnectionHandle;
use crate::node::Node;
use crate::registry::SharedRegistry;
use crate::router::Router;
use crate::server::request::split_request;
use crate::server::response::{not_found_response, write_terminal};
use crate::server::{Listener, ParsedRequest};
use crate::sse::LogSink;

/// Counters for one pass of [`Control::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Connections pulled from the listener
    pub accepted: usize,
    /// Requests handed to a handler
    pub dispatched: usize,
    /// Requests answered with 404
    pub not_found: usize,
    /// Idle connections evicted because the transport was lost
    pub reaped: usize,
}

/// The control protocol state machine.
///
/// Owns the route table, the connection registry, the listener it accepts
/// from and the log sink. Nothing in here blocks: [`Control::tick`] is meant to
/// be called repeatedly by whatever drives the node.
pub struct Control {
    router: Router,
    registry: SharedRegistry,
    listener: Box<dyn Listener>,
    context: HandlerContext,
}

impl Control {
    pub fn new(node: Arc<dyn Node>, listener: Box<dyn Listener>) -> Self {
        let log_sink = Arc::new(LogSink::new(node.id()));
        Self {
            router: Router::new(),
            registry: SharedRegistry::new(),
            listener,
            context: HandlerContext { node, log_sink },
        }
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Sink that firing traces are published to.
    #[must_use]
    pub fn log_sink(&self) -> Arc<LogSink> {
        Arc::clone(&self.context.log_sink)
    }

    /// Run one scheduler pass.
    ///
    /// Accepts every pending connection, evicts idle connections whose
    /// transport is gone, then serves at most one request per connection that
    /// has one buffered.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::MalformedBody`] when a request body is not JSON.
    /// The offending connection is closed and evicted before returning; the
    /// connections not reached in this pass keep their data for the next one.
    pub fn tick(&mut self) -> Result<TickReport, ControlError> {
        let mut report = TickReport::default();

        while let Some(connection) = self.listener.try_accept() {
            let peer = connection.peer();
            let handle = self.registry.lock().insert(connection);
            info!(handle = %handle, peer = ?peer, "Control connection accepted");
            report.accepted += 1;
        }

        let reaped = self.registry.lock().reap_lost();
        for handle in &reaped {
            debug!(handle = %handle, "Evicted lost connection");
        }
        report.reaped = reaped.len();

        let ready = self.registry.lock().ready_handles();
        for handle in ready {
            let raw = self.registry.lock().take_request(handle);
            if let Some(raw) = raw {
                self.dispatch(handle, &raw, &mut report)?;
            }
        }

        Ok(report)
    }

    fn dispatch(
        &self,
        handle: ConnectionHandle,
        raw: &[u8],
        report: &mut TickReport,
    ) -> Result<(), ControlError> {
        let request = split_request(raw);

        let Some(route) = self.router.match_head(&request.head) else {
            report.not_found += 1;
            let connection = self.registry.lock().remove(handle);
            if let Some(mut connection) = connection {
                write_terminal(handle, connection.as_mut(), &not_found_response());
            }
            return Ok(());
        };

        let body = match request.decode_body() {
            Ok(body) => body,
            Err(source) => {
                let connection = self.registry.lock().remove(handle);
                if let Some(mut connection) = connection {
                    connection.close();
                }
                error!(
                    handle = %handle,
                    handler_name = route.route.handler_name(),
                    error = %source,
                    "Malformed request body, connection dropped"
                );
                return Err(ControlError::MalformedBody { handle, source });
            }
        };

        let parsed = ParsedRequest { route, body };
        let route_id = parsed.route.route;
        let responder = Responder::new(handle, route_id, self.registry.clone());
        let handler = handler_for(route_id);
        report.dispatched += 1;

        match handler(&self.context, &responder, &parsed) {
            Ok(Reply::Json(body)) => {
                responder.json(body);
            }
            Ok(Reply::Deferred) => {
                debug!(handle = %handle, handler_name = route_id.handler_name(), "Response deferred");
            }
            Ok(Reply::Stream) => {
                responder.promote_to_stream(&self.context.log_sink);
            }
            Err(err) if err.is_bad_request() => {
                warn!(handle = %handle, error = %err, "Rejected control request");
                responder.respond(400, &json!({"error": err.to_string()}));
            }
            Err(err) => {
                error!(handle = %handle, error = %err, "Control handler failed");
                responder.respond(500, &json!({"error": err.to_string()}));
            }
        }
        Ok(())
    }

    /// Close every tracked connection and the log subscription.
    pub fn shutdown(&mut self) {
        let drained = self.registry.lock().drain();
        let count = drained.len();
        for (handle, mut connection) in drained {
            debug!(handle = %handle, "Closing connection at shutdown");
            connection.close();
        }
        self.context.log_sink.clear();
        info!(closed = count, "Control shut down");
    }
}
