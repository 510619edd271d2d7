//! # Control Handlers
//!
//! One function per route. A handler gets the shared [`HandlerContext`], the
//! [`Responder`] for its connection, and the routed request. It either answers
//! straight away by returning [`Reply::Json`], hands a clone of the responder to
//! a node collaborator and returns [`Reply::Deferred`], or asks for the
//! connection to become the log stream with [`Reply::Stream`].
//!
//! Handlers never block. Anything that may take time goes through a callback.

mod actor;
mod application;
mod deploy;
mod log;
mod node;
mod port;
pub mod types;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::dispatcher::Responder;
use crate::error::ControlError;
use crate::node::{LookupCallback, Node};
use crate::router::RouteId;
use crate::server::ParsedRequest;
use crate::sse::LogSink;

/// What a handler did with its request.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Answer now with `200` and this body
    Json(Value),
    /// A collaborator holds the responder and will answer later
    Deferred,
    /// Turn the connection into the log subscription
    Stream,
}

/// State shared by every handler invocation.
#[derive(Clone)]
pub struct HandlerContext {
    pub node: Arc<dyn Node>,
    pub log_sink: Arc<LogSink>,
}

pub type HandlerFn =
    fn(&HandlerContext, &Responder, &ParsedRequest) -> Result<Reply, ControlError>;

/// Handler serving `route`.
#[must_use]
pub fn handler_for(route: RouteId) -> HandlerFn {
    match route {
        RouteId::GetLog => log::get_log,
        RouteId::GetNodeId => node::get_node_id,
        RouteId::GetNodes => node::get_nodes,
        RouteId::GetNode => node::get_node,
        RouteId::PeerSetup => node::peer_setup,
        RouteId::Quit => node::quit,
        RouteId::GetApplications => application::get_applications,
        RouteId::GetApplication => application::get_application,
        RouteId::DeleteApplication => application::del_application,
        RouteId::NewActor => actor::new_actor,
        RouteId::GetActors => actor::get_actors,
        RouteId::GetActor => actor::get_actor,
        RouteId::DeleteActor => actor::del_actor,
        RouteId::GetActorReport => actor::get_actor_report,
        RouteId::MigrateActor => actor::actor_migrate,
        RouteId::DisableActor => actor::actor_disable,
        RouteId::GetPort => port::get_port,
        RouteId::Connect => port::connect,
        RouteId::Disconnect => port::disconnect,
        RouteId::SetPortProperty => port::set_port_property,
        RouteId::Deploy => deploy::deploy,
    }
}

/// `{"result": "OK"}`
pub(crate) fn ok_result() -> Reply {
    Reply::Json(json!({"result": "OK"}))
}

/// Decode the request body into `T`. An absent body decodes as `{}`.
pub(crate) fn decode_body<T: DeserializeOwned>(
    request: &ParsedRequest,
) -> Result<T, ControlError> {
    let value = request.body.clone().unwrap_or_else(|| json!({}));
    serde_json::from_value(value).map_err(|source| ControlError::InvalidBody {
        handler: request.route.route.handler_name(),
        source,
    })
}

/// The `index`-th identifier captured from the path.
pub(crate) fn capture(request: &ParsedRequest, index: usize) -> Result<&str, ControlError> {
    request
        .route
        .capture(index)
        .ok_or(ControlError::MissingCapture {
            handler: request.route.route.handler_name(),
            index,
        })
}

/// Storage callback that answers with the looked-up value.
pub(crate) fn reply_with_value(responder: &Responder) -> LookupCallback {
    let responder = responder.clone();
    Box::new(move |_key, value| {
        responder.json(value);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Router;

    fn parsed(head: &str, body: Option<Value>) -> ParsedRequest {
        ParsedRequest {
            route: Router::new().match_head(head).unwrap(),
            body,
        }
    }

    #[test]
    fn test_absent_body_decodes_as_empty_object() {
        let req = parsed("POST /connect HTTP/1.0", None);
        let body: types::ConnectRequest = decode_body(&req).unwrap();
        assert_eq!(body, types::ConnectRequest::default());
    }

    #[test]
    fn test_missing_required_field_is_invalid_body() {
        let req = parsed("POST /peer_setup HTTP/1.0", Some(json!({"peer": []})));
        let err = decode_body::<types::PeerSetupRequest>(&req).unwrap_err();
        assert!(err.is_bad_request());
        assert!(err.to_string().contains("peer_setup"));
    }

    #[test]
    fn test_capture_lookup() {
        let req = parsed(
            "GET /actor/3fa85f64-5717-4562-b3fc-2c963f66afa6/port/8d0a7a45-1b1a-4c38-9f5e-2a3f1e0b9c11 HTTP/1.0",
            None,
        );
        assert_eq!(
            capture(&req, 1).unwrap(),
            "8d0a7a45-1b1a-4c38-9f5e-2a3f1e0b9c11"
        );
        assert!(matches!(
            capture(&req, 2),
            Err(ControlError::MissingCapture { index: 2, .. })
        ));
    }
}
