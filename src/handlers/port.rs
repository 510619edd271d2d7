use tracing::debug;

use super::types::{ConnectRequest, DisconnectRequest, SetPortPropertyRequest};
use super::{capture, decode_body, ok_result, reply_with_value, HandlerContext, Reply};
use crate::dispatcher::Responder;
use crate::error::ControlError;
use crate::server::ParsedRequest;

/// `GET /actor/{uuid}/port/{uuid}`: the lookup key is the port id.
pub(super) fn get_port(
    ctx: &HandlerContext,
    responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    let port_id = capture(request, 1)?;
    ctx.node
        .storage()
        .get_port(port_id, reply_with_value(responder));
    Ok(Reply::Deferred)
}

pub(super) fn connect(
    ctx: &HandlerContext,
    _responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    let body: ConnectRequest = decode_body(request)?;
    debug!(request = ?body, "Port connect");
    ctx.node.connect(body);
    Ok(ok_result())
}

pub(super) fn disconnect(
    ctx: &HandlerContext,
    _responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    let body: DisconnectRequest = decode_body(request)?;
    debug!(request = ?body, "Port disconnect");
    ctx.node.disconnect(body);
    Ok(ok_result())
}

pub(super) fn set_port_property(
    ctx: &HandlerContext,
    _responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    let body: SetPortPropertyRequest = decode_body(request)?;
    ctx.node.actors().set_port_property(body);
    Ok(ok_result())
}
