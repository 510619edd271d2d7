use serde_json::json;
use tracing::info;

use super::types::PeerSetupRequest;
use super::{capture, decode_body, ok_result, reply_with_value, HandlerContext, Reply};
use crate::dispatcher::Responder;
use crate::error::ControlError;
use crate::server::ParsedRequest;

pub(super) fn get_node_id(
    ctx: &HandlerContext,
    _responder: &Responder,
    _request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    Ok(Reply::Json(json!({"id": ctx.node.id()})))
}

pub(super) fn get_nodes(
    ctx: &HandlerContext,
    _responder: &Responder,
    _request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    Ok(Reply::Json(json!(ctx.node.network().list_links())))
}

pub(super) fn get_node(
    ctx: &HandlerContext,
    responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    let node_id = capture(request, 0)?;
    ctx.node
        .storage()
        .get_node(node_id, reply_with_value(responder));
    Ok(Reply::Deferred)
}

pub(super) fn peer_setup(
    ctx: &HandlerContext,
    _responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    let body: PeerSetupRequest = decode_body(request)?;
    info!(peers = ?body.peers, "Peer setup requested");
    ctx.node.peer_setup(body.peers);
    Ok(ok_result())
}

pub(super) fn quit(
    ctx: &HandlerContext,
    _responder: &Responder,
    _request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    info!(node_id = %ctx.node.id(), "Node stop requested over control API");
    ctx.node.stop();
    Ok(ok_result())
}
