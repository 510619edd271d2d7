use serde_json::json;
use tracing::{debug, info};

use super::types::{MigrateRequest, NewActorRequest};
use super::{capture, decode_body, ok_result, reply_with_value, HandlerContext, Reply};
use crate::dispatcher::Responder;
use crate::error::ControlError;
use crate::server::ParsedRequest;

pub(super) fn new_actor(
    ctx: &HandlerContext,
    _responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    let body: NewActorRequest = decode_body(request)?;
    let actor_id = ctx
        .node
        .new_actor(&body.actor_type, body.args, body.deploy_args);
    info!(actor_type = %body.actor_type, actor_id = ?actor_id, "Actor created");
    Ok(Reply::Json(json!({"actor_id": actor_id})))
}

pub(super) fn get_actors(
    ctx: &HandlerContext,
    _responder: &Responder,
    _request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    Ok(Reply::Json(json!(ctx.node.actors().list_actors())))
}

pub(super) fn get_actor(
    ctx: &HandlerContext,
    responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    let actor_id = capture(request, 0)?;
    ctx.node
        .storage()
        .get_actor(actor_id, reply_with_value(responder));
    Ok(Reply::Deferred)
}

pub(super) fn del_actor(
    ctx: &HandlerContext,
    _responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    let actor_id = capture(request, 0)?;
    debug!(actor_id = %actor_id, "Destroying actor");
    ctx.node.actors().destroy(actor_id);
    Ok(ok_result())
}

pub(super) fn get_actor_report(
    ctx: &HandlerContext,
    _responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    Ok(Reply::Json(ctx.node.actors().report(capture(request, 0)?)))
}

pub(super) fn actor_migrate(
    ctx: &HandlerContext,
    responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    let actor_id = capture(request, 0)?;
    let body: MigrateRequest = decode_body(request)?;
    info!(actor_id = %actor_id, peer_node_id = %body.peer_node_id, "Actor migration requested");
    let responder = responder.clone();
    ctx.node.actors().migrate(
        actor_id,
        &body.peer_node_id,
        Box::new(move |status| {
            responder.json(json!({"result": status}));
        }),
    );
    Ok(Reply::Deferred)
}

pub(super) fn actor_disable(
    ctx: &HandlerContext,
    _responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    ctx.node.actors().disable(capture(request, 0)?);
    Ok(ok_result())
}
