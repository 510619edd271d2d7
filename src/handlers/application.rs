use serde_json::json;

use super::{capture, ok_result, reply_with_value, HandlerContext, Reply};
use crate::dispatcher::Responder;
use crate::error::ControlError;
use crate::server::ParsedRequest;

pub(super) fn get_applications(
    ctx: &HandlerContext,
    _responder: &Responder,
    _request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    Ok(Reply::Json(json!(ctx.node.apps().list_applications())))
}

pub(super) fn get_application(
    ctx: &HandlerContext,
    responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    let application_id = capture(request, 0)?;
    ctx.node
        .storage()
        .get_application(application_id, reply_with_value(responder));
    Ok(Reply::Deferred)
}

pub(super) fn del_application(
    ctx: &HandlerContext,
    _responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    ctx.node.apps().destroy(capture(request, 0)?);
    Ok(ok_result())
}
