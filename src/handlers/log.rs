use super::{HandlerContext, Reply};
use crate::dispatcher::Responder;
use crate::error::ControlError;
use crate::server::ParsedRequest;

/// `GET /log`: the dispatcher moves the connection into the log sink.
pub(super) fn get_log(
    _ctx: &HandlerContext,
    _responder: &Responder,
    _request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    Ok(Reply::Stream)
}
