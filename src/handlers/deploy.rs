use serde_json::{json, Value};
use tracing::{info, warn};

use super::types::DeployRequest;
use super::{decode_body, HandlerContext, Reply};
use crate::dispatcher::Responder;
use crate::error::ControlError;
use crate::server::ParsedRequest;

/// `POST /deploy`: compile the script, then deploy it under the requested name
/// unless compilation reported errors.
pub(super) fn deploy(
    ctx: &HandlerContext,
    _responder: &Responder,
    request: &ParsedRequest,
) -> Result<Reply, ControlError> {
    let body: DeployRequest = decode_body(request)?;
    let compilation = ctx.node.compiler().compile(&body.script, &body.name);
    let mut errors = compilation.errors;
    let warnings = compilation.warnings;

    let application_id = if errors.is_empty() {
        let mut deployable = compilation.deployable;
        if let Some(fields) = deployable.as_object_mut() {
            fields.insert("name".to_string(), Value::String(body.name.clone()));
        }
        match ctx.node.deployer().deploy(deployable) {
            Ok(id) => {
                info!(name = %body.name, application_id = %id, "Application deployed");
                Some(id)
            }
            Err(err) => {
                warn!(name = %body.name, error = %err, "Deployment failed");
                errors.push(Value::String(format!("{err:#}")));
                None
            }
        }
    } else {
        warn!(name = %body.name, errors = errors.len(), "Script failed to compile");
        None
    };

    Ok(Reply::Json(json!({
        "application_id": application_id,
        "errors": errors,
        "warnings": warnings,
    })))
}
