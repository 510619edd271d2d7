// Request bodies accepted by the control handlers
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerSetupRequest {
    pub peers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewActorRequest {
    pub actor_type: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default)]
    pub deploy_args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrateRequest {
    pub peer_node_id: String,
}

/// Port connection request.
///
/// Every field is optional and an absent key is the same as an explicit `null`:
/// the node receives all nine fields, unset ones as `None`. No check is made that
/// the given combination identifies a port unambiguously; that is left to the
/// node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectRequest {
    pub actor_id: Option<String>,
    pub port_name: Option<String>,
    pub port_dir: Option<String>,
    pub port_id: Option<String>,
    pub peer_node_id: Option<String>,
    pub peer_actor_id: Option<String>,
    pub peer_port_name: Option<String>,
    pub peer_port_dir: Option<String>,
    pub peer_port_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisconnectRequest {
    pub actor_id: Option<String>,
    pub port_name: Option<String>,
    pub port_dir: Option<String>,
    pub port_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetPortPropertyRequest {
    pub actor_id: String,
    pub port_type: String,
    pub port_name: String,
    pub port_property: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub script: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_connect_defaults_every_absent_field() {
        let req: ConnectRequest =
            serde_json::from_value(json!({"actor_id": "a1", "port_name": "out"})).unwrap();
        assert_eq!(req.actor_id.as_deref(), Some("a1"));
        assert_eq!(req.port_name.as_deref(), Some("out"));
        assert_eq!(
            req,
            ConnectRequest {
                actor_id: Some("a1".to_string()),
                port_name: Some("out".to_string()),
                ..ConnectRequest::default()
            }
        );
        let echoed = serde_json::to_value(&req).unwrap();
        assert_eq!(echoed.as_object().unwrap().len(), 9);
        assert!(echoed["peer_port_id"].is_null());
    }

    #[test]
    fn test_new_actor_args_default_to_null() {
        let req: NewActorRequest =
            serde_json::from_value(json!({"actor_type": "std.Counter"})).unwrap();
        assert!(req.args.is_null());
        assert!(req.deploy_args.is_null());
    }

    #[test]
    fn test_peer_setup_requires_peers() {
        assert!(serde_json::from_value::<PeerSetupRequest>(json!({})).is_err());
    }
}
