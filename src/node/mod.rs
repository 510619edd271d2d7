//! # Node Collaborators
//!
//! The control API exposes a runtime node but owns none of its logic. Everything
//! it does is delegated through the traits in this module:
//!
//! - [`Node`] - identity, peer setup, actor creation, port wiring, shutdown
//! - [`Storage`] - asynchronous lookups of nodes, applications, actors and ports
//! - [`ActorManager`] - local actor inventory and lifecycle
//! - [`PeerDirectory`] - links to peer nodes
//! - [`AppManager`] - deployed applications
//! - [`ScriptCompiler`] and [`Deployer`] - turning a script into a running application
//!
//! ## Callbacks
//!
//! Slow operations take a boxed callback and must return immediately. The
//! callback may fire later from any coroutine or thread, at most once. Dropping
//! it without calling it is allowed; the control server then closes the waiting
//! connection without a response.
//!
//! [`memory::MemoryNode`] implements every trait in-process and backs the
//! `brrtcontrol serve` command and the test suite.

pub mod memory;

use serde_json::Value;

use crate::handlers::types::{ConnectRequest, DisconnectRequest, SetPortPropertyRequest};

/// Completion of a storage lookup: the key that was looked up and the stored
/// value (`Value::Null` when absent).
pub type LookupCallback = Box<dyn FnOnce(String, Value) + Send + 'static>;

/// Completion of a long-running operation, carrying its status.
pub type StatusCallback = Box<dyn FnOnce(Value) + Send + 'static>;

/// Asynchronous key-value lookups in the distributed registry.
pub trait Storage: Send + Sync {
    fn get_node(&self, node_id: &str, callback: LookupCallback);
    fn get_application(&self, application_id: &str, callback: LookupCallback);
    fn get_actor(&self, actor_id: &str, callback: LookupCallback);
    fn get_port(&self, port_id: &str, callback: LookupCallback);
}

/// Actors hosted on this node.
pub trait ActorManager: Send + Sync {
    fn list_actors(&self) -> Vec<String>;
    fn destroy(&self, actor_id: &str);
    /// Actor-defined report; `Value::Null` for unknown actors.
    fn report(&self, actor_id: &str) -> Value;
    fn migrate(&self, actor_id: &str, peer_node_id: &str, callback: StatusCallback);
    fn disable(&self, actor_id: &str);
    fn set_port_property(&self, request: SetPortPropertyRequest);
}

/// Links from this node to its peers.
pub trait PeerDirectory: Send + Sync {
    fn list_links(&self) -> Vec<String>;
}

/// Applications deployed from this node.
pub trait AppManager: Send + Sync {
    fn list_applications(&self) -> Vec<String>;
    fn destroy(&self, application_id: &str);
}

/// Output of compiling a deployment script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compilation {
    /// Deployable description; a JSON object
    pub deployable: Value,
    pub errors: Vec<Value>,
    pub warnings: Vec<Value>,
}

impl Compilation {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

pub trait ScriptCompiler: Send + Sync {
    /// Compile `script`; `name` is used as the source file name in diagnostics.
    fn compile(&self, script: &str, name: &str) -> Compilation;
}

pub trait Deployer: Send + Sync {
    /// Deploy a compiled description and return the new application id.
    fn deploy(&self, deployable: Value) -> anyhow::Result<String>;
}

/// A runtime node as seen by the control API.
pub trait Node: Send + Sync {
    fn id(&self) -> String;

    /// Connect to the given peer URIs. Fire and forget.
    fn peer_setup(&self, peers: Vec<String>);

    /// Create an actor, returning its id when creation succeeded.
    fn new_actor(&self, actor_type: &str, args: Value, deploy_args: Value) -> Option<String>;

    fn connect(&self, request: ConnectRequest);
    fn disconnect(&self, request: DisconnectRequest);

    /// Begin node shutdown. Fire and forget.
    fn stop(&self);

    fn storage(&self) -> &dyn Storage;
    fn actors(&self) -> &dyn ActorManager;
    fn network(&self) -> &dyn PeerDirectory;
    fn apps(&self) -> &dyn AppManager;
    fn compiler(&self) -> &dyn ScriptCompiler;
    fn deployer(&self) -> &dyn Deployer;
}
