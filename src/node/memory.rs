//! In-process node backing the `serve` command and tests.
//!
//! Every collaborator trait is implemented on [`MemoryNode`] over a plain map of
//! actors, applications and ports. Slow operations are not run inline: storage
//! lookups and migrations are queued and only fire when [`MemoryNode::run_pending`]
//! is called, which lets callers decide when "later" is.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{json, Value};
use tracing::{debug, info};

use super::{
    ActorManager, AppManager, Compilation, Deployer, LookupCallback, Node, PeerDirectory,
    ScriptCompiler, StatusCallback, Storage,
};
use crate::handlers::types::{ConnectRequest, DisconnectRequest, SetPortPropertyRequest};
use crate::ids::uuid_string;

/// A fire-and-forget call received by the node, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeCall {
    PeerSetup(Vec<String>),
    NewActor {
        actor_type: String,
        args: Value,
        deploy_args: Value,
    },
    DestroyActor(String),
    DisableActor(String),
    Migrate { actor_id: String, peer_node_id: String },
    SetPortProperty(SetPortPropertyRequest),
    Connect(ConnectRequest),
    Disconnect(DisconnectRequest),
    DestroyApplication(String),
    Stop,
}

#[derive(Debug, Clone, Copy)]
enum LookupKind {
    Node,
    Application,
    Actor,
    Port,
}

enum Deferred {
    Lookup {
        kind: LookupKind,
        key: String,
        callback: LookupCallback,
    },
    Migrate {
        actor_id: String,
        peer_node_id: String,
        callback: StatusCallback,
    },
}

#[derive(Default)]
struct MemoryState {
    nodes: BTreeMap<String, Value>,
    actors: BTreeMap<String, Value>,
    applications: BTreeMap<String, Value>,
    ports: BTreeMap<String, Value>,
    links: Vec<String>,
    calls: Vec<NodeCall>,
    stopped: bool,
}

impl MemoryState {
    fn lookup(&self, kind: LookupKind, key: &str) -> Value {
        let table = match kind {
            LookupKind::Node => &self.nodes,
            LookupKind::Application => &self.applications,
            LookupKind::Actor => &self.actors,
            LookupKind::Port => &self.ports,
        };
        table.get(key).cloned().unwrap_or(Value::Null)
    }
}

pub struct MemoryNode {
    id: String,
    state: Mutex<MemoryState>,
    pending: Mutex<VecDeque<Deferred>>,
}

impl Default for MemoryNode {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNode {
    /// A node with a freshly minted UUID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(uuid_string())
    }

    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut state = MemoryState::default();
        state.nodes.insert(id.clone(), json!({"id": id}));
        Self {
            id,
            state: Mutex::new(state),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Deferred>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: NodeCall) {
        self.state().calls.push(call);
    }

    /// Register a record for a remote node so `GET /node/{id}` can find it.
    pub fn add_node(&self, node_id: impl Into<String>, record: Value) {
        self.state().nodes.insert(node_id.into(), record);
    }

    /// Fire-and-forget calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<NodeCall> {
        self.state().calls.clone()
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state().stopped
    }

    /// Number of callbacks waiting for [`MemoryNode::run_pending`].
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue().len()
    }

    /// Fire every queued callback, oldest first. Returns how many fired.
    ///
    /// Callbacks run without any node lock held.
    pub fn run_pending(&self) -> usize {
        let batch: Vec<Deferred> = self.queue().drain(..).collect();
        let fired = batch.len();
        for deferred in batch {
            match deferred {
                Deferred::Lookup { kind, key, callback } => {
                    let value = self.state().lookup(kind, &key);
                    debug!(kind = ?kind, key = %key, found = !value.is_null(), "Lookup resolved");
                    callback(key, value);
                }
                Deferred::Migrate {
                    actor_id,
                    peer_node_id,
                    callback,
                } => {
                    let moved = self.state().actors.remove(&actor_id).is_some();
                    let status = if moved { "OK" } else { "NOT_FOUND" };
                    info!(actor_id = %actor_id, peer_node_id = %peer_node_id, status, "Migration finished");
                    callback(Value::String(status.to_string()));
                }
            }
        }
        fired
    }

    /// Drop every queued callback without calling it.
    pub fn discard_pending(&self) -> usize {
        let mut queue = self.queue();
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    fn defer_lookup(&self, kind: LookupKind, key: &str, callback: LookupCallback) {
        self.queue().push_back(Deferred::Lookup {
            kind,
            key: key.to_string(),
            callback,
        });
    }
}

impl Storage for MemoryNode {
    fn get_node(&self, node_id: &str, callback: LookupCallback) {
        self.defer_lookup(LookupKind::Node, node_id, callback);
    }

    fn get_application(&self, application_id: &str, callback: LookupCallback) {
        self.defer_lookup(LookupKind::Application, application_id, callback);
    }

    fn get_actor(&self, actor_id: &str, callback: LookupCallback) {
        self.defer_lookup(LookupKind::Actor, actor_id, callback);
    }

    fn get_port(&self, port_id: &str, callback: LookupCallback) {
        self.defer_lookup(LookupKind::Port, port_id, callback);
    }
}

impl ActorManager for MemoryNode {
    fn list_actors(&self) -> Vec<String> {
        self.state().actors.keys().cloned().collect()
    }

    fn destroy(&self, actor_id: &str) {
        let mut state = self.state();
        state.actors.remove(actor_id);
        state.calls.push(NodeCall::DestroyActor(actor_id.to_string()));
    }

    fn report(&self, actor_id: &str) -> Value {
        self.state()
            .actors
            .get(actor_id)
            .map_or(Value::Null, |actor| {
                json!({"actor_id": actor_id, "type": actor["type"], "enabled": actor["enabled"]})
            })
    }

    fn migrate(&self, actor_id: &str, peer_node_id: &str, callback: StatusCallback) {
        self.record(NodeCall::Migrate {
            actor_id: actor_id.to_string(),
            peer_node_id: peer_node_id.to_string(),
        });
        self.queue().push_back(Deferred::Migrate {
            actor_id: actor_id.to_string(),
            peer_node_id: peer_node_id.to_string(),
            callback,
        });
    }

    fn disable(&self, actor_id: &str) {
        let mut state = self.state();
        if let Some(actor) = state.actors.get_mut(actor_id) {
            actor["enabled"] = Value::Bool(false);
        }
        state.calls.push(NodeCall::DisableActor(actor_id.to_string()));
    }

    fn set_port_property(&self, request: SetPortPropertyRequest) {
        self.record(NodeCall::SetPortProperty(request));
    }
}

impl PeerDirectory for MemoryNode {
    fn list_links(&self) -> Vec<String> {
        self.state().links.clone()
    }
}

impl AppManager for MemoryNode {
    fn list_applications(&self) -> Vec<String> {
        self.state().applications.keys().cloned().collect()
    }

    fn destroy(&self, application_id: &str) {
        let mut state = self.state();
        state.applications.remove(application_id);
        state
            .calls
            .push(NodeCall::DestroyApplication(application_id.to_string()));
    }
}

impl ScriptCompiler for MemoryNode {
    fn compile(&self, script: &str, name: &str) -> Compilation {
        if script.trim().is_empty() {
            return Compilation {
                deployable: Value::Null,
                errors: vec![json!({"reason": "empty script", "source": name})],
                warnings: Vec::new(),
            };
        }
        Compilation {
            deployable: json!({"script": script, "actors": {}}),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl Deployer for MemoryNode {
    fn deploy(&self, deployable: Value) -> anyhow::Result<String> {
        let name = deployable
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("deployable has no name"))?
            .to_string();
        let application_id = uuid_string();
        self.state().applications.insert(
            application_id.clone(),
            json!({"id": application_id, "name": name, "origin_node_id": self.id}),
        );
        Ok(application_id)
    }
}

impl Node for MemoryNode {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn peer_setup(&self, peers: Vec<String>) {
        let mut state = self.state();
        for peer in &peers {
            if !state.links.contains(peer) {
                state.links.push(peer.clone());
            }
        }
        state.calls.push(NodeCall::PeerSetup(peers));
    }

    fn new_actor(&self, actor_type: &str, args: Value, deploy_args: Value) -> Option<String> {
        self.record(NodeCall::NewActor {
            actor_type: actor_type.to_string(),
            args: args.clone(),
            deploy_args,
        });
        if actor_type.is_empty() {
            return None;
        }
        let actor_id = uuid_string();
        self.state().actors.insert(
            actor_id.clone(),
            json!({
                "id": actor_id,
                "type": actor_type,
                "args": args,
                "node_id": self.id,
                "enabled": true,
            }),
        );
        Some(actor_id)
    }

    fn connect(&self, request: ConnectRequest) {
        let mut state = self.state();
        if let Some(port_id) = request.port_id.clone() {
            let peer = request.peer_port_id.clone();
            let port = state.ports.entry(port_id.clone()).or_insert_with(|| {
                json!({
                    "id": port_id,
                    "actor_id": request.actor_id,
                    "name": request.port_name,
                    "direction": request.port_dir,
                    "peers": [],
                })
            });
            if let (Some(peer), Some(peers)) = (peer, port["peers"].as_array_mut()) {
                peers.push(Value::String(peer));
            }
        }
        state.calls.push(NodeCall::Connect(request));
    }

    fn disconnect(&self, request: DisconnectRequest) {
        let mut state = self.state();
        if let Some(port_id) = &request.port_id {
            if let Some(port) = state.ports.get_mut(port_id) {
                port["peers"] = json!([]);
            }
        }
        state.calls.push(NodeCall::Disconnect(request));
    }

    fn stop(&self) {
        let mut state = self.state();
        state.stopped = true;
        state.calls.push(NodeCall::Stop);
    }

    fn storage(&self) -> &dyn Storage {
        self
    }

    fn actors(&self) -> &dyn ActorManager {
        self
    }

    fn network(&self) -> &dyn PeerDirectory {
        self
    }

    fn apps(&self) -> &dyn AppManager {
        self
    }

    fn compiler(&self) -> &dyn ScriptCompiler {
        self
    }

    fn deployer(&self) -> &dyn Deployer {
        self
    }
}
