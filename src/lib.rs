//! # brrtcontrol
//!
//! **brrtcontrol** is the control-plane API of a distributed runtime node: a
//! small HTTP/1.0-style JSON protocol served from `may` coroutines, with one
//! server-pushed log stream of actor firings.
//!
//! ## Overview
//!
//! Clients speak plain request lines (`GET /actors HTTP/1.0`) with optional
//! JSON bodies and get back exactly one JSON object per request, after which
//! the connection is closed. The one exception is `GET /log`, which turns its
//! connection into a `text/event-stream` that receives a frame per actor
//! firing until the client goes away or another client subscribes.
//!
//! The crate owns no node logic. Every operation is delegated to a
//! [`node::Node`] and its collaborators; slow ones (storage lookups, actor
//! migration) complete through callbacks, possibly many ticks later.
//!
//! ## Architecture
//!
//! - **[`router`]** - request-line parsing and the fixed, ordered route table
//! - **[`dispatcher`]** - [`dispatcher::Control`], one non-blocking tick at a
//!   time, and [`dispatcher::Responder`], the continuation handed to deferred
//!   operations
//! - **[`registry`]** - connections awaiting a response, keyed by handle
//! - **[`handlers`]** - one function per route and the typed request bodies
//! - **[`sse`]** - the single-subscriber [`sse::LogSink`]
//! - **[`server`]** - transport contracts, response writing, and the TCP server
//! - **[`node`]** - collaborator traits and the in-memory [`node::memory::MemoryNode`]
//! - **[`runtime_config`]**, **[`logging`]**, **[`cli`]** - process wiring
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use brrtcontrol::node::memory::MemoryNode;
//! use brrtcontrol::runtime_config::RuntimeConfig;
//! use brrtcontrol::server::ControlServer;
//!
//! # fn main() -> Result<(), brrtcontrol::error::ControlError> {
//! let node = Arc::new(MemoryNode::with_id("node-a"));
//! let handle = ControlServer::start(node, "http://127.0.0.1:5001", &RuntimeConfig::from_env())?;
//!
//! handle.log_sink().publish("src", "emit", 1, 0, serde_json::json!([42]));
//!
//! handle.stop();
//! # Ok(())
//! # }
//! ```
//!
//! Embedders that drive their own scheduler can skip the TCP server and call
//! [`dispatcher::Control::tick`] directly with any [`server::Listener`].

pub mod cli;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod ids;
pub mod logging;
pub mod node;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod sse;

pub use dispatcher::{Control, Responder, TickReport};
pub use error::ControlError;
pub use router::{RouteId, Router};
pub use server::{ControlHandle, ControlServer};
pub use sse::LogSink;
