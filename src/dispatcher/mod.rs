//! # Dispatcher Module
//!
//! The dispatcher drives the control protocol one tick at a time.
//!
//! ## Overview
//!
//! Each call to [`Control::tick`]:
//!
//! 1. Drains newly accepted connections from the listener into the registry,
//!    each under a fresh [`ConnectionHandle`](crate::ids::ConnectionHandle)
//! 2. Evicts idle connections whose transport was lost
//! 3. For every connection with a complete request buffered, parses the request
//!    line, routes it, decodes the JSON body and invokes exactly one handler
//! 4. Answers unmatched requests with a bodiless 404
//!
//! ## Deferred responses
//!
//! Handlers that need a slow collaborator (storage lookups, actor migration)
//! pass a clone of their [`Responder`] inside the callback and return. The
//! responder refers to the connection by handle, so the callback may fire many
//! ticks later, from another thread, or after the peer has hung up; in the last
//! case the write is dropped silently.
//!
//! ## Exactly one response
//!
//! A registry entry is removed in the same step that writes its terminal
//! response, and a responder answers at most once. If every clone of a responder
//! is dropped without answering, the connection is closed and evicted.

mod core;
mod responder;

pub use self::core::{Control, TickReport};
pub use responder::Responder;
