//! # Server Module
//!
//! Transport side of the control API: the [`Connection`] and [`Listener`]
//! contracts, request splitting, response writing and the `may`-based TCP
//! implementation started by [`ControlServer::start`].

mod connection;
mod control_server;
pub mod request;
pub mod response;
pub mod tcp;

pub use connection::{Connection, Listener};
pub use control_server::{resolve_uri, ControlHandle, ControlServer};
pub use request::{split_request, ParsedRequest, RawRequest};
