//! # CLI Module
//!
//! Command line for running a control server over the in-memory node.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! ```bash
//! brrtcontrol serve --uri http://127.0.0.1:5001 --node-id node-a
//! ```
//!
//! Runs until SIGINT/SIGTERM or until a client sends `DELETE /node`.
//!
//! ### `routes`
//!
//! ```bash
//! brrtcontrol routes
//! ```
//!
//! Prints the route table in match order.

mod commands;


pub use commands::{format_routes, run_cli, Cli, Commands};
