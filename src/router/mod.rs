//! # Router Module
//!
//! Matches the request line of a raw control request against the fixed route table
//! and extracts the identifiers embedded in the path.
//!
//! ## Overview
//!
//! Matching happens in two steps:
//!
//! 1. **Request line parsing**: the first line of the buffered request is split into
//!    an HTTP verb and a path, and the protocol token is checked to be `HTTP/1.x`.
//!    A line that cannot be parsed is reported with a [`RequestLineError`] and
//!    treated as a routing miss.
//!
//! 2. **Template matching**: the `(verb, path)` pair is tested against each
//!    [`PathTemplate`] in declared order. Templates are made of literal segments and
//!    `{uuid}` slots; a slot only accepts canonical lowercase UUID text
//!    (`8-4-4-4-12` hex groups) and its text is captured verbatim.
//!
//! The first matching route wins. Segment counts must agree exactly, so `/actors`
//! can never be taken for `/actor/{uuid}` and `/actor/{uuid}` never swallows
//! `/actor/{uuid}/report`.
//!
//! Only the request line is inspected; bodies are a handler concern.
//!
//! ## Example
//!
//! ```rust
//! use brrtcontrol::router::{RouteId, Router};
//!
//! let router = Router::new();
//! let m = router
//!     .match_head("GET /actor/3fa85f64-5717-4562-b3fc-2c963f66afa6/report HTTP/1.0")
//!     .unwrap();
//! assert_eq!(m.route, RouteId::GetActorReport);
//! assert_eq!(m.capture(0), Some("3fa85f64-5717-4562-b3fc-2c963f66afa6"));
//! ```

mod core;
mod pattern;
#[cfg(test)]
mod tests;

pub use self::core::{CaptureVec, Route, RouteId, RouteMatch, Router, MAX_INLINE_CAPTURES};
pub use pattern::{is_uuid, PathTemplate, RequestLine, RequestLineError, Segment};
