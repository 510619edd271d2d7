//! Router core module - hot path for request routing.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]

use std::fmt;
use std::time::{Duration, Instant};

use http::Method;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::pattern::{PathTemplate, RequestLine};

/// Maximum number of path captures before heap allocation.
/// No control route embeds more than two identifiers.
pub const MAX_INLINE_CAPTURES: usize = 2;

/// Captured identifiers in path order, stack-allocated for the common case.
pub type CaptureVec = SmallVec<[String; MAX_INLINE_CAPTURES]>;

/// Every operation exposed by the control API.
///
/// The router resolves a request to one of these; the dispatcher maps it to the
/// handler function that serves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteId {
    GetLog,
    GetNodeId,
    GetNodes,
    GetNode,
    PeerSetup,
    GetApplications,
    GetApplication,
    DeleteApplication,
    NewActor,
    GetActors,
    GetActor,
    DeleteActor,
    GetActorReport,
    MigrateActor,
    DisableActor,
    GetPort,
    Connect,
    SetPortProperty,
    Deploy,
    Quit,
    Disconnect,
}

impl RouteId {
    /// Stable handler name used in logs and the `routes` listing.
    #[must_use]
    pub fn handler_name(self) -> &'static str {
        match self {
            RouteId::GetLog => "get_log",
            RouteId::GetNodeId => "get_node_id",
            RouteId::GetNodes => "get_nodes",
            RouteId::GetNode => "get_node",
            RouteId::PeerSetup => "peer_setup",
            RouteId::GetApplications => "get_applications",
            RouteId::GetApplication => "get_application",
            RouteId::DeleteApplication => "del_application",
            RouteId::NewActor => "new_actor",
            RouteId::GetActors => "get_actors",
            RouteId::GetActor => "get_actor",
            RouteId::DeleteActor => "del_actor",
            RouteId::GetActorReport => "get_actor_report",
            RouteId::MigrateActor => "actor_migrate",
            RouteId::DisableActor => "actor_disable",
            RouteId::GetPort => "get_port",
            RouteId::Connect => "connect",
            RouteId::SetPortProperty => "set_port_property",
            RouteId::Deploy => "deploy",
            RouteId::Quit => "quit",
            RouteId::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handler_name())
    }
}

/// One entry of the route table.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub template: PathTemplate,
    pub id: RouteId,
}

impl Route {
    fn new(method: Method, template: &'static str, id: RouteId) -> Self {
        Self {
            method,
            template: PathTemplate::new(template),
            id,
        }
    }
}

/// Result of successfully matching a request line to a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// The route that matched
    pub route: RouteId,
    /// Identifiers captured from `{uuid}` slots, in path order
    pub captures: CaptureVec,
}

impl RouteMatch {
    /// Get the `index`-th captured identifier.
    #[inline]
    #[must_use]
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index).map(String::as_str)
    }
}

/// Ordered route table with first-match-wins semantics.
///
/// The table is fixed: it is the complete control API. Declaration order is
/// significant whenever two templates could accept the same request.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Build the control route table.
    #[must_use]
    pub fn new() -> Self {
        let routes = vec![
            Route::new(Method::GET, "/log", RouteId::GetLog),
            Route::new(Method::GET, "/id", RouteId::GetNodeId),
            Route::new(Method::GET, "/nodes", RouteId::GetNodes),
            Route::new(Method::GET, "/node/{uuid}", RouteId::GetNode),
            Route::new(Method::POST, "/peer_setup", RouteId::PeerSetup),
            Route::new(Method::GET, "/applications", RouteId::GetApplications),
            Route::new(Method::GET, "/application/{uuid}", RouteId::GetApplication),
            Route::new(Method::DELETE, "/application/{uuid}", RouteId::DeleteApplication),
            Route::new(Method::POST, "/actor", RouteId::NewActor),
            Route::new(Method::GET, "/actors", RouteId::GetActors),
            Route::new(Method::GET, "/actor/{uuid}", RouteId::GetActor),
            Route::new(Method::DELETE, "/actor/{uuid}", RouteId::DeleteActor),
            Route::new(Method::GET, "/actor/{uuid}/report", RouteId::GetActorReport),
            Route::new(Method::POST, "/actor/{uuid}/migrate", RouteId::MigrateActor),
            Route::new(Method::POST, "/actor/{uuid}/disable", RouteId::DisableActor),
            Route::new(Method::GET, "/actor/{uuid}/port/{uuid}", RouteId::GetPort),
            Route::new(Method::POST, "/connect", RouteId::Connect),
            Route::new(Method::POST, "/set_port_property", RouteId::SetPortProperty),
            Route::new(Method::POST, "/deploy", RouteId::Deploy),
            Route::new(Method::DELETE, "/node", RouteId::Quit),
            Route::new(Method::POST, "/disconnect", RouteId::Disconnect),
        ];

        info!(
            routes_count = routes.len(),
            routing_algorithm = "ordered_templates",
            "Routing table loaded"
        );

        Self { routes }
    }

    /// The route table in declared order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Match a verb and path against the table.
    ///
    /// # Returns
    ///
    /// * `Some(RouteMatch)` - the first route in declared order that accepts the request
    /// * `None` - no route matches (results in 404)
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, "Route match attempt");
        let match_start = Instant::now();

        let found = self.routes.iter().find_map(|route| {
            if route.method != *method {
                return None;
            }
            route.template.matches(path).map(|captures| (route, captures))
        });
        let match_duration = match_start.elapsed();

        match found {
            Some((route, captures)) => {
                if match_duration > Duration::from_millis(1) {
                    warn!(
                        method = %method,
                        path = %path,
                        handler_name = route.id.handler_name(),
                        duration_us = match_duration.as_micros(),
                        "Slow route matching detected"
                    );
                } else {
                    info!(
                        method = %method,
                        path = %path,
                        handler_name = route.id.handler_name(),
                        route_pattern = %route.template,
                        captures = ?captures,
                        duration_us = match_duration.as_micros(),
                        "Route matched"
                    );
                }
                Some(RouteMatch {
                    route: route.id,
                    captures,
                })
            }
            None => {
                warn!(
                    method = %method,
                    path = %path,
                    duration_us = match_duration.as_micros(),
                    "No route matched"
                );
                None
            }
        }
    }

    /// Parse the request line at the start of `head` and route it.
    ///
    /// A request line that does not parse is logged and treated as a miss.
    #[must_use]
    pub fn match_head(&self, head: &str) -> Option<RouteMatch> {
        match RequestLine::parse(head) {
            Ok(line) => self.route(&line.method, &line.path),
            Err(err) => {
                warn!(error = %err, "Malformed request line");
                None
            }
        }
    }
}
