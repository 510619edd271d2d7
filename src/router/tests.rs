use super::{is_uuid, PathTemplate, RequestLine, RequestLineError, RouteId, Router, Segment};
use http::Method;

const ACTOR: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
const PORT: &str = "0b6d1c52-94a1-4d7c-8b0e-1f2a3b4c5d6e";

#[test]
fn test_uuid_shape() {
    assert!(is_uuid(ACTOR));
    assert!(!is_uuid("3FA85F64-5717-4562-B3FC-2C963F66AFA6"));
    assert!(!is_uuid("3fa85f64-5717-4562-b3fc-2c963f66afa"));
    assert!(!is_uuid("3fa85f6457174562b3fc2c963f66afa6"));
    assert!(!is_uuid(""));
}

#[test]
fn test_template_segments() {
    let t = PathTemplate::new("/actor/{uuid}/port/{uuid}");
    assert_eq!(
        t.segments(),
        &[
            Segment::Literal("actor"),
            Segment::Uuid,
            Segment::Literal("port"),
            Segment::Uuid
        ]
    );
    assert_eq!(t.capture_count(), 2);
}

#[test]
fn test_template_rejects_extra_and_missing_segments() {
    let t = PathTemplate::new("/actor/{uuid}");
    assert!(t.matches(&format!("/actor/{ACTOR}")).is_some());
    assert!(t.matches(&format!("/actor/{ACTOR}/report")).is_none());
    assert!(t.matches("/actor").is_none());
    assert!(t.matches(&format!("actor/{ACTOR}")).is_none());
    assert!(PathTemplate::new("/actors").matches("/actors/").is_none());
}

#[test]
fn test_request_line_parsing() {
    let line = RequestLine::parse("GET /id HTTP/1.0\r\n\r\n").unwrap();
    assert_eq!(line.method, Method::GET);
    assert_eq!(line.path, "/id");

    let line = RequestLine::parse("POST /connect\r\nHTTP/1.1\r\n\r\n{}").unwrap();
    assert_eq!(line.method, Method::POST);
    assert_eq!(line.path, "/connect");
}

#[test]
fn test_request_line_failures() {
    assert_eq!(RequestLine::parse(""), Err(RequestLineError::Empty));
    assert_eq!(RequestLine::parse("GET"), Err(RequestLineError::MissingPath));
    assert_eq!(
        RequestLine::parse("GET /id"),
        Err(RequestLineError::MissingVersion)
    );
    assert_eq!(
        RequestLine::parse("GET /id HTTP/2\r\n"),
        Err(RequestLineError::UnsupportedVersion("HTTP/2".to_string()))
    );
    assert!(matches!(
        RequestLine::parse("G(T /id HTTP/1.0"),
        Err(RequestLineError::InvalidMethod(_))
    ));
}

#[test]
fn test_actors_and_actor_do_not_cross_match() {
    let router = Router::new();
    let list = router.route(&Method::GET, "/actors").unwrap();
    assert_eq!(list.route, RouteId::GetActors);
    assert!(list.captures.is_empty());

    let one = router.route(&Method::GET, &format!("/actor/{ACTOR}")).unwrap();
    assert_eq!(one.route, RouteId::GetActor);
    assert_eq!(one.capture(0), Some(ACTOR));

    assert!(router.route(&Method::GET, "/actor").is_none());
    assert!(router.route(&Method::GET, "/actors/extra").is_none());
}

#[test]
fn test_verb_selects_route() {
    let router = Router::new();
    let path = format!("/application/{ACTOR}");
    assert_eq!(
        router.route(&Method::GET, &path).unwrap().route,
        RouteId::GetApplication
    );
    assert_eq!(
        router.route(&Method::DELETE, &path).unwrap().route,
        RouteId::DeleteApplication
    );
    assert!(router.route(&Method::PUT, &path).is_none());
    assert_eq!(
        router.route(&Method::DELETE, "/node").unwrap().route,
        RouteId::Quit
    );
    assert_eq!(
        router.route(&Method::POST, "/actor").unwrap().route,
        RouteId::NewActor
    );
}

#[test]
fn test_port_route_captures_both_ids() {
    let router = Router::new();
    let m = router
        .match_head(&format!("GET /actor/{ACTOR}/port/{PORT} HTTP/1.0\r\n\r\n"))
        .unwrap();
    assert_eq!(m.route, RouteId::GetPort);
    assert_eq!(m.capture(0), Some(ACTOR));
    assert_eq!(m.capture(1), Some(PORT));
    assert_eq!(m.capture(2), None);
}

#[test]
fn test_actor_subroutes() {
    let router = Router::new();
    let cases = [
        (Method::GET, "report", RouteId::GetActorReport),
        (Method::POST, "migrate", RouteId::MigrateActor),
        (Method::POST, "disable", RouteId::DisableActor),
    ];
    for (method, suffix, expected) in cases {
        let m = router
            .route(&method, &format!("/actor/{ACTOR}/{suffix}"))
            .unwrap();
        assert_eq!(m.route, expected, "{method} /actor/{{id}}/{suffix}");
        assert_eq!(m.capture(0), Some(ACTOR));
    }
}

#[test]
fn test_uppercase_uuid_is_a_miss() {
    let router = Router::new();
    assert!(router
        .match_head("GET /node/3FA85F64-5717-4562-B3FC-2C963F66AFA6 HTTP/1.0")
        .is_none());
}

#[test]
fn test_malformed_request_line_is_a_miss() {
    let router = Router::new();
    assert!(router.match_head("\r\n\r\n").is_none());
    assert!(router.match_head("GET /id").is_none());
}

#[test]
fn test_table_declares_every_route_once() {
    let router = Router::new();
    let routes = router.routes();
    assert_eq!(routes.len(), 21);
    assert_eq!(routes[0].id, RouteId::GetLog);
    for (i, a) in routes.iter().enumerate() {
        for b in &routes[i + 1..] {
            assert!(
                a.id != b.id && !(a.method == b.method && a.template == b.template),
                "duplicate route {} {}",
                a.method,
                a.template
            );
        }
    }
}
