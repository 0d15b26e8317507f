use std::sync::Arc;

use super::{Chain, LinkKind, QueryMatcher, Route, RouteError, RouteInput, Router};
use crate::headers::standard::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use crate::headers::HeaderValue;
use crate::http::Method;

fn input(method: Method, path: &str) -> RouteInput {
    RouteInput::new(method, path)
}

fn input_with(method: Method, path: &str, headers: &[(&crate::headers::HeaderName, &'static str)]) -> RouteInput {
    let mut parts = crate::http::request::Parts {
        method,
        uri: crate::uri::Uri::new(
            crate::uri::Scheme::Http,
            crate::common::ByteStr::from_static("test"),
            crate::common::ByteStr::from(path.to_owned()),
            None,
        ),
        ..Default::default()
    };
    for (name, value) in headers {
        parts.headers.append(*name, HeaderValue::from_static(value));
    }
    RouteInput::from_parts(&parts).unwrap()
}

#[test]
fn exact_path_resolution() {
    let router: Router<u32> = Router::new();
    let route = Route::new().path("/hello").method(Method::GET);
    router.set(&route, 1);

    assert_eq!(router.resolve(&input(Method::GET, "/hello")), Ok(1));
    assert_eq!(
        router.resolve(&input(Method::GET, "/nope")),
        Err(RouteError::NotFound)
    );
}

#[test]
fn add_remove_restores_previous_resolution() {
    let router: Router<u32> = Router::new();
    let stable = Route::new().path("/a");
    router.set(&stable, 1);

    let before = router.resolve(&input(Method::GET, "/a"));
    let probe = Route::new().path("/a").method(Method::GET);
    router.set(&probe, 2);
    assert_eq!(router.resolve(&input(Method::GET, "/a")), Ok(2));

    router.remove(&probe);
    assert_eq!(router.resolve(&input(Method::GET, "/a")), before);
}

#[test]
fn method_not_allowed_carries_allowed_set() {
    let router: Router<u32> = Router::new();
    router.set(&Route::new().path("/x").method(Method::GET), 1);

    match router.resolve(&input(Method::POST, "/x")) {
        Err(RouteError::MethodNotAllowed(allowed)) => assert_eq!(allowed, vec![Method::GET]),
        other => panic!("expected 405, got {other:?}"),
    }
}

#[test]
fn methodless_route_accepts_any_method() {
    let router: Router<u32> = Router::new();
    router.set(&Route::new().path("/any"), 7);

    assert_eq!(router.resolve(&input(Method::GET, "/any")), Ok(7));
    assert_eq!(router.resolve(&input(Method::POST, "/any")), Ok(7));
    assert_eq!(router.resolve(&input(Method::DELETE, "/any")), Ok(7));
}

#[test]
fn trailing_slash_opt_in() {
    let router: Router<u32> = Router::new();
    router.set(&Route::new().path("/strict"), 1);
    router.set(&Route::new().path("/lax").trailing_slash(), 2);

    assert_eq!(router.resolve(&input(Method::GET, "/strict")), Ok(1));
    assert_eq!(
        router.resolve(&input(Method::GET, "/strict/")),
        Err(RouteError::NotFound)
    );
    assert_eq!(router.resolve(&input(Method::GET, "/lax")), Ok(2));
    assert_eq!(router.resolve(&input(Method::GET, "/lax/")), Ok(2));
}

#[test]
fn path_normalisation_applies() {
    let router: Router<u32> = Router::new();
    router.set(&Route::new().path("/a/b"), 1);

    assert_eq!(router.resolve(&input(Method::GET, "/a/./b")), Ok(1));
    assert_eq!(router.resolve(&input(Method::GET, "/a/c/../b")), Ok(1));
    assert_eq!(router.resolve(&input(Method::GET, "/%61/b")), Ok(1));
}

#[test]
fn pattern_specificity_ordering() {
    let router: Router<u32> = Router::new();
    router.set(&Route::new().path("/users/{id}"), 1);
    router.set(&Route::new().path("/users/{id:[0-9]+}"), 2);
    router.set(&Route::new().path("/users/me"), 3);

    // literal beats parameter, constrained beats unconstrained
    assert_eq!(router.resolve(&input(Method::GET, "/users/me")), Ok(3));
    assert_eq!(router.resolve(&input(Method::GET, "/users/42")), Ok(2));
    assert_eq!(router.resolve(&input(Method::GET, "/users/jane")), Ok(1));
}

#[test]
fn consumes_matching() {
    let router: Router<u32> = Router::new();
    router.set(&Route::new().path("/data").consumes("application/json"), 1);
    router.set(&Route::new().path("/data").consumes("text/*"), 2);

    let json = input_with(
        Method::POST,
        "/data",
        &[(&CONTENT_TYPE, "application/json; charset=utf-8")],
    );
    assert_eq!(router.resolve(&json), Ok(1));

    let csv = input_with(Method::POST, "/data", &[(&CONTENT_TYPE, "text/csv")]);
    assert_eq!(router.resolve(&csv), Ok(2));

    let cbor = input_with(Method::POST, "/data", &[(&CONTENT_TYPE, "application/cbor")]);
    match router.resolve(&cbor) {
        Err(RouteError::UnsupportedMediaType(ranges)) => {
            assert!(ranges.contains(&"application/json".to_owned()));
            assert!(ranges.contains(&"text/*".to_owned()));
        }
        other => panic!("expected 415, got {other:?}"),
    }
}

#[test]
fn produces_follows_quality_then_specificity() {
    let router: Router<u32> = Router::new();
    router.set(&Route::new().path("/repr").produces("application/json"), 1);
    router.set(&Route::new().path("/repr").produces("text/html"), 2);

    let wants_html = input_with(
        Method::GET,
        "/repr",
        &[(&ACCEPT, "application/json;q=0.5, text/html")],
    );
    assert_eq!(router.resolve(&wants_html), Ok(2));

    let wants_json = input_with(Method::GET, "/repr", &[(&ACCEPT, "application/*")]);
    assert_eq!(router.resolve(&wants_json), Ok(1));

    // nothing acceptable
    let wants_csv = input_with(Method::GET, "/repr", &[(&ACCEPT, "text/csv")]);
    match router.resolve(&wants_csv) {
        Err(RouteError::NotAcceptable(produced)) => {
            assert_eq!(produced.len(), 2);
        }
        other => panic!("expected 406, got {other:?}"),
    }

    // no accept header means */*
    assert_eq!(router.resolve(&input(Method::GET, "/repr")), Ok(1));
}

#[test]
fn produces_quality_outranks_specificity() {
    let router: Router<u32> = Router::new();
    router.set(&Route::new().path("/repr").produces("text/plain"), 1);
    router.set(&Route::new().path("/repr").produces("application/json"), 2);

    // the concrete `text/plain` range is more specific, but the broader
    // `application/*` carries the higher quality and wins
    let wants = input_with(
        Method::GET,
        "/repr",
        &[(&ACCEPT, "text/plain;q=0.3, application/*;q=0.8")],
    );
    assert_eq!(router.resolve(&wants), Ok(2));
}

#[test]
fn language_precedence() {
    let router: Router<u32> = Router::new();
    router.set(&Route::new().path("/page").language("en-US"), 1);
    router.set(&Route::new().path("/page").language("en"), 2);
    router.set(&Route::new().path("/page").language("*"), 3);

    let exact = input_with(Method::GET, "/page", &[(&ACCEPT_LANGUAGE, "en-US")]);
    assert_eq!(router.resolve(&exact), Ok(1));

    // en-GB matches the broader `en` before the wildcard
    let prefix = input_with(Method::GET, "/page", &[(&ACCEPT_LANGUAGE, "en-GB")]);
    assert_eq!(router.resolve(&prefix), Ok(2));

    let other = input_with(Method::GET, "/page", &[(&ACCEPT_LANGUAGE, "fr")]);
    assert_eq!(router.resolve(&other), Ok(3));
}

#[test]
fn query_constraint_count_wins() {
    let router: Router<u32> = Router::new();
    router.set(
        &Route::new().path("/q").query("a", QueryMatcher::exists()),
        1,
    );
    router.set(
        &Route::new()
            .path("/q")
            .query("a", QueryMatcher::exists())
            .query("b", QueryMatcher::exact("2")),
        2,
    );

    let both = input(Method::GET, "/q").with_query(vec![
        ("a".to_owned(), "1".to_owned()),
        ("b".to_owned(), "2".to_owned()),
    ]);
    assert_eq!(router.resolve(&both), Ok(2));

    let only_a = input(Method::GET, "/q").with_query(vec![("a".to_owned(), "1".to_owned())]);
    assert_eq!(router.resolve(&only_a), Ok(1));

    let neither = input(Method::GET, "/q");
    assert_eq!(router.resolve(&neither), Err(RouteError::NotFound));
}

#[test]
fn enable_disable() {
    let router: Router<u32> = Router::new();
    let route = Route::new().path("/flip").method(Method::GET);
    router.set(&route, 1);

    assert_eq!(router.resolve(&input(Method::GET, "/flip")), Ok(1));

    assert!(router.disable(&route));
    assert_eq!(
        router.resolve(&input(Method::GET, "/flip")),
        Err(RouteError::NotFound)
    );

    assert!(router.enable(&route));
    assert_eq!(router.resolve(&input(Method::GET, "/flip")), Ok(1));

    // unknown routes are reported as such
    assert!(!router.disable(&Route::new().path("/missing")));
}

#[test]
fn routes_reconstructs_criteria() {
    let router: Router<u32> = Router::new();
    let a = Route::new().path("/a").method(Method::GET);
    let b = Route::new()
        .path("/b")
        .method(Method::POST)
        .consumes("application/json")
        .produces("text/html")
        .language("en")
        .query("v", QueryMatcher::exact("1"));
    router.set(&a, 1);
    router.set(&b, 2);
    router.disable(&a);

    let mut routes = router.routes();
    routes.sort_by_key(|(_, resource, _)| *resource);
    assert_eq!(routes.len(), 2);

    let (route, resource, enabled) = &routes[0];
    assert_eq!(*route, a);
    assert_eq!(*resource, 1);
    assert!(!*enabled);

    let (route, resource, enabled) = &routes[1];
    assert_eq!(*route, b);
    assert_eq!(*resource, 2);
    assert!(*enabled);
}

#[test]
fn custom_chain_order() {
    let chain = Chain::new(vec![LinkKind::Method, LinkKind::PathExact]);
    let router: Router<u32> = Router::with_chain(&chain);
    router.set(&Route::new().path("/x").method(Method::GET), 1);
    router.set(&Route::new().method(Method::POST), 2);

    assert_eq!(router.resolve(&input(Method::GET, "/x")), Ok(1));
    assert_eq!(router.resolve(&input(Method::POST, "/anything")), Ok(2));
}

#[test]
fn replacing_a_route_returns_previous_resource() {
    let router: Router<u32> = Router::new();
    let route = Route::new().path("/r");
    assert_eq!(router.set(&route, 1), None);
    assert_eq!(router.set(&route, 2), Some(1));
    assert_eq!(router.resolve(&input(Method::GET, "/r")), Ok(2));
}

#[test]
fn concurrent_resolves_see_whole_snapshots() {
    let router: Arc<Router<u32>> = Arc::new(Router::new());
    router.set(&Route::new().path("/hot").method(Method::GET), 1);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let router = router.clone();
            std::thread::spawn(move || {
                for _ in 0..500 {
                    match router.resolve(&RouteInput::new(Method::GET, "/hot")) {
                        // either the pre- or post-mutation resource
                        Ok(1) | Ok(2) => {}
                        Err(RouteError::NotFound) => {}
                        other => panic!("torn resolve: {other:?}"),
                    }
                }
            })
        })
        .collect();

    let writer = {
        let router = router.clone();
        std::thread::spawn(move || {
            let route = Route::new().path("/hot").method(Method::GET);
            for i in 0..200 {
                router.set(&route, if i % 2 == 0 { 2 } else { 1 });
                router.remove(&route);
                router.set(&route, 1);
            }
        })
    };

    for reader in readers {
        reader.join().unwrap();
    }
    writer.join().unwrap();
}
