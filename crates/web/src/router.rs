//! Route table and resolution.
//!
//! Routes are registered once, before serving starts, and the table is
//! immutable afterwards. Resolution walks the table in registration order
//! and the first route whose pattern matches the path decides the outcome:
//! either the request is dispatched there, or, when the method is not in
//! the route's allowed set, the answer is 405. Resolution never falls
//! through to a later route with the same path, and no route is preferred
//! for being more specific.

use http::Method;
use thiserror::Error;

use crate::config::RouteConfig;
use crate::handler::RouteHandler;
use crate::request::PathParams;
use crate::resource::Resource;

/// What a route dispatches to.
pub(crate) enum Endpoint {
    /// A plain handler driving the response writer itself.
    Handler(Box<dyn RouteHandler>),
    /// A REST resource dispatched by method capability.
    Resource(Box<dyn Resource>),
}

/// One registered route: pattern, endpoint and policy. Immutable.
pub struct Route {
    pattern: Pattern,
    endpoint: Endpoint,
    config: RouteConfig,
}

impl Route {
    pub(crate) fn new(pattern: Pattern, endpoint: Endpoint, config: RouteConfig) -> Self {
        Self { pattern, endpoint, config }
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    pub fn pattern(&self) -> &str {
        &self.pattern.raw
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route").field("pattern", &self.pattern.raw).field("methods", &self.config.methods).finish_non_exhaustive()
    }
}

/// A parsed URL pattern: ordered literal and `<param>` segments.
#[derive(Debug, Clone)]
pub(crate) struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Problems with a pattern at registration time.
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("pattern must start with '/': {0:?}")]
    MissingLeadingSlash(String),
    #[error("pattern must not contain '?': {0:?}")]
    ContainsQuery(String),
    #[error("malformed parameter segment {segment:?} in pattern {pattern:?}")]
    MalformedParam { pattern: String, segment: String },
}

impl Pattern {
    pub(crate) fn parse(pattern: &str) -> Result<Self, PatternError> {
        if !pattern.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(pattern.to_owned()));
        }
        if pattern.contains('?') {
            return Err(PatternError::ContainsQuery(pattern.to_owned()));
        }

        let mut segments = Vec::new();
        for segment in split_segments(pattern) {
            if let Some(inner) = segment.strip_prefix('<') {
                let Some(name) = inner.strip_suffix('>') else {
                    return Err(PatternError::MalformedParam { pattern: pattern.to_owned(), segment: segment.to_owned() });
                };
                if name.is_empty() || name.contains(['<', '>']) {
                    return Err(PatternError::MalformedParam { pattern: pattern.to_owned(), segment: segment.to_owned() });
                }
                segments.push(Segment::Param(name.to_owned()));
            } else if segment.contains(['<', '>']) {
                return Err(PatternError::MalformedParam { pattern: pattern.to_owned(), segment: segment.to_owned() });
            } else {
                segments.push(Segment::Literal(segment.to_owned()));
            }
        }

        Ok(Self { raw: pattern.to_owned(), segments })
    }

    /// Segment-by-segment match: literals compare exactly and
    /// case-sensitively, parameters bind any non-empty segment verbatim.
    fn matches(&self, path: &str) -> Option<PathParams> {
        let path_segments: Vec<&str> = split_segments(path).collect();
        if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::empty();
        for (segment, part) in self.segments.iter().zip(path_segments) {
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.push(name, part);
                }
            }
        }
        Some(params)
    }
}

fn split_segments(path: &str) -> std::str::Split<'_, char> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

/// Outcome of resolving a (method, path) pair.
pub(crate) enum Resolution<'router> {
    /// No route's pattern matches the path.
    NotFound,
    /// A pattern matches but the method is not allowed there.
    MethodNotAllowed,
    /// Dispatch here. OPTIONS requests match any route on path alone,
    /// since the engine answers them itself.
    Matched { route: &'router Route, params: PathParams },
}

/// The ordered route table.
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub(crate) fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub(crate) fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        for route in &self.routes {
            if let Some(params) = route.pattern.matches(path) {
                if *method == Method::OPTIONS || route.config.allows(method) {
                    return Resolution::Matched { route, params };
                }
                return Resolution::MethodNotAllowed;
            }
        }
        Resolution::NotFound
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").field("routes", &self.routes).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerResult, RouteHandler};
    use crate::request::Request;
    use femto_http::connection::ResponseWriter;
    use futures::future::BoxFuture;

    struct NoopHandler;

    impl RouteHandler for NoopHandler {
        fn handle<'a>(&'a self, _request: Request, _response: &'a mut ResponseWriter) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async { Ok(()) })
        }
    }

    fn route(pattern: &str, methods: &[Method]) -> Route {
        let config = RouteConfig { methods: methods.to_vec(), ..Default::default() };
        Route::new(Pattern::parse(pattern).unwrap(), Endpoint::Handler(Box::new(NoopHandler)), config)
    }

    #[test]
    fn exact_match_with_allowed_method() {
        let router = Router::new(vec![route("/", &[Method::GET]), route("/index.html", &[Method::GET])]);

        assert!(matches!(router.resolve(&Method::GET, "/index.html"), Resolution::Matched { route, .. } if route.pattern() == "/index.html"));
        assert!(matches!(router.resolve(&Method::GET, "/"), Resolution::Matched { route, .. } if route.pattern() == "/"));
    }

    #[test]
    fn method_mismatch_is_405_not_404() {
        let router = Router::new(vec![route("/submit", &[Method::POST])]);
        assert!(matches!(router.resolve(&Method::GET, "/submit"), Resolution::MethodNotAllowed));
        assert!(matches!(router.resolve(&Method::GET, "/other"), Resolution::NotFound));
    }

    #[test]
    fn first_path_match_wins_and_never_falls_through() {
        // same path registered twice with different methods: the first
        // registration decides, the later one is unreachable for it
        let router = Router::new(vec![route("/dup", &[Method::POST]), route("/dup", &[Method::GET])]);
        assert!(matches!(router.resolve(&Method::GET, "/dup"), Resolution::MethodNotAllowed));
    }

    #[test]
    fn registration_order_beats_specificity() {
        let router = Router::new(vec![route("/files/<name>", &[Method::GET]), route("/files/readme", &[Method::GET])]);
        match router.resolve(&Method::GET, "/files/readme") {
            Resolution::Matched { route, params } => {
                assert_eq!(route.pattern(), "/files/<name>");
                assert_eq!(params.get("name"), Some("readme"));
            }
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn params_bind_segments_verbatim() {
        let router = Router::new(vec![route("/images/<fn>", &[Method::GET])]);
        match router.resolve(&Method::GET, "/images/cat.png") {
            Resolution::Matched { params, .. } => assert_eq!(params.get("fn"), Some("cat.png")),
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn params_refuse_empty_segments() {
        let router = Router::new(vec![route("/images/<fn>", &[Method::GET])]);
        assert!(matches!(router.resolve(&Method::GET, "/images/"), Resolution::NotFound));
        assert!(matches!(router.resolve(&Method::GET, "/images"), Resolution::NotFound));
        assert!(matches!(router.resolve(&Method::GET, "/images/a/b"), Resolution::NotFound));
    }

    #[test]
    fn literals_are_case_sensitive() {
        let router = Router::new(vec![route("/About", &[Method::GET])]);
        assert!(matches!(router.resolve(&Method::GET, "/about"), Resolution::NotFound));
        assert!(matches!(router.resolve(&Method::GET, "/About"), Resolution::Matched { .. }));
    }

    #[test]
    fn options_matches_on_path_alone() {
        let router = Router::new(vec![route("/api", &[Method::POST])]);
        assert!(matches!(router.resolve(&Method::OPTIONS, "/api"), Resolution::Matched { .. }));
    }

    #[test]
    fn multi_param_patterns_bind_each_segment() {
        let router = Router::new(vec![route("/users/<id>/posts/<post>", &[Method::GET])]);
        match router.resolve(&Method::GET, "/users/42/posts/first") {
            Resolution::Matched { params, .. } => {
                assert_eq!(params.get("id"), Some("42"));
                assert_eq!(params.get("post"), Some("first"));
            }
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn pattern_validation() {
        assert!(Pattern::parse("/ok/<id>").is_ok());
        assert!(matches!(Pattern::parse("no-slash"), Err(PatternError::MissingLeadingSlash(_))));
        assert!(matches!(Pattern::parse("/has?query"), Err(PatternError::ContainsQuery(_))));
        assert!(matches!(Pattern::parse("/bad/<id"), Err(PatternError::MalformedParam { .. })));
        assert!(matches!(Pattern::parse("/bad/<>"), Err(PatternError::MalformedParam { .. })));
        assert!(matches!(Pattern::parse("/bad/x<y>"), Err(PatternError::MalformedParam { .. })));
    }
}
