use std::future::Future;
use std::sync::Arc;

use http::{Method, Request, Response};
use hyper::body::Incoming;

use crate::extract::PathParams;
use crate::middleware::BoxFuture;
use crate::permission::Access;
use crate::response::{BoxBody, IntoResponse};
use crate::state::AppState;

pub(crate) type HandlerFn = Arc<
    dyn Fn(Request<Incoming>, PathParams, Arc<AppState>) -> BoxFuture<'static, Response<BoxBody>>
        + Send
        + Sync,
>;

/// Metadata attached to a registered route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMeta {
    pub handler_name: String,
    pub access: Access,
    pub tags: Vec<String>,
}

pub(crate) struct Route {
    pub(crate) method: Method,
    pub(crate) pattern: String,
    segments: Vec<Segment>,
    pub(crate) meta: RouteMeta,
    pub(crate) handler: HandlerFn,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Param(String),
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(s.to_string()),
        })
        .collect()
}

impl Route {
    fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}

/// Method + path routing table. The first matching route wins.
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registers a handler that requires an authenticated caller when
    /// authentication is enabled.
    pub fn route<F, Fut, Out>(self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        let name = handler_name::<F>();
        self.route_with(method, path, RouteMeta::new(name, Access::Authenticated), box_handler(handler))
    }

    /// Registers a handler that is reachable without credentials.
    pub fn public_route<F, Fut, Out>(self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        let name = handler_name::<F>();
        self.route_with(method, path, RouteMeta::new(name, Access::Public), box_handler(handler))
    }

    pub(crate) fn route_with(
        mut self,
        method: Method,
        path: &str,
        meta: RouteMeta,
        handler: HandlerFn,
    ) -> Self {
        self.routes.push(Route {
            method,
            pattern: path.to_string(),
            segments: parse_pattern(path),
            meta,
            handler,
        });
        self
    }

    pub fn get<F, Fut, Out>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::GET, path, handler)
    }

    pub fn post<F, Fut, Out>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::POST, path, handler)
    }

    pub fn put<F, Fut, Out>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::PUT, path, handler)
    }

    pub fn delete<F, Fut, Out>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::DELETE, path, handler)
    }

    /// Appends every route of `other` after the routes already registered.
    pub fn merge(mut self, other: Router) -> Self {
        self.routes.extend(other.routes);
        self
    }

    pub(crate) fn find(&self, method: &Method, path: &str) -> Option<(&Route, PathParams)> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| route.matches(path).map(|params| (route, params)))
    }

    /// Lists `(method, pattern, meta)` for every registered route.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str, &RouteMeta)> {
        self.routes
            .iter()
            .map(|route| (&route.method, route.pattern.as_str(), &route.meta))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteMeta {
    pub fn new(handler_name: impl Into<String>, access: Access) -> Self {
        Self {
            handler_name: handler_name.into(),
            access,
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

fn box_handler<F, Fut, Out>(handler: F) -> HandlerFn
where
    F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Out> + Send + 'static,
    Out: IntoResponse + 'static,
{
    Arc::new(
        move |req, params, state| -> BoxFuture<'static, Response<BoxBody>> {
            let fut = handler(req, params, state);
            Box::pin(async move { fut.await.into_response() })
        },
    )
}

/// Last path segment of the handler's type name (`"handler"` for closures).
fn handler_name<F>() -> String {
    let full = std::any::type_name::<F>();
    let trimmed = full.split("::{{closure}}").next().unwrap_or(full);
    let last = trimmed.rsplit("::").next().unwrap_or(trimmed);
    if full.contains("{{closure}}") {
        "handler".to_string()
    } else {
        last.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::new()
            .get("/health", |_, _, _| async { "ok" })
            .get("/users/:id", |_, _, _| async { "user" })
            .post("/users", |_, _, _| async { "created" })
    }

    #[test]
    fn test_parse_pattern() {
        assert_eq!(
            parse_pattern("/users/:id"),
            vec![
                Segment::Literal("users".to_string()),
                Segment::Param("id".to_string())
            ]
        );
        assert!(parse_pattern("/").is_empty());
    }

    #[test]
    fn test_find_literal_route() {
        let router = router();
        let (route, params) = router.find(&Method::GET, "/health").unwrap();
        assert_eq!(route.pattern, "/health");
        assert!(params.is_empty());
    }

    #[test]
    fn test_find_captures_params() {
        let router = router();
        let (route, params) = router.find(&Method::GET, "/users/42").unwrap();
        assert_eq!(route.pattern, "/users/:id");
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_find_respects_method() {
        let router = router();
        assert!(router.find(&Method::DELETE, "/users").is_none());
        assert!(router.find(&Method::POST, "/users").is_some());
    }

    #[test]
    fn test_find_rejects_length_mismatch() {
        let router = router();
        assert!(router.find(&Method::GET, "/users/42/posts").is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let router = Router::new()
            .get("/items/:id", |_, _, _| async { "param" })
            .get("/items/special", |_, _, _| async { "literal" });
        let (route, _) = router.find(&Method::GET, "/items/special").unwrap();
        assert_eq!(route.pattern, "/items/:id");
    }

    #[test]
    fn test_route_access_defaults() {
        let router = Router::new()
            .get("/private", |_, _, _| async { "p" })
            .public_route(Method::GET, "/open", |_, _, _| async { "o" });

        let metas: Vec<_> = router.routes().map(|(_, _, meta)| meta.access.clone()).collect();
        assert_eq!(metas, vec![Access::Authenticated, Access::Public]);
    }

    #[test]
    fn test_closure_handler_name() {
        let router = Router::new().get("/x", |_, _, _| async { "x" });
        let (_, _, meta) = router.routes().next().unwrap();
        assert_eq!(meta.handler_name, "handler");
    }

    #[test]
    fn test_merge_appends() {
        let merged = router().merge(Router::new().get("/extra", |_, _, _| async { "e" }));
        assert_eq!(merged.len(), 4);
    }
}
