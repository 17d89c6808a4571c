//! Application builder and request dispatch.

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderValue, Method, Request, Response};
use hyper::body::Incoming;

use crate::auth::{AuthConfig, Gate};
use crate::context::RequestContext;
use crate::endpoint::{AppService, EndpointTable, MapperOptions, Operations, ServiceRegistry};
use crate::error::{Error, StartupError};
use crate::introspection::{RouteInfo, RouteRegistry, list_routes};
use crate::middleware::{BoxFuture, Middleware, Next, TimeoutMiddleware};
use crate::observability::TracingConfig;
use crate::openapi::{OpenApiBuilder, OpenApiRegistry, OpenApiSpec, openapi_spec};
use crate::permission::PermissionEvaluator;
use crate::response::BoxBody;
use crate::router::Router;
use crate::state::AppState;

pub const OPENAPI_PATH: &str = "/__autoroute/openapi.json";
pub const ROUTES_PATH: &str = "/__autoroute/routes";
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Builder for an application: services, hand-written routes, shared state
/// and the ambient pieces around them.
///
/// ```ignore
/// App::new()
///     .state(repo.clone())
///     .provide_as::<dyn ProductCatalog, _>(ProductAppService::new(repo))
///     .discover()
///     .with_auth(AuthConfig::from_env()?)
///     .openapi("catalog", "1.0")
///     .listen("127.0.0.1:3000")
///     .await
/// ```
pub struct App {
    state: AppState,
    router: Router,
    registry: ServiceRegistry,
    mapper: MapperOptions,
    auth: Option<AuthConfig>,
    evaluator: Option<Arc<dyn PermissionEvaluator>>,
    introspection: bool,
    openapi: Option<(String, String)>,
    tracing: Option<TracingConfig>,
    middlewares: Vec<Arc<dyn Middleware>>,
    request_timeout: Option<Duration>,
}

impl App {
    pub fn new() -> Self {
        Self {
            state: AppState::new(),
            router: Router::new(),
            registry: ServiceRegistry::new(),
            mapper: MapperOptions::default(),
            auth: None,
            evaluator: None,
            introspection: false,
            openapi: None,
            tracing: None,
            middlewares: Vec::new(),
            request_timeout: None,
        }
    }

    /// Adds a shared value to the container.
    pub fn state<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.state.insert(value);
        self
    }

    /// Registers a service instance under its concrete type.
    pub fn provide<S: AppService>(self, service: S) -> Self {
        self.provide_shared(Arc::new(service))
    }

    /// Like [`provide`](Self::provide) for an instance the caller also holds.
    pub fn provide_shared<S: AppService>(mut self, service: Arc<S>) -> Self {
        self.state.insert(service);
        self
    }

    /// Registers a service instance under the capability key `C`.
    pub fn provide_as<C, S>(self, service: S) -> Self
    where
        C: ?Sized + 'static,
        S: AppService,
    {
        self.provide_shared_as::<C, S>(Arc::new(service))
    }

    /// Like [`provide_as`](Self::provide_as) for an instance the caller also
    /// holds.
    pub fn provide_shared_as<C, S>(mut self, service: Arc<S>) -> Self
    where
        C: ?Sized + 'static,
        S: AppService,
    {
        self.state.provide_as::<C, S>(service);
        self
    }

    /// Appends hand-written routes.
    pub fn router(mut self, router: Router) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Exposes application service `S`.
    pub fn service<S: Operations>(mut self) -> Self {
        self.registry = self.registry.service::<S>();
        self
    }

    /// Replaces the service registry.
    pub fn services(mut self, registry: ServiceRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Exposes every `#[app_service]` linked into the binary.
    pub fn discover(mut self) -> Self {
        self.registry = self.registry.discover();
        self
    }

    pub fn with_auth(mut self, config: AuthConfig) -> Self {
        self.auth = Some(config);
        self
    }

    /// Evaluator for permission requirements. Defaults to
    /// [`ClaimsPermissionEvaluator`](crate::permission::ClaimsPermissionEvaluator).
    pub fn with_permissions<E: PermissionEvaluator>(mut self, evaluator: E) -> Self {
        self.evaluator = Some(Arc::new(evaluator));
        self
    }

    /// Serves the route list at `/__autoroute/routes`.
    pub fn with_introspection(mut self, enabled: bool) -> Self {
        self.introspection = enabled;
        self
    }

    /// Serves an OpenAPI description at `/__autoroute/openapi.json`.
    pub fn openapi(mut self, title: impl Into<String>, version: impl Into<String>) -> Self {
        self.openapi = Some((title.into(), version.into()));
        self
    }

    /// Installs a tracing subscriber when the application is built.
    pub fn with_tracing(mut self, config: TracingConfig) -> Self {
        self.tracing = Some(config);
        self
    }

    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Cancels requests that take longer than `timeout` and answers 504.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn mapper_options(mut self, options: MapperOptions) -> Self {
        self.mapper = options;
        self
    }

    /// Maps every service and freezes the application.
    pub fn build(self) -> Result<Dispatcher, StartupError> {
        if let Some(config) = &self.tracing {
            config.init();
        }

        let table = self.registry.map(&self.mapper)?;
        let mut router = table.install(Router::new()).merge(self.router);
        let mut state = self.state;

        if self.auth.is_none() {
            let guarded = table.iter().filter(|e| !e.access.is_public()).count();
            tracing::warn!(
                endpoints = guarded,
                "authentication is disabled; access and permission requirements are not enforced"
            );
        }

        if let Some((title, version)) = &self.openapi {
            let mut builder = OpenApiBuilder::new(title.clone(), version.clone());
            if let Some(auth) = &self.auth {
                builder = builder.cookie_auth(auth.cookie_name());
            }
            state.insert(OpenApiRegistry::new(builder.build(&table, &router)));
        }

        if self.introspection {
            state.insert(RouteRegistry::from_router(&router));
        }

        if self.openapi.is_some() {
            router = router.public_route(Method::GET, OPENAPI_PATH, openapi_spec);
        }
        if self.introspection {
            router = router.public_route(Method::GET, ROUTES_PATH, list_routes);
        }

        let mut middlewares = self.middlewares;
        if let Some(timeout) = self.request_timeout {
            middlewares.push(Arc::new(TimeoutMiddleware::new(timeout)));
        }

        let gate = self.auth.map(|config| {
            let gate = Gate::new(config);
            match self.evaluator {
                Some(evaluator) => gate.with_evaluator(evaluator),
                None => gate,
            }
        });

        tracing::info!(
            endpoints = table.len(),
            routes = router.len(),
            auth = gate.is_some(),
            "application built"
        );

        Ok(Dispatcher {
            inner: Arc::new(Inner {
                router,
                state: Arc::new(state),
                middlewares,
                gate,
                table,
            }),
        })
    }

    /// Builds the application and serves it on `addr` until Ctrl-C.
    pub async fn listen(self, addr: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let dispatcher = self.build()?;
        crate::server::serve(addr, dispatcher).await?;
        Ok(())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

struct Inner {
    router: Router,
    state: Arc<AppState>,
    middlewares: Vec<Arc<dyn Middleware>>,
    gate: Option<Gate>,
    table: EndpointTable,
}

/// A built application. Cheap to clone; every connection shares one.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Runs one request through the middleware chain and the router.
    pub async fn handle(&self, mut req: Request<Incoming>) -> Response<BoxBody> {
        let ctx = RequestContext::new();
        req.extensions_mut().insert(ctx.clone());

        // Fires if this future is dropped before completion.
        let guard = ctx.cancellation.clone().drop_guard();

        let inner = self.inner.clone();
        let endpoint = move |req: Request<Incoming>| -> BoxFuture<'static, Response<BoxBody>> {
            let inner = inner.clone();
            Box::pin(async move { inner.route(req).await })
        };

        let mut response = Next::new(&self.inner.middlewares, &ctx, &endpoint)
            .run(req)
            .await;
        guard.disarm();

        if let Ok(value) = HeaderValue::from_str(&ctx.trace_id) {
            response.headers_mut().insert(TRACE_ID_HEADER, value);
        }
        response
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.inner.table
    }

    /// Every route, built-in routes excluded.
    pub fn routes(&self) -> Vec<RouteInfo> {
        RouteRegistry::from_router(&self.inner.router).routes().to_vec()
    }

    /// The API description, when enabled.
    pub fn openapi(&self) -> Option<&OpenApiSpec> {
        self.inner.state.get::<OpenApiRegistry>().map(|r| r.spec())
    }

    pub fn state(&self) -> &AppState {
        &self.inner.state
    }
}

impl Inner {
    async fn route(&self, req: Request<Incoming>) -> Response<BoxBody> {
        let ctx = req.extensions().get::<RequestContext>().cloned();

        let Some((route, params)) = self.router.find(req.method(), req.uri().path()) else {
            return Error::not_found(format!("no route for {} {}", req.method(), req.uri().path()))
                .into_response_with(ctx.as_ref());
        };

        let req = match &self.gate {
            Some(gate) => {
                let (mut parts, body) = req.into_parts();
                match gate.check(&route.meta.access, &parts).await {
                    Ok(Some(user)) => {
                        parts.extensions.insert(user);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::debug!(
                            trace_id = ctx.as_ref().map(|c| c.trace_id.as_str()).unwrap_or("-"),
                            route = %route.meta.handler_name,
                            status = err.status,
                            "request rejected by access rule"
                        );
                        return err.into_response_with(ctx.as_ref());
                    }
                }
                Request::from_parts(parts, body)
            }
            None => req,
        };

        (route.handler)(req, params, self.state.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestClient;
    use http::StatusCode;

    #[tokio::test]
    async fn test_unknown_route_is_structured_404() {
        let client = TestClient::new(App::new()).await;
        let response = client.get("/nope").send().await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = response.json::<serde_json::Value>();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(
            json["trace_id"].as_str(),
            response.headers().get(TRACE_ID_HEADER).and_then(|v| v.to_str().ok())
        );
    }

    #[tokio::test]
    async fn test_hand_written_route_is_served() {
        let router = Router::new().get("/hello", |_, _, _| async { "hello" });
        let client = TestClient::new(App::new().router(router)).await;
        let response = client.get("/hello").send().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text(), "hello");
    }

    #[tokio::test]
    async fn test_auth_guards_non_public_routes() {
        let router = Router::new()
            .get("/private", |_, _, _| async { "secret" })
            .public_route(Method::GET, "/open", |_, _, _| async { "open" });
        let auth = AuthConfig::new("test-secret", 3600);
        let token = auth.create_token("alice").unwrap();
        let client = TestClient::new(App::new().router(router).with_auth(auth)).await;

        assert_eq!(client.get("/open").send().await.status(), StatusCode::OK);
        assert_eq!(
            client.get("/private").send().await.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            client.get("/private").bearer(&token).send().await.status(),
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_request_timeout_returns_504() {
        let router = Router::new().get("/slow", |_, _, _| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        });
        let app = App::new()
            .router(router)
            .with_request_timeout(Duration::from_millis(50));
        let client = TestClient::new(app).await;

        let response = client.get("/slow").send().await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(response.json::<serde_json::Value>()["error"]["code"], "TIMEOUT");
    }

    #[test]
    fn test_dispatcher_routes_exclude_builtins() {
        let router = Router::new().get("/hello", |_, _, _| async { "hello" });
        let dispatcher = App::new()
            .router(router)
            .with_introspection(true)
            .openapi("t", "1")
            .build()
            .unwrap();

        let routes = dispatcher.routes();
        assert_eq!(routes.len(), 1);
        assert!(dispatcher.openapi().is_some());
    }
}
