//! Startup-time mapping from application services to routes.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use super::descriptor::{
    HttpVerb, MethodDescriptor, ParamKind, RouteDescriptor, ServiceDescriptor,
};
use super::handler;
use super::outcome::ResponsePlan;
use super::service::Operations;
use super::shape::HandlerShape;
use crate::discovery::ServiceRegistration;
use crate::error::StartupError;
use crate::permission::Access;
use crate::router::{HandlerFn, RouteMeta, Router};

/// Settings for building the endpoint table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperOptions {
    /// Path prefix for every generated route.
    pub prefix: String,
    /// Map `Operation::fallback` adapters instead of rejecting them.
    pub allow_fallback: bool,
}

impl MapperOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn allow_fallback(mut self, allow: bool) -> Self {
        self.allow_fallback = allow;
        self
    }
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            prefix: "/api".to_string(),
            allow_fallback: false,
        }
    }
}

type MapFn = fn(&ServiceDescriptor, &MapperOptions) -> Result<Vec<MappedEndpoint>, StartupError>;

struct Entry {
    type_id: TypeId,
    type_name: &'static str,
    map: MapFn,
}

/// The set of application services to expose.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: Vec<Entry>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `S`. Adding the same type twice is a no-op.
    pub fn service<S: Operations>(mut self) -> Self {
        let type_id = TypeId::of::<S>();
        if self.entries.iter().any(|e| e.type_id == type_id) {
            tracing::debug!(service = S::TYPE_NAME, "service already registered");
            return self;
        }

        self.entries.push(Entry {
            type_id,
            type_name: S::TYPE_NAME,
            map: map_service::<S>,
        });
        self
    }

    /// Adds every `#[app_service]` linked into the binary, ordered by type
    /// name.
    pub fn discover(self) -> Self {
        let mut registrations: Vec<&ServiceRegistration> =
            inventory::iter::<ServiceRegistration>.into_iter().collect();
        registrations.sort_by_key(|r| r.type_name);

        registrations
            .into_iter()
            .fold(self, |registry, registration| (registration.register)(registry))
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.type_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the endpoint table, failing on any ambiguity.
    pub fn map(&self, options: &MapperOptions) -> Result<EndpointTable, StartupError> {
        let mut groups: HashMap<String, &'static str> = HashMap::new();
        let mut routes: Vec<(HttpVerb, String, String)> = Vec::new();
        let mut endpoints = Vec::new();

        for entry in &self.entries {
            let service = ServiceDescriptor::of(entry.type_name);

            if service.group.is_empty() {
                return Err(StartupError::EmptyRouteGroup {
                    service: entry.type_name.to_string(),
                });
            }
            if let Some(first) = groups.insert(service.group.clone(), entry.type_name) {
                return Err(StartupError::DuplicateRouteGroup {
                    group: service.group,
                    first: first.to_string(),
                    second: entry.type_name.to_string(),
                });
            }

            for endpoint in (entry.map)(&service, options)? {
                let label = endpoint.label();
                let verb = endpoint.route.verb;
                let clash = routes
                    .iter()
                    .find(|(v, path, _)| *v == verb && patterns_overlap(path, &endpoint.path));
                if let Some((_, path, first)) = clash {
                    return Err(if *path == endpoint.path {
                        StartupError::DuplicateRoute {
                            verb: verb.to_string(),
                            path: endpoint.path,
                            first: first.clone(),
                            second: label,
                        }
                    } else {
                        StartupError::AmbiguousRoute {
                            verb: verb.to_string(),
                            first_path: path.clone(),
                            second_path: endpoint.path,
                            first: first.clone(),
                            second: label,
                        }
                    });
                }
                routes.push((verb, endpoint.path.clone(), label.clone()));

                tracing::info!(
                    verb = %endpoint.route.verb,
                    path = %endpoint.path,
                    operation = %label,
                    shape = %endpoint.shape,
                    permission = endpoint.access.requirement().map(|r| r.name()).unwrap_or("-"),
                    "mapped endpoint"
                );
                endpoints.push(endpoint);
            }
        }

        Ok(EndpointTable { endpoints })
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.type_names()).finish()
    }
}

/// Whether some request path matches both patterns: same segment count and
/// every segment pair equal or holding a `:param`.
fn patterns_overlap(a: &str, b: &str) -> bool {
    let a: Vec<&str> = a.split('/').collect();
    let b: Vec<&str> = b.split('/').collect();
    a.len() == b.len()
        && a.iter()
            .zip(&b)
            .all(|(x, y)| x == y || x.starts_with(':') || y.starts_with(':'))
}

fn map_service<S: Operations>(
    service: &ServiceDescriptor,
    options: &MapperOptions,
) -> Result<Vec<MappedEndpoint>, StartupError> {
    let location_base = format!("{}/{}", options.prefix.trim_end_matches('/'), service.group);

    S::operations()
        .into_iter()
        .map(|operation| {
            let method = operation.descriptor;
            let shape = operation.invoker.shape();
            let declared = HandlerShape::classify(&method.params);

            if shape == HandlerShape::Fallback {
                if !options.allow_fallback {
                    return Err(StartupError::UnsupportedShape {
                        service: service.type_name.to_string(),
                        method: method.name.to_string(),
                        declared: method.signature(),
                    });
                }
                let dropped: Vec<&str> = method
                    .params
                    .iter()
                    .filter(|p| p.kind != ParamKind::Cancellation)
                    .map(|p| p.name)
                    .collect();
                tracing::warn!(
                    service = service.type_name,
                    method = method.name,
                    dropped = ?dropped,
                    "mapping fallback handler; declared parameters are not bound"
                );
            } else if declared != shape {
                return Err(StartupError::ShapeMismatch {
                    service: service.type_name.to_string(),
                    method: method.name.to_string(),
                    declared: method.signature(),
                    adapter: shape.to_string(),
                });
            }

            let route = RouteDescriptor::derive(service, &method);
            let path = route.path(&options.prefix, service);
            let plan = ResponsePlan::classify(shape, method.returns, method.name);
            let access = Access::for_declared(method.permission);
            let handler = handler::build(
                format!("{}.{}", service.type_name, method.name),
                operation.invoker,
                plan,
                location_base.clone(),
            );

            Ok(MappedEndpoint {
                service: service.clone(),
                method,
                route,
                shape,
                plan,
                access,
                path,
                request_schema: (operation.request_schema)(),
                response_schema: (operation.response_schema)(),
                handler,
            })
        })
        .collect()
}

/// One generated route with everything known about it.
pub struct MappedEndpoint {
    pub service: ServiceDescriptor,
    pub method: MethodDescriptor,
    pub route: RouteDescriptor,
    pub shape: HandlerShape,
    pub plan: ResponsePlan,
    pub access: Access,
    pub path: String,
    pub request_schema: Option<Value>,
    pub response_schema: Option<Value>,
    handler: HandlerFn,
}

impl MappedEndpoint {
    /// `ProductAppService.GetAllAsync`
    pub fn label(&self) -> String {
        format!("{}.{}", self.service.type_name, self.method.name)
    }
}

impl fmt::Debug for MappedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedEndpoint")
            .field("verb", &self.route.verb)
            .field("path", &self.path)
            .field("operation", &self.label())
            .field("shape", &self.shape)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

/// Every generated route, in registration order.
#[derive(Debug, Default)]
pub struct EndpointTable {
    endpoints: Vec<MappedEndpoint>,
}

impl EndpointTable {
    pub fn iter(&self) -> impl Iterator<Item = &MappedEndpoint> {
        self.endpoints.iter()
    }

    pub fn find(&self, verb: HttpVerb, path: &str) -> Option<&MappedEndpoint> {
        self.endpoints
            .iter()
            .find(|e| e.route.verb == verb && e.path == path)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Registers every endpoint on `router`.
    pub fn install(&self, router: Router) -> Router {
        self.endpoints.iter().fold(router, |router, endpoint| {
            let meta = RouteMeta::new(endpoint.label(), endpoint.access.clone())
                .with_tags(endpoint.route.tags.clone());
            router.route_with(
                endpoint.route.verb.method(),
                &endpoint.path,
                meta,
                endpoint.handler.clone(),
            )
        })
    }
}
