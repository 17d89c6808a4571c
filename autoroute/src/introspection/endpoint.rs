use std::sync::Arc;

use http::{Request, Response, StatusCode};
use hyper::body::Incoming;

use crate::error::Error;
use crate::extract::PathParams;
use crate::introspection::RouteInfo;
use crate::response::{BoxBody, IntoResponse, json_response};
use crate::router::Router;
use crate::state::AppState;

/// Every route of the running application, stored in application state when
/// introspection is enabled.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: Vec<RouteInfo>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn with_routes(routes: Vec<RouteInfo>) -> Self {
        Self { routes }
    }

    /// Snapshot of `router`, built-in routes excluded.
    pub fn from_router(router: &Router) -> Self {
        let routes = router
            .routes()
            .filter(|(_, path, _)| !path.starts_with(crate::BUILTIN_PREFIX))
            .map(|(method, path, meta)| RouteInfo::from_meta(method, path, meta))
            .collect();
        Self { routes }
    }

    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }
}

/// Lists all registered routes as JSON.
pub async fn list_routes(
    _req: Request<Incoming>,
    _params: PathParams,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let Some(registry) = state.get::<RouteRegistry>() else {
        return Error::not_found("introspection is not enabled").into_response();
    };

    match serde_json::to_value(registry.routes()) {
        Ok(value) => json_response(StatusCode::OK, &value),
        Err(e) => Error::from(e).into_response(),
    }
}
