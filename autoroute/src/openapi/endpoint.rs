use std::sync::Arc;

use http::{Request, Response, StatusCode};
use hyper::body::Incoming;

use crate::error::Error;
use crate::extract::PathParams;
use crate::openapi::OpenApiSpec;
use crate::response::{BoxBody, IntoResponse, json_response};
use crate::state::AppState;

/// The built API description, stored in application state.
#[derive(Debug, Clone)]
pub struct OpenApiRegistry {
    spec: OpenApiSpec,
}

impl OpenApiRegistry {
    pub fn new(spec: OpenApiSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &OpenApiSpec {
        &self.spec
    }
}

/// Serves the API description as JSON; 404 when it is not enabled.
pub async fn openapi_spec(
    _req: Request<Incoming>,
    _params: PathParams,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let Some(registry) = state.get::<OpenApiRegistry>() else {
        return Error::not_found("API description is not enabled").into_response();
    };

    match serde_json::to_value(registry.spec()) {
        Ok(value) => json_response(StatusCode::OK, &value),
        Err(e) => Error::from(e).into_response(),
    }
}
