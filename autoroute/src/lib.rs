//! Convention-driven HTTP endpoints for application services.
//!
//! Annotate an application service's `impl` block with `#[app_service]` and
//! every public method becomes a route under `/api/<group>/<segment>`: the
//! verb comes from the method name (`get`/`list`/`find` are GETs,
//! `create`/`add`/`post` are POSTs, and so on), the handler from the
//! method's parameter shape, and the access rule from its declared
//! permission.
//!
//! ```ignore
//! use autoroute::prelude::*;
//!
//! struct ProductAppService { repo: Arc<dyn ProductRepository> }
//!
//! impl AppService for ProductAppService {}
//!
//! #[app_service]
//! impl ProductAppService {
//!     #[permission("Products.Read")]
//!     pub async fn get_all_async(&self, ct: CancellationToken) -> Result<Vec<ProductDto>> {
//!         self.repo.list(ct).await
//!     }
//!
//!     #[permission("Products.Delete")]
//!     pub async fn delete_async(&self, id: Uuid, ct: CancellationToken) -> Result<()> {
//!         self.repo.delete(id, ct).await
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     App::new()
//!         .provide(ProductAppService { repo })
//!         .discover()
//!         .openapi("catalog", "1.0")
//!         .listen("127.0.0.1:3000")
//!         .await
//! }
//! ```

pub mod app;
pub mod auth;
pub mod config;
pub mod context;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod extract;
pub mod introspection;
pub mod middleware;
pub mod observability;
pub mod openapi;
pub mod permission;
pub mod response;
pub mod router;
pub mod server;
pub mod state;
pub mod testing;

/// Path prefix of the routes the framework serves itself.
pub const BUILTIN_PREFIX: &str = "/__autoroute";

pub use error::{Error, Result, StartupError};

pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::app::{App, Dispatcher};
    pub use crate::auth::{AuthConfig, Claims, CurrentUser};
    pub use crate::config::{ServerConfig, load_dotenv};
    pub use crate::context::RequestContext;
    pub use crate::endpoint::{
        AppService, Capability, HttpVerb, MapperOptions, Operation, Operations, ServiceRegistry,
    };
    pub use crate::error::{Error, Result};
    pub use crate::extract::{Json, PathParams};
    pub use crate::middleware::{Middleware, Next, RequestLogMiddleware, TimeoutMiddleware};
    pub use crate::observability::TracingConfig;
    pub use crate::permission::{ClaimsPermissionEvaluator, GrantTable, PermissionEvaluator};
    pub use crate::response::IntoResponse;
    pub use crate::router::Router;
    pub use crate::state::AppState;

    pub use autoroute_macros::app_service;
    pub use schemars::JsonSchema;
    pub use serde::{Deserialize, Serialize};
    pub use tokio_util::sync::CancellationToken;
    pub use uuid::Uuid;
}

// Used by code generated from `#[app_service]`.
#[doc(hidden)]
pub use inventory;

pub use autoroute_macros::app_service;
pub use schemars;
pub use tokio_util::sync::CancellationToken;
pub use uuid;
