//! Route introspection.

mod endpoint;
mod route_info;

pub use endpoint::{RouteRegistry, list_routes};
pub use route_info::RouteInfo;
