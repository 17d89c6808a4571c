//! Route metadata for introspection.

use serde::Serialize;

use crate::router::RouteMeta;

/// Metadata about a registered route.
///
/// ```
/// use autoroute::introspection::RouteInfo;
///
/// let info = RouteInfo::new("DELETE", "/api/product/delete", "ProductAppService.DeleteAsync",
///     Some("Products.Delete".to_string()), vec!["Product".to_string()]);
/// assert_eq!(info.method, "DELETE");
/// assert!(!info.public);
/// ```
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteInfo {
    pub method: String,
    /// Path pattern with parameters (e.g. `/api/product/:id`).
    pub path: String,
    /// `Service.Method` for generated routes, the function name otherwise.
    pub handler_name: String,
    /// Declared permission, if any.
    pub permission: Option<String>,
    pub tags: Vec<String>,
    pub public: bool,
}

impl RouteInfo {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        handler_name: impl Into<String>,
        permission: Option<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            handler_name: handler_name.into(),
            permission,
            tags,
            public: false,
        }
    }

    pub(crate) fn from_meta(method: &http::Method, path: &str, meta: &RouteMeta) -> Self {
        Self {
            public: meta.access.is_public(),
            ..Self::new(
                method.as_str(),
                path,
                meta.handler_name.clone(),
                meta.access.requirement().map(|r| r.name().to_string()),
                meta.tags.clone(),
            )
        }
    }
}
