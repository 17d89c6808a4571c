//! Descriptors computed once at startup and shared read-only afterwards.

use std::fmt;
use std::str::FromStr;

use http::Method;
use serde::Serialize;

use super::conventions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            HttpVerb::Get => Method::GET,
            HttpVerb::Post => Method::POST,
            HttpVerb::Put => Method::PUT,
            HttpVerb::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVerb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpVerb::Get),
            "POST" => Ok(HttpVerb::Post),
            "PUT" => Ok(HttpVerb::Put),
            "DELETE" => Ok(HttpVerb::Delete),
            _ => Err(format!("unsupported HTTP verb `{}`", s)),
        }
    }
}

/// A discovered application service and the route group it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub type_name: &'static str,
    pub group: String,
}

impl ServiceDescriptor {
    pub fn of(type_name: &'static str) -> Self {
        Self {
            type_name,
            group: conventions::route_group(type_name),
        }
    }

    pub fn tag(&self) -> String {
        conventions::tag(&self.group)
    }
}

/// What a declared parameter means to the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParamKind {
    /// The request's cancellation token.
    Cancellation,
    /// A UUID resource identifier.
    Identifier,
    /// A structured request body.
    Payload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
}

/// How a method's return value maps onto a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReturnShape {
    None,
    Value,
    Optional,
    Collection,
    ScalarIdentifier,
}

/// One exposed operation of an application service.
///
/// `verb` and `path` are explicit declarations; when absent the naming
/// conventions fill them in.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub params: Vec<Param>,
    pub returns: ReturnShape,
    pub permission: Option<&'static str>,
    pub verb: Option<HttpVerb>,
    pub path: Option<&'static str>,
}

impl MethodDescriptor {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            params: Vec::new(),
            returns: ReturnShape::None,
            permission: None,
            verb: None,
            path: None,
        }
    }

    pub fn param(mut self, name: &'static str, kind: ParamKind) -> Self {
        self.params.push(Param { name, kind });
        self
    }

    pub fn permission(mut self, permission: &'static str) -> Self {
        self.permission = Some(permission);
        self
    }

    pub fn verb(mut self, verb: HttpVerb) -> Self {
        self.verb = Some(verb);
        self
    }

    pub fn path(mut self, path: &'static str) -> Self {
        self.path = Some(path);
        self
    }

    pub(crate) fn returning(mut self, returns: ReturnShape) -> Self {
        self.returns = returns;
        self
    }

    /// Human-readable parameter list, e.g. `(id: Identifier, ct: Cancellation)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{}: {:?}", p.name, p.kind))
            .collect();
        format!("({})", params.join(", "))
    }
}

/// Routing metadata for one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDescriptor {
    pub verb: HttpVerb,
    pub segment: String,
    pub tags: Vec<String>,
    pub operation_name: String,
}

impl RouteDescriptor {
    /// Explicit declarations first, conventions for whatever is left.
    pub fn derive(service: &ServiceDescriptor, method: &MethodDescriptor) -> Self {
        let verb = method
            .verb
            .unwrap_or_else(|| conventions::infer_verb(method.name));
        let segment = match method.path {
            Some(path) => path.trim_matches('/').to_string(),
            None => conventions::path_segment(method.name),
        };
        let operation_name = format!("{}_{}", service.group, segment.replace('/', "_"));

        Self {
            verb,
            segment,
            tags: vec![service.tag()],
            operation_name,
        }
    }

    /// Full path under the API prefix, e.g. `/api/product/getall`.
    pub fn path(&self, prefix: &str, service: &ServiceDescriptor) -> String {
        let prefix = prefix.trim_end_matches('/');
        if self.segment.is_empty() {
            format!("{}/{}", prefix, service.group)
        } else {
            format!("{}/{}/{}", prefix, service.group, self.segment)
        }
    }
}
