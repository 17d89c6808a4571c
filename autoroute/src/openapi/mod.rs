//! OpenAPI 3.0 description of the generated endpoints.
//!
//! Statuses come from each endpoint's [`ResponsePlan`](crate::endpoint::ResponsePlan),
//! the same classification the runtime responder uses.

mod endpoint;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub use endpoint::{OpenApiRegistry, openapi_spec};

use crate::endpoint::{EndpointTable, MappedEndpoint, SuccessBody};
use crate::router::Router;

pub const OPENAPI_VERSION: &str = "3.0.3";

const BEARER_SCHEME: &str = "bearerAuth";
const COOKIE_SCHEME: &str = "cookieAuth";
const ERROR_SCHEMA: &str = "Error";
const DEFS_REF: &str = "#/$defs/";
const COMPONENTS_REF: &str = "#/components/schemas/";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenApiSpec {
    pub openapi: String,
    pub info: Info,
    pub paths: BTreeMap<String, BTreeMap<String, OperationObject>>,
    pub components: Components,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Info {
    pub title: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, ResponseObject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestBody {
    pub required: bool,
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaType {
    pub schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseObject {
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaType>,
}

impl ResponseObject {
    fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            headers: BTreeMap::new(),
            content: BTreeMap::new(),
        }
    }

    fn json(mut self, schema: Value) -> Self {
        self.content
            .insert("application/json".to_string(), MediaType { schema });
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub security_schemes: BTreeMap<String, Value>,
}

/// Builds an [`OpenApiSpec`] from the endpoint table plus any hand-written
/// routes.
#[derive(Debug, Clone)]
pub struct OpenApiBuilder {
    info: Info,
    cookie_name: Option<String>,
}

impl OpenApiBuilder {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: Info {
                title: title.into(),
                version: version.into(),
            },
            cookie_name: None,
        }
    }

    /// Documents cookie authentication under the given cookie name next to
    /// bearer tokens.
    pub fn cookie_auth(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = Some(cookie_name.into());
        self
    }

    pub fn build(&self, table: &EndpointTable, router: &Router) -> OpenApiSpec {
        let mut spec = OpenApiSpec {
            openapi: OPENAPI_VERSION.to_string(),
            info: self.info.clone(),
            paths: BTreeMap::new(),
            components: self.components(),
        };

        for endpoint in table.iter() {
            let operation = self.describe(endpoint, &mut spec.components.schemas);
            spec.paths
                .entry(openapi_path(&endpoint.path))
                .or_default()
                .insert(endpoint.route.verb.as_str().to_lowercase(), operation);
        }

        for (method, pattern, meta) in router.routes() {
            if pattern.starts_with(crate::BUILTIN_PREFIX) {
                continue;
            }
            let item = spec.paths.entry(openapi_path(pattern)).or_default();
            let verb = method.as_str().to_lowercase();
            if item.contains_key(&verb) {
                continue;
            }

            let mut responses = BTreeMap::new();
            responses.insert("200".to_string(), ResponseObject::new("Success"));
            item.insert(
                verb,
                OperationObject {
                    operation_id: Some(meta.handler_name.clone()),
                    summary: None,
                    description: None,
                    tags: meta.tags.clone(),
                    parameters: path_parameters(pattern),
                    request_body: None,
                    responses,
                    security: self.security(!meta.access.is_public()),
                },
            );
        }

        spec
    }

    fn describe(
        &self,
        endpoint: &MappedEndpoint,
        schemas: &mut BTreeMap<String, Value>,
    ) -> OperationObject {
        let group = &endpoint.service.group;
        let segment = &endpoint.route.segment;

        let mut description = format!(
            "Calls {}.{}",
            endpoint.service.type_name, endpoint.method.name
        );
        if let Some(requirement) = endpoint.access.requirement() {
            description.push_str(&format!(
                "\n\n**Required Permission:** `{}`",
                requirement.name()
            ));
        }

        let mut parameters = path_parameters(&endpoint.path);
        if endpoint.shape.takes_id() && !parameters.iter().any(|p| p.name == "id") {
            parameters.push(Parameter {
                name: "id".to_string(),
                location: "query".to_string(),
                required: true,
                schema: uuid_schema(),
            });
        }

        let request_body = endpoint
            .shape
            .takes_body()
            .then(|| endpoint.request_schema.clone())
            .flatten()
            .map(|schema| {
                let mut content = BTreeMap::new();
                content.insert(
                    "application/json".to_string(),
                    MediaType {
                        schema: absorb_defs(schema, schemas),
                    },
                );
                RequestBody {
                    required: true,
                    content,
                }
            });

        OperationObject {
            operation_id: Some(endpoint.route.operation_name.clone()),
            summary: Some(format!("{} operation for {}", segment, group)),
            description: Some(description),
            tags: endpoint.route.tags.clone(),
            parameters,
            request_body,
            responses: self.responses(endpoint, schemas),
            security: self.security(!endpoint.access.is_public()),
        }
    }

    fn responses(
        &self,
        endpoint: &MappedEndpoint,
        schemas: &mut BTreeMap<String, Value>,
    ) -> BTreeMap<String, ResponseObject> {
        let plan = &endpoint.plan;
        let mut responses = BTreeMap::new();

        let success = match plan.body {
            SuccessBody::Empty => ResponseObject::new(status_description(plan.success.as_u16())),
            SuccessBody::Json => {
                let response = ResponseObject::new("Success");
                match endpoint.response_schema.clone() {
                    Some(schema) => response.json(absorb_defs(schema, schemas)),
                    None => response,
                }
            }
            SuccessBody::Created => {
                let mut response = ResponseObject::new("Created").json(json!({
                    "type": "object",
                    "required": ["id"],
                    "properties": { "id": uuid_schema() }
                }));
                response.headers.insert(
                    "Location".to_string(),
                    json!({
                        "description": "Reference to the created resource",
                        "schema": { "type": "string" }
                    }),
                );
                response
            }
        };
        responses.insert(plan.success.as_u16().to_string(), success);

        let mut errors = Vec::new();
        if endpoint.shape.takes_id() || endpoint.shape.takes_body() {
            errors.push(400);
        }
        if !endpoint.access.is_public() {
            errors.push(401);
        }
        if endpoint.access.requirement().is_some() {
            errors.push(403);
        }
        if plan.not_found_when_missing {
            errors.push(404);
        }
        errors.push(500);

        for status in errors {
            responses.insert(
                status.to_string(),
                ResponseObject::new(status_description(status))
                    .json(json!({ "$ref": format!("{}{}", COMPONENTS_REF, ERROR_SCHEMA) })),
            );
        }
        responses
    }

    fn security(&self, required: bool) -> Vec<BTreeMap<String, Vec<String>>> {
        if !required {
            return Vec::new();
        }
        let mut schemes = vec![BEARER_SCHEME];
        if self.cookie_name.is_some() {
            schemes.push(COOKIE_SCHEME);
        }
        schemes
            .into_iter()
            .map(|scheme| BTreeMap::from([(scheme.to_string(), Vec::new())]))
            .collect()
    }

    fn components(&self) -> Components {
        let mut components = Components::default();
        components.schemas.insert(
            ERROR_SCHEMA.to_string(),
            json!({
                "type": "object",
                "required": ["error"],
                "properties": {
                    "error": {
                        "type": "object",
                        "required": ["code", "message"],
                        "properties": {
                            "code": { "type": "string" },
                            "message": { "type": "string" }
                        }
                    },
                    "trace_id": { "type": "string" }
                }
            }),
        );
        components.security_schemes.insert(
            BEARER_SCHEME.to_string(),
            json!({ "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }),
        );
        if let Some(cookie) = &self.cookie_name {
            components.security_schemes.insert(
                COOKIE_SCHEME.to_string(),
                json!({ "type": "apiKey", "in": "cookie", "name": cookie }),
            );
        }
        components
    }
}

fn status_description(status: u16) -> &'static str {
    match status {
        200 => "Success",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        _ => "Internal Server Error",
    }
}

fn uuid_schema() -> Value {
    json!({ "type": "string", "format": "uuid" })
}

/// `/api/product/:id` -> `/api/product/{id}`
fn openapi_path(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn path_parameters(pattern: &str) -> Vec<Parameter> {
    pattern
        .split('/')
        .filter_map(|segment| segment.strip_prefix(':'))
        .map(|name| Parameter {
            name: name.to_string(),
            location: "path".to_string(),
            required: true,
            schema: if name == "id" {
                uuid_schema()
            } else {
                json!({ "type": "string" })
            },
        })
        .collect()
}

/// Moves a schema's local `$defs` into the shared component schemas and
/// points its references there.
fn absorb_defs(mut schema: Value, schemas: &mut BTreeMap<String, Value>) -> Value {
    if let Some(Value::Object(defs)) = schema.as_object_mut().and_then(|o| o.remove("$defs")) {
        for (name, mut def) in defs {
            rewrite_refs(&mut def);
            schemas.entry(name).or_insert(def);
        }
    }
    rewrite_refs(&mut schema);
    schema
}

fn rewrite_refs(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                match inner {
                    Value::String(reference) if key == "$ref" => {
                        if let Some(name) = reference.strip_prefix(DEFS_REF) {
                            *reference = format!("{}{}", COMPONENTS_REF, name);
                        }
                    }
                    _ => rewrite_refs(inner),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(rewrite_refs),
        _ => {}
    }
}
