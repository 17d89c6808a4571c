use std::fmt;

use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;

use crate::context::RequestContext;
use crate::response::{BoxBody, IntoResponse};

/// Structured error returned from handlers and application services.
///
/// This is the process-wide boundary: anything a service raises is converted
/// into an `Error` (via `Into<Error>`) and rendered as
/// `{"error": {"code", "message"}, "trace_id"}`.
#[derive(Debug, Clone)]
pub struct Error {
    pub status: u16,
    pub code: &'static str,
    pub message: String,
}

impl Error {
    pub fn new(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(400, "BAD_REQUEST", msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(401, "UNAUTHORIZED", msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(403, "FORBIDDEN", msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(404, "NOT_FOUND", msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(409, "CONFLICT", msg)
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(422, "VALIDATION_ERROR", msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(500, "INTERNAL_ERROR", msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(504, "TIMEOUT", msg)
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Renders the error, tagging the body with the request's trace id.
    pub fn into_response_with(self, ctx: Option<&RequestContext>) -> Response<BoxBody> {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: &self.message,
            },
            trace_id: ctx.map(|c| c.trace_id.as_str()),
        };
        let json = serde_json::to_vec(&body).unwrap_or_default();

        let mut response = Response::new(Full::new(Bytes::from(json)));
        *response.status_mut() = self.status_code();
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        response
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<&'a str>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'static str,
    message: &'a str,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response<BoxBody> {
        self.into_response_with(None)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::internal(format!("serialization failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures detected while building the endpoint table.
///
/// All of these abort startup; nothing is silently shadowed or dropped.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StartupError {
    #[error("route group `{group}` is claimed by both `{first}` and `{second}`")]
    DuplicateRouteGroup {
        group: String,
        first: String,
        second: String,
    },

    #[error("service `{service}` derives an empty route group name")]
    EmptyRouteGroup { service: String },

    #[error("route {verb} {path} is mapped twice (`{first}` and `{second}`)")]
    DuplicateRoute {
        verb: String,
        path: String,
        first: String,
        second: String,
    },

    #[error(
        "routes {verb} {first_path} (`{first}`) and {verb} {second_path} (`{second}`) match the same requests"
    )]
    AmbiguousRoute {
        verb: String,
        first_path: String,
        second_path: String,
        first: String,
        second: String,
    },

    #[error(
        "`{service}.{method}` declares parameters {declared} which do not match its {adapter} adapter"
    )]
    ShapeMismatch {
        service: String,
        method: String,
        declared: String,
        adapter: String,
    },

    #[error(
        "`{service}.{method}` has an unsupported parameter shape {declared}; enable fallback handlers to map it anyway"
    )]
    UnsupportedShape {
        service: String,
        method: String,
        declared: String,
    },
}
