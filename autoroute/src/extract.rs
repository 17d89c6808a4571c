use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use bytes::Bytes;
use http::Request;
use http_body_util::BodyExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::Error;
use crate::response::{BoxBody, IntoResponse};

/// Path parameters captured by `:name` segments of a route pattern.
pub type PathParams = HashMap<String, String>;

/// JSON request body or response value.
///
/// As a service return type, `Json<T>` marks a single serialized value.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: DeserializeOwned> Json<T> {
    pub async fn from_request(req: Request<hyper::body::Incoming>) -> Result<Self, Error> {
        let bytes = read_body(req).await?;
        Self::from_bytes(&bytes)
    }

    /// Decodes a body. Malformed JSON and shape mismatches are both 400s.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let value: T = serde_json::from_slice(bytes)
            .map_err(|e| Error::bad_request(format!("invalid JSON: {}", e)))?;

        Ok(Json(value))
    }
}

impl<T: serde::Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> http::Response<BoxBody> {
        match serde_json::to_value(&self.0) {
            Ok(value) => crate::response::json_response(http::StatusCode::OK, &value),
            Err(e) => Error::from(e).into_response(),
        }
    }
}

pub async fn read_body(req: Request<hyper::body::Incoming>) -> Result<Bytes, Error> {
    let body = req.into_body();
    Ok(body
        .collect()
        .await
        .map_err(|_| Error::bad_request("failed to read body"))?
        .to_bytes())
}

#[derive(Deserialize)]
struct IdQuery {
    id: Option<String>,
}

/// Reads the resource identifier for a request.
///
/// An `:id` path parameter wins; otherwise the `id` query parameter is used.
pub fn identifier(uri: &http::Uri, params: &PathParams) -> Result<Uuid, Error> {
    let raw = match params.get("id") {
        Some(value) => Some(value.clone()),
        None => {
            let query: IdQuery = serde_urlencoded::from_str(uri.query().unwrap_or(""))
                .map_err(|e| Error::bad_request(format!("invalid query string: {}", e)))?;
            query.id
        }
    };

    let raw = raw.ok_or_else(|| Error::bad_request("missing `id` parameter"))?;
    Uuid::parse_str(&raw).map_err(|_| Error::bad_request(format!("`{}` is not a valid id", raw)))
}
