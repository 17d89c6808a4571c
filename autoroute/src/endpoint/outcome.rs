//! Return values and the statuses they turn into.
//!
//! [`ResponsePlan::classify`] is the single place where a (shape, return
//! shape, method name) triple is mapped to statuses. The runtime responder
//! and the API description both read from it.

use http::{Response, StatusCode};
use schemars::JsonSchema;
use serde::Serialize;
use uuid::Uuid;

use super::conventions;
use super::descriptor::ReturnShape;
use super::shape::HandlerShape;
use crate::error::Error;
use crate::extract::Json;
use crate::response::{BoxBody, IntoResponse, json_response};

/// A service method's result, type-erased.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The method returned nothing.
    Empty,
    /// A serialized value.
    Value(serde_json::Value),
    /// An optional value that was absent.
    Missing,
    /// A resource identifier.
    Identifier(Uuid),
}

/// Types a service method may return.
///
/// | Rust type   | Shape              |
/// |-------------|--------------------|
/// | `()`        | `None`             |
/// | `Json<T>`   | `Value`            |
/// | `Option<T>` | `Optional`         |
/// | `Vec<T>`    | `Collection`       |
/// | `Uuid`      | `ScalarIdentifier` |
pub trait IntoOutcome: Send + 'static {
    const SHAPE: ReturnShape;

    fn into_outcome(self) -> Result<Outcome, Error>;

    /// JSON schema of the success body, for the API description.
    fn schema() -> Option<serde_json::Value>;
}

impl IntoOutcome for () {
    const SHAPE: ReturnShape = ReturnShape::None;

    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome::Empty)
    }

    fn schema() -> Option<serde_json::Value> {
        None
    }
}

impl IntoOutcome for Uuid {
    const SHAPE: ReturnShape = ReturnShape::ScalarIdentifier;

    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome::Identifier(self))
    }

    fn schema() -> Option<serde_json::Value> {
        schema_of::<Uuid>()
    }
}

impl<T> IntoOutcome for Json<T>
where
    T: Serialize + JsonSchema + Send + 'static,
{
    const SHAPE: ReturnShape = ReturnShape::Value;

    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome::Value(serde_json::to_value(self.0)?))
    }

    fn schema() -> Option<serde_json::Value> {
        schema_of::<T>()
    }
}

impl<T> IntoOutcome for Option<T>
where
    T: Serialize + JsonSchema + Send + 'static,
{
    const SHAPE: ReturnShape = ReturnShape::Optional;

    fn into_outcome(self) -> Result<Outcome, Error> {
        match self {
            Some(value) => Ok(Outcome::Value(serde_json::to_value(value)?)),
            None => Ok(Outcome::Missing),
        }
    }

    fn schema() -> Option<serde_json::Value> {
        schema_of::<T>()
    }
}

impl<T> IntoOutcome for Vec<T>
where
    T: Serialize + JsonSchema + Send + 'static,
{
    const SHAPE: ReturnShape = ReturnShape::Collection;

    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome::Value(serde_json::to_value(self)?))
    }

    fn schema() -> Option<serde_json::Value> {
        schema_of::<Vec<T>>()
    }
}

/// Root JSON schema for `T`, without the `$schema` marker.
pub(crate) fn schema_of<T: JsonSchema>() -> Option<serde_json::Value> {
    let mut value = serde_json::to_value(schemars::schema_for!(T)).ok()?;
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
    }
    Some(value)
}

/// What a successful response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SuccessBody {
    Empty,
    Json,
    /// 201 with a location reference and `{"id": ...}`.
    Created,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResponsePlan {
    #[serde(serialize_with = "serialize_status")]
    pub success: StatusCode,
    pub body: SuccessBody,
    /// An absent optional result becomes a 404.
    pub not_found_when_missing: bool,
}

fn serialize_status<S: serde::Serializer>(status: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(status.as_u16())
}

impl ResponsePlan {
    const fn new(success: StatusCode, body: SuccessBody) -> Self {
        Self {
            success,
            body,
            not_found_when_missing: false,
        }
    }

    pub fn classify(shape: HandlerShape, returns: ReturnShape, method: &str) -> Self {
        match (shape, returns) {
            (HandlerShape::IdAndBody, _) => Self::new(StatusCode::NO_CONTENT, SuccessBody::Empty),

            (HandlerShape::IdOnly, ReturnShape::None) if conventions::is_delete_name(method) => {
                Self::new(StatusCode::NO_CONTENT, SuccessBody::Empty)
            }
            (HandlerShape::IdOnly, ReturnShape::Optional) => Self {
                not_found_when_missing: true,
                ..Self::new(StatusCode::OK, SuccessBody::Json)
            },

            (HandlerShape::BodyOnly, ReturnShape::ScalarIdentifier) => {
                Self::new(StatusCode::CREATED, SuccessBody::Created)
            }

            (_, ReturnShape::None) => Self::new(StatusCode::OK, SuccessBody::Empty),
            (_, _) => Self::new(StatusCode::OK, SuccessBody::Json),
        }
    }

    /// Turns a method's outcome into the planned response.
    ///
    /// `location` builds the location reference for a created identifier.
    pub fn respond(
        &self,
        outcome: Outcome,
        location: impl FnOnce(Uuid) -> String,
    ) -> Result<Response<BoxBody>, Error> {
        if self.success == StatusCode::NO_CONTENT {
            return Ok(StatusCode::NO_CONTENT.into_response());
        }

        let response = match outcome {
            Outcome::Missing if self.not_found_when_missing => {
                return Err(Error::not_found("resource not found"));
            }
            Outcome::Missing => json_response(self.success, &serde_json::Value::Null),
            Outcome::Identifier(id) if self.body == SuccessBody::Created => {
                let mut response = json_response(self.success, &serde_json::json!({ "id": id }));
                let location = http::HeaderValue::from_str(&location(id))
                    .map_err(|_| Error::internal("invalid location reference"))?;
                response
                    .headers_mut()
                    .insert(http::header::LOCATION, location);
                response
            }
            Outcome::Identifier(id) => json_response(self.success, &serde_json::json!(id)),
            Outcome::Value(value) => json_response(self.success, &value),
            Outcome::Empty => self.success.into_response(),
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[derive(Serialize, JsonSchema)]
    struct Dto {
        name: String,
    }

    async fn body_json(response: Response<BoxBody>) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn no_location(_: Uuid) -> String {
        unreachable!("no location expected")
    }

    #[test]
    fn test_return_shapes() {
        assert_eq!(<() as IntoOutcome>::SHAPE, ReturnShape::None);
        assert_eq!(<Uuid as IntoOutcome>::SHAPE, ReturnShape::ScalarIdentifier);
        assert_eq!(<Json<Dto> as IntoOutcome>::SHAPE, ReturnShape::Value);
        assert_eq!(<Option<Dto> as IntoOutcome>::SHAPE, ReturnShape::Optional);
        assert_eq!(<Vec<Dto> as IntoOutcome>::SHAPE, ReturnShape::Collection);
    }

    #[test]
    fn test_into_outcome() {
        assert_eq!(().into_outcome().unwrap(), Outcome::Empty);
        assert_eq!(None::<Dto>.into_outcome().unwrap(), Outcome::Missing);
        assert_eq!(
            vec![Dto { name: "a".into() }].into_outcome().unwrap(),
            Outcome::Value(serde_json::json!([{"name": "a"}]))
        );
    }

    #[test]
    fn test_schema_strips_marker() {
        let schema = <Json<Dto> as IntoOutcome>::schema().unwrap();
        assert!(schema.get("$schema").is_none());
        assert_eq!(schema["properties"]["name"]["type"], "string");
        assert!(<() as IntoOutcome>::schema().is_none());
    }

    #[test]
    fn test_classify_no_args() {
        let plan = ResponsePlan::classify(HandlerShape::NoArgs, ReturnShape::Collection, "GetAllAsync");
        assert_eq!(plan.success, StatusCode::OK);
        assert_eq!(plan.body, SuccessBody::Json);

        let plan = ResponsePlan::classify(HandlerShape::NoArgs, ReturnShape::None, "RebuildAsync");
        assert_eq!(plan.success, StatusCode::OK);
        assert_eq!(plan.body, SuccessBody::Empty);
    }

    #[test]
    fn test_classify_id_only() {
        let plan = ResponsePlan::classify(HandlerShape::IdOnly, ReturnShape::Optional, "GetAsync");
        assert_eq!(plan.success, StatusCode::OK);
        assert!(plan.not_found_when_missing);

        let plan = ResponsePlan::classify(HandlerShape::IdOnly, ReturnShape::None, "DeleteAsync");
        assert_eq!(plan.success, StatusCode::NO_CONTENT);

        let plan = ResponsePlan::classify(HandlerShape::IdOnly, ReturnShape::None, "RemoveAsync");
        assert_eq!(plan.success, StatusCode::NO_CONTENT);

        let plan = ResponsePlan::classify(HandlerShape::IdOnly, ReturnShape::None, "ArchiveAsync");
        assert_eq!(plan.success, StatusCode::OK);
        assert!(!plan.not_found_when_missing);
    }

    #[test]
    fn test_classify_body_only() {
        let plan =
            ResponsePlan::classify(HandlerShape::BodyOnly, ReturnShape::ScalarIdentifier, "CreateAsync");
        assert_eq!(plan.success, StatusCode::CREATED);
        assert_eq!(plan.body, SuccessBody::Created);

        let plan = ResponsePlan::classify(HandlerShape::BodyOnly, ReturnShape::Value, "SearchAsync");
        assert_eq!(plan.success, StatusCode::OK);
        assert_eq!(plan.body, SuccessBody::Json);
    }

    #[test]
    fn test_classify_id_and_body_is_always_no_content() {
        for returns in [
            ReturnShape::None,
            ReturnShape::Value,
            ReturnShape::Optional,
            ReturnShape::Collection,
            ReturnShape::ScalarIdentifier,
        ] {
            let plan = ResponsePlan::classify(HandlerShape::IdAndBody, returns, "UpdateAsync");
            assert_eq!(plan.success, StatusCode::NO_CONTENT);
        }
    }

    #[tokio::test]
    async fn test_respond_created() {
        let id = Uuid::new_v4();
        let plan =
            ResponsePlan::classify(HandlerShape::BodyOnly, ReturnShape::ScalarIdentifier, "CreateAsync");
        let response = plan
            .respond(Outcome::Identifier(id), |id| format!("/api/product/{}", id))
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get("location").unwrap(),
            format!("/api/product/{}", id).as_str()
        );
        assert_eq!(body_json(response).await["id"], id.to_string());
    }

    #[tokio::test]
    async fn test_respond_missing_is_404_when_planned() {
        let plan = ResponsePlan::classify(HandlerShape::IdOnly, ReturnShape::Optional, "GetAsync");
        let err = plan.respond(Outcome::Missing, no_location).unwrap_err();
        assert_eq!(err.status, 404);
    }

    #[tokio::test]
    async fn test_respond_missing_is_null_otherwise() {
        let plan = ResponsePlan::classify(HandlerShape::NoArgs, ReturnShape::Optional, "GetCurrentAsync");
        let response = plan.respond(Outcome::Missing, no_location).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_respond_no_content_ignores_value() {
        let plan = ResponsePlan::classify(HandlerShape::IdAndBody, ReturnShape::Value, "UpdateAsync");
        let response = plan
            .respond(Outcome::Value(serde_json::json!({"ignored": true})), no_location)
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_respond_empty_is_bodyless_ok() {
        let plan = ResponsePlan::classify(HandlerShape::NoArgs, ReturnShape::None, "RebuildAsync");
        let response = plan.respond(Outcome::Empty, no_location).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_respond_identifier_without_created_plan() {
        let id = Uuid::new_v4();
        let plan = ResponsePlan::classify(HandlerShape::NoArgs, ReturnShape::ScalarIdentifier, "NextIdAsync");
        let response = plan.respond(Outcome::Identifier(id), no_location).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!(id.to_string()));
    }
}
