//! Explicit adapters between service methods and the handler shapes.
//!
//! Each constructor fixes the shape statically: a method can only be
//! registered through the adapter whose argument list it actually takes.
//! `#[app_service]` picks the adapter for you.

use std::future::Future;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::descriptor::MethodDescriptor;
use super::outcome::{IntoOutcome, Outcome, schema_of};
use super::shape::HandlerShape;
use crate::error::Error;
use crate::extract::Json;
use crate::middleware::BoxFuture;

pub(crate) type Invocation = BoxFuture<'static, Result<Outcome, Error>>;

/// A decoded call waiting for its service instance.
pub(crate) type Call<S> = Box<dyn FnOnce(Arc<S>, CancellationToken) -> Invocation + Send>;

type CallFn<S> = Arc<dyn Fn(Arc<S>, CancellationToken) -> Invocation + Send + Sync>;
type IdCallFn<S> = Arc<dyn Fn(Arc<S>, Uuid, CancellationToken) -> Invocation + Send + Sync>;
type DecodeFn<S> = Arc<dyn Fn(&[u8]) -> Result<Call<S>, Error> + Send + Sync>;
type IdDecodeFn<S> = Arc<dyn Fn(Uuid, &[u8]) -> Result<Call<S>, Error> + Send + Sync>;

pub(crate) enum Invoker<S> {
    NoArgs(CallFn<S>),
    IdOnly(IdCallFn<S>),
    /// Decodes the body first; the service is resolved only if that succeeds.
    BodyOnly(DecodeFn<S>),
    IdAndBody(IdDecodeFn<S>),
    Fallback(CallFn<S>),
}

impl<S> Clone for Invoker<S> {
    fn clone(&self) -> Self {
        match self {
            Invoker::NoArgs(f) => Invoker::NoArgs(f.clone()),
            Invoker::IdOnly(f) => Invoker::IdOnly(f.clone()),
            Invoker::BodyOnly(f) => Invoker::BodyOnly(f.clone()),
            Invoker::IdAndBody(f) => Invoker::IdAndBody(f.clone()),
            Invoker::Fallback(f) => Invoker::Fallback(f.clone()),
        }
    }
}

impl<S> Invoker<S> {
    pub(crate) fn shape(&self) -> HandlerShape {
        match self {
            Invoker::NoArgs(_) => HandlerShape::NoArgs,
            Invoker::IdOnly(_) => HandlerShape::IdOnly,
            Invoker::BodyOnly(_) => HandlerShape::BodyOnly,
            Invoker::IdAndBody(_) => HandlerShape::IdAndBody,
            Invoker::Fallback(_) => HandlerShape::Fallback,
        }
    }
}

fn no_schema() -> Option<serde_json::Value> {
    None
}

/// One service method bound to its adapter.
pub struct Operation<S> {
    pub(crate) descriptor: MethodDescriptor,
    pub(crate) invoker: Invoker<S>,
    pub(crate) request_schema: fn() -> Option<serde_json::Value>,
    pub(crate) response_schema: fn() -> Option<serde_json::Value>,
}

impl<S: Send + Sync + 'static> Operation<S> {
    /// `(ct)`
    pub fn no_args<F, Fut, R>(descriptor: MethodDescriptor, f: F) -> Self
    where
        F: Fn(Arc<S>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: IntoOutcome,
    {
        Self {
            descriptor: descriptor.returning(R::SHAPE),
            invoker: Invoker::NoArgs(call_fn(f)),
            request_schema: no_schema,
            response_schema: R::schema,
        }
    }

    /// `(id, ct)`
    pub fn id_only<F, Fut, R>(descriptor: MethodDescriptor, f: F) -> Self
    where
        F: Fn(Arc<S>, Uuid, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: IntoOutcome,
    {
        let call: IdCallFn<S> = Arc::new(move |service: Arc<S>, id: Uuid, ct: CancellationToken| -> Invocation {
            let fut = f(service, id, ct);
            Box::pin(async move { fut.await?.into_outcome() })
        });

        Self {
            descriptor: descriptor.returning(R::SHAPE),
            invoker: Invoker::IdOnly(call),
            request_schema: no_schema,
            response_schema: R::schema,
        }
    }

    /// `(body, ct)`
    pub fn body_only<P, F, Fut, R>(descriptor: MethodDescriptor, f: F) -> Self
    where
        P: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(Arc<S>, P, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: IntoOutcome,
    {
        let f = Arc::new(f);
        let decode: DecodeFn<S> = Arc::new(move |bytes: &[u8]| -> Result<Call<S>, Error> {
            let Json(payload) = Json::<P>::from_bytes(bytes)?;
            let f = f.clone();
            Ok(Box::new(move |service: Arc<S>, ct: CancellationToken| -> Invocation {
                let fut = f(service, payload, ct);
                Box::pin(async move { fut.await?.into_outcome() })
            }))
        });

        Self {
            descriptor: descriptor.returning(R::SHAPE),
            invoker: Invoker::BodyOnly(decode),
            request_schema: schema_of::<P>,
            response_schema: R::schema,
        }
    }

    /// `(id, body, ct)`
    pub fn id_and_body<P, F, Fut, R>(descriptor: MethodDescriptor, f: F) -> Self
    where
        P: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(Arc<S>, Uuid, P, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: IntoOutcome,
    {
        let f = Arc::new(f);
        let decode: IdDecodeFn<S> = Arc::new(move |id: Uuid, bytes: &[u8]| -> Result<Call<S>, Error> {
            let Json(payload) = Json::<P>::from_bytes(bytes)?;
            let f = f.clone();
            Ok(Box::new(move |service: Arc<S>, ct: CancellationToken| -> Invocation {
                let fut = f(service, id, payload, ct);
                Box::pin(async move { fut.await?.into_outcome() })
            }))
        });

        Self {
            descriptor: descriptor.returning(R::SHAPE),
            invoker: Invoker::IdAndBody(decode),
            request_schema: schema_of::<P>,
            response_schema: R::schema,
        }
    }

    /// Invokes `f` with the cancellation token only, whatever the declared
    /// parameters are. Rejected at startup unless fallback handlers are
    /// enabled in [`MapperOptions`](super::MapperOptions).
    pub fn fallback<F, Fut, R>(descriptor: MethodDescriptor, f: F) -> Self
    where
        F: Fn(Arc<S>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: IntoOutcome,
    {
        Self {
            descriptor: descriptor.returning(R::SHAPE),
            invoker: Invoker::Fallback(call_fn(f)),
            request_schema: no_schema,
            response_schema: R::schema,
        }
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    pub fn shape(&self) -> HandlerShape {
        self.invoker.shape()
    }
}

fn call_fn<S, F, Fut, R>(f: F) -> CallFn<S>
where
    S: Send + Sync + 'static,
    F: Fn(Arc<S>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoOutcome,
{
    Arc::new(move |service: Arc<S>, ct: CancellationToken| -> Invocation {
        let fut = f(service, ct);
        Box::pin(async move { fut.await?.into_outcome() })
    })
}
