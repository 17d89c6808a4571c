//! Compiles an operation into a route handler.
//!
//! Within one request the steps run strictly in order: read and decode the
//! inputs, resolve the service, invoke, translate the outcome.

use std::sync::Arc;

use http::{Request, Response};
use hyper::body::Incoming;

use super::operation::Invoker;
use super::outcome::ResponsePlan;
use super::service::{AppService, resolve};
use crate::context::{RequestContext, cancellation_of};
use crate::error::Error;
use crate::extract::{PathParams, identifier, read_body};
use crate::middleware::BoxFuture;
use crate::response::BoxBody;
use crate::router::HandlerFn;
use crate::state::AppState;

pub(crate) fn build<S: AppService>(
    label: String,
    invoker: Invoker<S>,
    plan: ResponsePlan,
    location_base: String,
) -> HandlerFn {
    let label: Arc<str> = label.into();
    let location_base: Arc<str> = location_base.into();

    Arc::new(move |req: Request<Incoming>, params: PathParams, state: Arc<AppState>| {
        let invoker = invoker.clone();
        let label = label.clone();
        let location_base = location_base.clone();

        let fut: BoxFuture<'static, Response<BoxBody>> = Box::pin(async move {
            let ctx = req.extensions().get::<RequestContext>().cloned();

            match run(invoker, plan, &location_base, req, params, state).await {
                Ok(response) => response,
                Err(err) => {
                    let trace_id = ctx.as_ref().map(|c| c.trace_id.as_str()).unwrap_or("-");
                    if err.status >= 500 {
                        tracing::error!(
                            trace_id,
                            operation = %label,
                            status = err.status,
                            error = %err,
                            "operation failed"
                        );
                    } else {
                        tracing::debug!(
                            trace_id,
                            operation = %label,
                            status = err.status,
                            error = %err,
                            "operation rejected"
                        );
                    }
                    err.into_response_with(ctx.as_ref())
                }
            }
        });
        fut
    })
}

async fn run<S: AppService>(
    invoker: Invoker<S>,
    plan: ResponsePlan,
    location_base: &str,
    req: Request<Incoming>,
    params: PathParams,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>, Error> {
    let ct = cancellation_of(&req);

    let outcome = match invoker {
        Invoker::NoArgs(call) | Invoker::Fallback(call) => {
            let service = resolve::<S>(&state)?;
            call(service, ct).await?
        }
        Invoker::IdOnly(call) => {
            let id = identifier(req.uri(), &params)?;
            let service = resolve::<S>(&state)?;
            call(service, id, ct).await?
        }
        Invoker::BodyOnly(decode) => {
            let body = read_body(req).await?;
            let call = decode(&body)?;
            let service = resolve::<S>(&state)?;
            call(service, ct).await?
        }
        Invoker::IdAndBody(decode) => {
            let id = identifier(req.uri(), &params)?;
            let body = read_body(req).await?;
            let call = decode(id, &body)?;
            let service = resolve::<S>(&state)?;
            call(service, ct).await?
        }
    };

    plan.respond(outcome, |id| format!("{}/{}", location_base, id))
}
