//! Request middleware.
//!
//! Middleware wraps the routing step: it sees every request before a route
//! is matched and every response after the handler (or the authorization
//! gate) produced it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use http::{Request, Response};
use hyper::body::Incoming;

use crate::context::RequestContext;
use crate::error::Error;
use crate::response::BoxBody;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The routing step at the end of the chain.
pub(crate) type Endpoint =
    dyn Fn(Request<Incoming>) -> BoxFuture<'static, Response<BoxBody>> + Send + Sync;

pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        req: Request<Incoming>,
        ctx: &'a RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response<BoxBody>>;
}

/// The remainder of the chain after the current middleware.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    ctx: &'a RequestContext,
    endpoint: &'a Endpoint,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        middlewares: &'a [Arc<dyn Middleware>],
        ctx: &'a RequestContext,
        endpoint: &'a Endpoint,
    ) -> Self {
        Self {
            middlewares,
            ctx,
            endpoint,
        }
    }

    pub fn run(self, req: Request<Incoming>) -> BoxFuture<'a, Response<BoxBody>> {
        match self.middlewares.split_first() {
            Some((first, rest)) => first.handle(
                req,
                self.ctx,
                Next {
                    middlewares: rest,
                    ctx: self.ctx,
                    endpoint: self.endpoint,
                },
            ),
            None => (self.endpoint)(req),
        }
    }
}

/// Logs one line per request with method, path, status and latency.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestLogMiddleware;

impl RequestLogMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RequestLogMiddleware {
    fn handle<'a>(
        &'a self,
        req: Request<Incoming>,
        ctx: &'a RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response<BoxBody>> {
        Box::pin(async move {
            let method = req.method().clone();
            let path = req.uri().path().to_string();

            let response = next.run(req).await;

            tracing::info!(
                trace_id = %ctx.trace_id,
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                elapsed_ms = ctx.elapsed().as_millis() as u64,
                "request completed"
            );
            response
        })
    }
}

/// Gives up on requests that run longer than `duration`.
///
/// The request's cancellation token is triggered so the invoked service can
/// observe it, and the caller receives a 504.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutMiddleware {
    duration: Duration,
}

impl TimeoutMiddleware {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Middleware for TimeoutMiddleware {
    fn handle<'a>(
        &'a self,
        req: Request<Incoming>,
        ctx: &'a RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response<BoxBody>> {
        Box::pin(async move {
            match tokio::time::timeout(self.duration, next.run(req)).await {
                Ok(response) => response,
                Err(_) => {
                    ctx.cancellation.cancel();
                    tracing::warn!(
                        trace_id = %ctx.trace_id,
                        timeout_ms = self.duration.as_millis() as u64,
                        "request timed out"
                    );
                    Error::timeout("request timed out").into_response_with(Some(ctx))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_middleware_keeps_duration() {
        let middleware = TimeoutMiddleware::new(Duration::from_millis(250));
        assert_eq!(middleware.duration(), Duration::from_millis(250));
    }
}
