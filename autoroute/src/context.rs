//! Per-request context.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// Created once per inbound request and stored in the request extensions.
///
/// The cancellation token is handed to the invoked service method. It fires
/// when the client goes away (the request future is dropped) or when a
/// timeout middleware gives up on the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub start: Instant,
    pub cancellation: CancellationToken,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            start: Instant::now(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the cancellation token for this request, or a fresh one when the
/// request did not go through the dispatcher (e.g. a hand-built request).
pub(crate) fn cancellation_of<B>(req: &http::Request<B>) -> CancellationToken {
    req.extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.cancellation.clone())
        .unwrap_or_default()
}
