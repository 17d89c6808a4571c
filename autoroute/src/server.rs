//! HTTP/1 serve loop.

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;

use crate::app::Dispatcher;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Serves `dispatcher` on `addr` until Ctrl-C.
pub async fn serve(addr: &str, dispatcher: Dispatcher) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, dispatcher, shutdown_signal()).await
}

/// Serves on an already-bound listener until `shutdown` resolves, then
/// waits for open connections to finish.
pub async fn serve_listener(
    listener: TcpListener,
    dispatcher: Dispatcher,
    shutdown: impl Future<Output = ()>,
) -> std::io::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "listening");

    let graceful = GracefulShutdown::new();
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                };

                let dispatcher = dispatcher.clone();
                let service = service_fn(move |req| {
                    let dispatcher = dispatcher.clone();
                    async move { Ok::<_, Infallible>(dispatcher.handle(req).await) }
                });

                let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                let conn = graceful.watch(conn);
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        tracing::debug!(peer = %peer, error = %e, "connection closed with error");
                    }
                });
            }
            _ = &mut shutdown => {
                tracing::info!("shutdown requested");
                break;
            }
        }
    }

    drop(listener);
    tokio::select! {
        _ = graceful.shutdown() => tracing::info!("all connections closed"),
        _ = tokio::time::sleep(DRAIN_TIMEOUT) => {
            tracing::warn!(timeout_secs = DRAIN_TIMEOUT.as_secs(), "gave up waiting for connections");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
