//! HTTP server startup

use crate::config::ServerConfig;
use crate::shutdown::shutdown_signal;
use axum::Router;
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

/// Bind to the configured address and serve until Ctrl+C or SIGTERM
pub async fn start_server(config: &ServerConfig, app: Router) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", listener.local_addr()?);

    serve(listener, app, shutdown_signal()).await
}

/// Serve `app` on an already-bound listener until `shutdown` completes.
/// In-flight requests are allowed to finish.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Starting graceful shutdown");
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
