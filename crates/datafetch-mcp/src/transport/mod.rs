//! Transport layer abstraction
//!
//! Supports stdio (default) and HTTP transports

#[cfg(feature = "http")]
mod auth;
#[cfg(feature = "http")]
mod http;

use std::future::Future;
use std::sync::Arc;

use rmcp::ServiceExt;
use rmcp::transport::io::stdio;

#[cfg(feature = "http")]
pub use self::http::{ApiError, HttpConfig, routes, with_layers};
use crate::config::{Config, TransportMode};
use crate::server::ServerHandler;
use crate::service::DataService;
use crate::{Error, Result};

/// Run the server with the configured transport
pub async fn run_transport(
    service: Arc<DataService>,
    config: &Config,
    #[allow(unused_variables)] shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    match config.transport.mode {
        TransportMode::Stdio => run_stdio(ServerHandler::new(service)).await,
        #[cfg(feature = "http")]
        TransportMode::Http => http::run_http(service, &config.transport, shutdown).await,
        #[cfg(not(feature = "http"))]
        TransportMode::Http => Err(Error::Transport(
            "HTTP transport requires the 'http' feature".into(),
        )),
    }
}

async fn run_stdio(handler: ServerHandler) -> Result<()> {
    let transport = stdio();
    let server = handler
        .serve(transport)
        .await
        .map_err(|e| Error::Transport(format!("Failed to start stdio transport: {e}")))?;

    server
        .waiting()
        .await
        .map_err(|e| Error::Transport(format!("Stdio transport error: {e}")))?;

    Ok(())
}
