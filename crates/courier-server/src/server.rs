//! HTTP/1.1 transport.
//!
//! A Tokio TCP accept loop hands each connection to hyper; each request is
//! passed to the [`Gateway`]. Shutdown stops accepting, asks open
//! connections to finish their in-flight request, and waits for them up to
//! the configured timeout.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

use courier_config::CourierConfig;
use courier_router::CommandRouter;

use crate::error::ServerError;
use crate::gateway::Gateway;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// The Courier HTTP server.
///
/// # Example
///
/// ```rust,ignore
/// use courier_config::CourierConfig;
/// use courier_router::{agents::InMemoryAgents, CommandRouter};
/// use courier_server::Server;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), courier_server::ServerError> {
///     let router = CommandRouter::standard(Arc::new(InMemoryAgents::new()))?;
///     Server::from_config(&CourierConfig::default(), Arc::new(router))?
///         .run()
///         .await
/// }
/// ```
#[derive(Debug)]
pub struct Server {
    gateway: Arc<Gateway>,
    addr: SocketAddr,
    shutdown_timeout: Duration,
}

impl Server {
    /// Creates a server around a gateway.
    #[must_use]
    pub fn new(gateway: Gateway, addr: SocketAddr, shutdown_timeout: Duration) -> Self {
        Self {
            gateway: Arc::new(gateway),
            addr,
            shutdown_timeout,
        }
    }

    /// Creates a server with everything described by `config`.
    pub fn from_config(config: &CourierConfig, router: Arc<CommandRouter>) -> Result<Self, ServerError> {
        let gateway = Gateway::from_config(config, router)?;
        Ok(Self::new(
            gateway,
            config.socket_addr()?,
            Duration::from_secs(config.server.shutdown_timeout_secs),
        ))
    }

    /// Returns the configured bind address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the gateway.
    #[must_use]
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Binds and serves until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{}: {e}", self.addr)))?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` fires.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "server listening");

        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, remote_addr)) => {
                        let gateway = Arc::clone(&self.gateway);
                        let guard = tracker.open();
                        let shutdown = shutdown.clone();

                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(gateway, stream, remote_addr, shutdown).await {
                                tracing::debug!(remote = %remote_addr, error = %e, "connection error");
                            }
                            drop(guard);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },
                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        tracing::info!(
            open = tracker.open_connections(),
            timeout_secs = self.shutdown_timeout.as_secs(),
            "draining connections"
        );

        tokio::select! {
            () = tracker.drained() => tracing::info!("all connections closed"),
            () = tokio::time::sleep(self.shutdown_timeout) => tracing::warn!(
                open = tracker.open_connections(),
                "shutdown timeout reached with connections still open"
            ),
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

async fn serve_connection(
    gateway: Arc<Gateway>,
    stream: TcpStream,
    remote_addr: SocketAddr,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let service = service_fn(move |request: Request<Incoming>| {
        let gateway = Arc::clone(&gateway);
        async move { Ok::<_, Infallible>(gateway.serve(request, Some(remote_addr)).await) }
    });

    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            // Finish the in-flight request, then close.
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    }
}
