//! Embedded HTTP server
//!
//! - [`ports`] picks a free local port
//! - [`port_file`] publishes the chosen port to a separately launched shell
//! - [`RunningServer`] owns the listening socket until [`RunningServer::stop`]

pub mod port_file;
pub mod ports;

pub use port_file::PortFile;
pub use ports::{find_available_port, find_available_port_on, PortError};

use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use crate::config::Config;
use crate::routes::create_router;

/// A server task bound to one listener. Dropping the handle without calling
/// [`stop`](RunningServer::stop) leaves the task running until the runtime exits.
pub struct RunningServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    pub fn start(listener: TcpListener, app: Router) -> Result<Self> {
        let addr = listener.local_addr()?;
        let (shutdown, signal) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
                .await
        });

        info!("Server listening on {}", addr);
        Ok(Self {
            addr,
            shutdown: Some(shutdown),
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        local_url(self.addr.port())
    }

    /// Close the listener and wait for in-flight requests to finish.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.task
            .await
            .context("server task panicked")?
            .context("server error")?;
        info!("Server on {} closed", self.addr);
        Ok(())
    }
}

pub fn local_url(port: u16) -> String {
    format!("http://localhost:{}/", port)
}

pub fn host_addr(config: &Config) -> Result<IpAddr> {
    config
        .server
        .host
        .parse()
        .with_context(|| format!("invalid HOST '{}'", config.server.host))
}

/// Allocate (unless `port` is given) and bind the server listener.
pub async fn bind_listener(config: &Config, port: Option<u16>) -> Result<TcpListener> {
    let host = host_addr(config)?;
    let port = match port {
        Some(port) => port,
        None => find_available_port_on(host, config.server.start_port, config.server.port_scan_limit).await?,
    };
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {}:{}", host, port))
}

/// Run the server as its own process: bind, publish the port file, serve
/// until interrupted, then remove the port file.
pub async fn run_standalone(config: Config, port: Option<u16>) -> Result<()> {
    run_standalone_until(config, port, shutdown_signal()).await
}

/// [`run_standalone`] with the shutdown trigger supplied by the caller.
pub async fn run_standalone_until<F>(config: Config, port: Option<u16>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let port_file = PortFile::new(config.server.port_file.clone());
    let listener = bind_listener(&config, port).await?;
    let port = listener.local_addr()?.port();
    let state = crate::build_state(config)?;

    port_file
        .write(port)
        .await
        .with_context(|| format!("failed to write port file {}", port_file.path().display()))?;

    let result = match RunningServer::start(listener, create_router(state)) {
        Ok(server) => {
            info!("> Ready on {}", server.url());
            shutdown.await;
            info!("Shutdown requested");
            server.stop().await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = port_file.remove().await {
        warn!(error = %e, "Failed to remove port file");
    }
    result
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
