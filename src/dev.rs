//! Development supervisor
//!
//! Launches `serve --port <n>` as a child process, waits until it answers
//! `/api/health`, then opens the UI against it. The port is handed to the
//! child on its command line; the port file the child writes is only for
//! tooling that starts the two halves independently.

use anyhow::{anyhow, Context, Result};
use futures::FutureExt;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{info, warn};
use crate::config::{Config, Mode};
use crate::server::{self, PortFile};
use crate::shell::{Application, SystemBrowser};
use crate::utils::with_retry;

const READY_ATTEMPTS: u32 = 12;
const READY_BASE_DELAY: Duration = Duration::from_millis(100);

pub async fn run_supervised(config: Config) -> Result<()> {
    let host = server::host_addr(&config)?;
    let port = server::find_available_port_on(host, config.server.start_port, config.server.port_scan_limit).await?;
    info!("Starting development server on port {}", port);

    let mut child = spawn_server(port)?;
    let port_file = PortFile::new(config.server.port_file.clone());

    let result = match wait_until_ready(port).await {
        Ok(()) => {
            let config = Config {
                mode: Mode::Development,
                ..config
            };
            Application::new(config, SystemBrowser::new())
                .with_dev_port(port)
                .run()
                .await
        }
        Err(e) => Err(e),
    };

    stop_child(&mut child).await;
    if let Err(e) = port_file.remove().await {
        warn!(error = %e, "Failed to remove port file");
    }
    result
}

fn spawn_server(port: u16) -> Result<Child> {
    let exe = std::env::current_exe().context("cannot locate own executable")?;
    Command::new(exe)
        .arg("serve")
        .arg("--port")
        .arg(port.to_string())
        .env("APP_ENV", "development")
        .kill_on_drop(true)
        .spawn()
        .context("failed to spawn development server")
}

async fn wait_until_ready(port: u16) -> Result<()> {
    let url = format!("http://127.0.0.1:{}/api/health", port);
    let client = reqwest::Client::new();

    with_retry(
        move || {
            let client = client.clone();
            let url = url.clone();
            async move {
                let response = client.get(&url).send().await?;
                response.error_for_status().map(|_| ())
            }
            .boxed()
        },
        READY_ATTEMPTS,
        READY_BASE_DELAY,
    )
    .await
    .map_err(|e| anyhow!("development server did not become ready: {}", e))
}

async fn stop_child(child: &mut Child) {
    match child.try_wait() {
        Ok(Some(status)) => info!(?status, "Development server already exited"),
        _ => {
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to stop development server");
            } else {
                info!("Development server stopped");
            }
        }
    }
}
