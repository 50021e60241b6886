use anyhow::{bail, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};
use super::Window;
use crate::config::{Config, Mode};
use crate::routes::{create_router, static_files};
use crate::server::{self, local_url, PortFile, RunningServer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    NotStarted,
    /// Development: port taken from the supervisor or the port file.
    PortFileRead(u16),
    /// Production: port chosen, listener not yet bound.
    PortAllocated(u16),
    Listening(u16),
    /// Production without a live server: UI loaded from disk.
    StaticFallback(PathBuf),
    Closed,
}

/// Owns the window and, in production, the embedded server.
pub struct Application<W: Window> {
    config: Config,
    window: W,
    dev_port: Option<u16>,
    server: Option<RunningServer>,
    state: Lifecycle,
}

impl<W: Window> Application<W> {
    pub fn new(config: Config, window: W) -> Self {
        Self {
            config,
            window,
            dev_port: None,
            server: None,
            state: Lifecycle::NotStarted,
        }
    }

    /// Port of an already running development server, supplied by whoever
    /// launched it. Skips the port file.
    pub fn with_dev_port(mut self, port: u16) -> Self {
        self.dev_port = Some(port);
        self
    }

    pub fn state(&self) -> &Lifecycle {
        &self.state
    }

    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(RunningServer::addr)
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.state != Lifecycle::NotStarted {
            bail!("application already started ({:?})", self.state);
        }

        match self.config.mode {
            Mode::Development => self.start_development().await,
            Mode::Production => self.start_production().await,
        }
    }

    async fn start_development(&mut self) -> Result<()> {
        let port = match self.dev_port {
            Some(port) => port,
            None => PortFile::new(self.config.server.port_file.clone())
                .read_or_default()
                .await,
        };
        self.state = Lifecycle::PortFileRead(port);
        info!("> Development server running on port {}", port);

        self.window.load_url(&local_url(port)).await?;
        self.state = Lifecycle::Listening(port);
        Ok(())
    }

    async fn start_production(&mut self) -> Result<()> {
        match self.start_embedded_server().await {
            Ok(server) => {
                let url = server.url();
                let port = server.addr().port();
                self.server = Some(server);
                self.state = Lifecycle::Listening(port);
                info!("> Ready on {}", url);
                self.window.load_url(&url).await
            }
            Err(e) => {
                error!(error = %e, "Error starting embedded server, loading static UI from disk");
                let static_dir = static_files::resolve_static_dir(&self.config.server.static_dir);
                let index = static_files::index_path(&static_dir);
                self.state = Lifecycle::StaticFallback(index.clone());
                self.window.load_file(&index).await
            }
        }
    }

    async fn start_embedded_server(&mut self) -> Result<RunningServer> {
        let host = server::host_addr(&self.config)?;
        let port = server::find_available_port_on(
            host,
            self.config.server.start_port,
            self.config.server.port_scan_limit,
        )
        .await?;
        self.state = Lifecycle::PortAllocated(port);

        let listener = server::bind_listener(&self.config, Some(port)).await?;
        let state = crate::build_state(self.config.clone())?;
        RunningServer::start(listener, create_router(state))
    }

    /// Start, wait for the window to close, stop.
    pub async fn run(&mut self) -> Result<()> {
        if let Err(e) = self.start().await {
            self.stop().await?;
            return Err(e);
        }
        self.window.closed().await;
        info!("Window closed");
        self.stop().await
    }

    /// Close the listener if one is owned. Safe to call more than once.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state == Lifecycle::Closed {
            return Ok(());
        }
        self.state = Lifecycle::Closed;

        match self.server.take() {
            Some(server) => server.stop().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    enum Loaded {
        Url(String),
        File(PathBuf),
    }

    #[derive(Default)]
    struct RecordingWindow {
        loaded: Vec<Loaded>,
    }

    impl RecordingWindow {
        fn loaded(&self) -> Vec<Loaded> {
            self.loaded.clone()
        }
    }

    #[async_trait]
    impl Window for RecordingWindow {
        async fn load_url(&mut self, url: &str) -> Result<()> {
            self.loaded.push(Loaded::Url(url.to_string()));
            Ok(())
        }

        async fn load_file(&mut self, path: &Path) -> Result<()> {
            self.loaded.push(Loaded::File(path.to_path_buf()));
            Ok(())
        }

        async fn closed(&mut self) {}
    }

    fn config(mode: Mode, dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.mode = mode;
        config.server.port_file = dir.path().join(".port");
        config.server.static_dir = dir.path().join("static");
        config
    }

    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_production_serves_then_closes() {
        let dir = TempDir::new().unwrap();
        let mut config = config(Mode::Production, &dir);
        config.server.start_port = free_port();

        let mut app = Application::new(config, RecordingWindow::default());
        app.start().await.unwrap();

        let port = match app.state() {
            Lifecycle::Listening(port) => *port,
            other => panic!("unexpected state {:?}", other),
        };
        assert_eq!(app.window().loaded(), vec![Loaded::Url(format!("http://localhost:{}/", port))]);

        let status = reqwest::get(format!("http://127.0.0.1:{}/api/health", port))
            .await
            .unwrap()
            .status();
        assert!(status.is_success());

        let addr = app.server_addr().unwrap();
        app.stop().await.unwrap();
        assert_eq!(app.state(), &Lifecycle::Closed);
        assert!(app.server_addr().is_none());
        assert!(std::net::TcpListener::bind(addr).is_ok());

        app.stop().await.unwrap();
        assert!(app.start().await.is_err());
    }

    #[tokio::test]
    async fn test_production_falls_back_to_static_files() {
        let dir = TempDir::new().unwrap();
        let mut config = config(Mode::Production, &dir);
        config.server.port_scan_limit = 0;

        let mut app = Application::new(config, RecordingWindow::default());
        app.start().await.unwrap();

        let index = dir.path().join("static").join("index.html");
        assert_eq!(app.state(), &Lifecycle::StaticFallback(index.clone()));
        assert_eq!(app.window().loaded(), vec![Loaded::File(index)]);
        assert!(app.server_addr().is_none());

        app.stop().await.unwrap();
        assert_eq!(app.state(), &Lifecycle::Closed);
    }

    #[tokio::test]
    async fn test_development_reads_port_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".port"), "4321").unwrap();

        let mut app = Application::new(config(Mode::Development, &dir), RecordingWindow::default());
        app.start().await.unwrap();

        assert_eq!(app.state(), &Lifecycle::Listening(4321));
        assert_eq!(app.window().loaded(), vec![Loaded::Url("http://localhost:4321/".to_string())]);
        assert!(app.server_addr().is_none());
    }

    #[tokio::test]
    async fn test_development_defaults_without_port_file() {
        let dir = TempDir::new().unwrap();
        let mut app = Application::new(config(Mode::Development, &dir), RecordingWindow::default());
        app.start().await.unwrap();
        assert_eq!(app.state(), &Lifecycle::Listening(3000));
    }

    #[tokio::test]
    async fn test_explicit_dev_port_wins_over_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".port"), "4321").unwrap();

        let mut app = Application::new(config(Mode::Development, &dir), RecordingWindow::default())
            .with_dev_port(5555);
        app.run().await.unwrap();

        assert_eq!(app.window().loaded(), vec![Loaded::Url("http://localhost:5555/".to_string())]);
        assert_eq!(app.state(), &Lifecycle::Closed);
    }
}
