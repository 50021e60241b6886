//! Port rendezvous file
//!
//! A server launched on its own writes its port here as a single decimal
//! line; a shell launched separately reads it back. Removed on normal
//! shutdown.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use crate::config::DEFAULT_START_PORT;

pub struct PortFile {
    path: PathBuf,
}

impl PortFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, port: u16) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, port.to_string()).await?;
        debug!(path = %self.path.display(), port, "Wrote port file");
        Ok(())
    }

    /// The stored port, or `None` if the file is missing or unparsable.
    pub async fn read(&self) -> Option<u16> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => match content.trim().parse() {
                Ok(port) => Some(port),
                Err(_) => {
                    warn!(path = %self.path.display(), "Port file does not hold a port number");
                    None
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not read port file");
                None
            }
        }
    }

    pub async fn read_or_default(&self) -> u16 {
        self.read().await.unwrap_or(DEFAULT_START_PORT)
    }

    /// Delete the file; a file that is already gone is not an error.
    pub async fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
