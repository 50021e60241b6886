//! Desktop Shell Integration
//!
//! The shell shows the UI in a [`Window`] and owns the embedded server for
//! as long as that window is open. [`Application`] drives the lifecycle:
//!
//! ```text
//! NotStarted ──dev──▶ PortFileRead ──▶ Listening ──close──▶ Closed
//!     │
//!     ├──prod──▶ PortAllocated ──▶ Listening ──close──▶ Closed
//!     │               │
//!     └───────────────┴──bind/alloc failure──▶ StaticFallback ──close──▶ Closed
//! ```

pub mod app;

pub use app::{Application, Lifecycle};

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;

/// Something that can display the UI and tell us when the user is done.
#[async_trait]
pub trait Window: Send {
    async fn load_url(&mut self, url: &str) -> Result<()>;

    async fn load_file(&mut self, path: &Path) -> Result<()>;

    /// Resolves once the window has been closed.
    async fn closed(&mut self);
}

/// Shows the UI in the user's default browser. The terminal session stands
/// in for the window: Ctrl-C (or SIGTERM) closes it.
#[derive(Debug, Default)]
pub struct SystemBrowser;

impl SystemBrowser {
    pub fn new() -> Self {
        Self
    }

    fn open(target: &OsStr) -> Result<()> {
        open::that_detached(target)
            .with_context(|| format!("failed to open {} in the system browser", target.to_string_lossy()))
    }
}

#[async_trait]
impl Window for SystemBrowser {
    async fn load_url(&mut self, url: &str) -> Result<()> {
        info!("Opening {}", url);
        Self::open(OsStr::new(url))
    }

    async fn load_file(&mut self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "Opening static UI from disk");
        Self::open(path.as_os_str())
    }

    async fn closed(&mut self) {
        crate::server::shutdown_signal().await;
    }
}
