use clap::{Parser, Subcommand};
use tracing::info;
use chroma_miner::{
    config::Config,
    dev,
    server,
    shell::{Application, SystemBrowser},
    utils::init_logger,
};

#[derive(Parser)]
#[command(name = "chroma-miner", version, about = "Browse and search ChromaDB collections")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the UI; APP_ENV=development attaches to a separately started server
    App {
        /// Port of a running development server (skips the port file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run only the HTTP server and publish its port in the port file
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Start the server as a child process and open the UI against it
    Dev,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    let _log_guard = init_logger(config.log_dir.as_deref());
    info!(mode = ?config.mode, "Configuration loaded: {:?}", config.server);

    match cli.command.unwrap_or(Command::App { port: None }) {
        Command::App { port } => {
            let mut app = Application::new(config, SystemBrowser::new());
            if let Some(port) = port {
                app = app.with_dev_port(port);
            }
            app.run().await
        }
        Command::Serve { port } => server::run_standalone(config, port).await,
        Command::Dev => dev::run_supervised(config).await,
    }
}
