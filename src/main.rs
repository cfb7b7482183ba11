//! termwire - serve the demo menu over raw TCP
//!
//! # Quick Start
//!
//! ```text
//! termwire                        # listen on 127.0.0.1:2323
//! termwire --listen 0.0.0.0:4000  # other address
//! termwire --border double        # other border style
//!
//! stty raw -echo; nc 127.0.0.1 2323; stty sane
//! ```
//!
//! Settings come from `~/.termwire/config.toml`; flags override them.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use termwire::config::{Config, LogConfig};
use termwire::demo::MenuApp;
use termwire::{factory, Server};

#[derive(Parser, Debug)]
#[command(name = "termwire", version, about = "Terminal I/O protocol layer demo server")]
struct Args {
    /// Address to listen on
    #[arg(short, long)]
    listen: Option<String>,

    /// Configuration file (default: ~/.termwire/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `termwire=trace`
    #[arg(long)]
    log_level: Option<String>,

    /// Border style: rounded, sharp, double, heavy, ascii
    #[arg(short, long)]
    border: Option<String>,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    if let Some(listen) = &args.listen {
        config.listen = listen.clone();
    }
    if let Some(level) = &args.log_level {
        config.log.level = level.clone();
    }
    if let Some(border) = &args.border {
        config.frame.border_style = border.clone();
    }
    Ok(config)
}

fn init_logging(log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))
        .with_context(|| format!("Invalid log level '{}'", log.level))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &log.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            // Open log file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_writer(Mutex::new(file)).with_ansi(false).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(&config.log)?;

    info!("termwire {} starting", env!("CARGO_PKG_VERSION"));

    let spec = config.border_spec();
    let server = Server::new(
        config.server_config(),
        factory(move |_| MenuApp::new(spec.clone())),
    );
    let listener = Server::bind_tcp(config.listen.as_str()).await?;

    tokio::select! {
        result = server.serve_tcp(listener) => {
            if let Err(e) = &result {
                error!("Server stopped: {}", e);
            }
            result?;
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for ctrl-c")?;
            info!("Shutting down with {} live sessions", server.registry().len());
        }
    }

    Ok(())
}
