mod client;
mod config;
mod server;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::server::Server;

/// debuglog - stream filtered, live-tailed log lines to remote subscribers
#[derive(Parser, Debug)]
#[command(name = "debuglog")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the log file to subscribers
    Serve {
        /// Address to listen on (overrides server.listen)
        #[arg(long)]
        listen: Option<String>,

        /// Directory holding the log file (overrides server.log_dir)
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Stop each stream at end of file instead of waiting for new lines
        #[arg(long)]
        no_follow: bool,
    },

    /// Print a filtered stream from a running server or a local log file
    Tail {
        /// Request query, e.g. "backlog=20&level=WARNING&includeEntity=unit-mysql-*"
        #[arg(value_name = "QUERY", default_value = "")]
        query: String,

        /// Server address (defaults to server.listen)
        #[arg(long, conflicts_with = "file")]
        addr: Option<String>,

        /// Read this log file directly instead of subscribing to a server
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// With --file, stop at end of file instead of waiting for new lines
        #[arg(long, requires = "file")]
        no_follow: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => Config::default(),
    };

    init_tracing(&config);

    match args.command {
        Command::Serve {
            listen,
            log_dir,
            no_follow,
        } => {
            if let Some(listen) = listen {
                config.server.listen = listen;
            }
            if let Some(log_dir) = log_dir {
                config.server.log_dir = log_dir;
            }
            if no_follow {
                config.tail.follow = false;
            }
            Server::new(&config).run().await?;
        }
        Command::Tail {
            query,
            addr,
            file,
            no_follow,
        } => {
            let mut stdout = tokio::io::stdout();
            match file {
                Some(path) => {
                    if no_follow {
                        config.tail.follow = false;
                    }
                    client::tail_file(&path, &query, config.tailer_config(), &mut stdout).await?;
                }
                None => {
                    let addr = addr.unwrap_or_else(|| config.server.listen.clone());
                    client::tail(&addr, &query, &mut stdout).await?;
                }
            }
        }
    }

    Ok(())
}

/// Diagnostics go to stderr; `RUST_LOG` takes precedence over `log.level`
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
