//! Router binary

use clap::{Parser, Subcommand, ValueEnum};
use shardcache::common::{BackendKind, Config, NodeConfig};
use shardcache::CacheServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shardcache-server")]
#[command(about = "shardcache consistent-hashing cache router")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Memory,
    Redis,
}

impl From<Backend> for BackendKind {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Memory => BackendKind::Memory,
            Backend::Redis => BackendKind::Redis,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the router
    Serve {
        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bind address for HTTP
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Backend kind
        #[arg(long, value_enum)]
        backend: Option<Backend>,

        /// Node as name=url[,url...] (repeatable, replaces configured nodes)
        #[arg(long = "node")]
        nodes: Vec<String>,

        /// Ring positions per node
        #[arg(long)]
        virtual_nodes: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            bind,
            backend,
            nodes,
            virtual_nodes,
        } => {
            // File and environment first, CLI flags on top
            let mut config = Config::load(config.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
            }
            if let Some(backend) = backend {
                config.backend = backend.into();
            }
            if !nodes.is_empty() {
                config.nodes = nodes
                    .iter()
                    .map(|spec| NodeConfig::parse(spec))
                    .collect::<Result<_, _>>()?;
            }
            if let Some(virtual_nodes) = virtual_nodes {
                config.ring.virtual_nodes = virtual_nodes;
            }

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| config.log_level.clone().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            config.validate()?;
            CacheServer::new(config).serve().await?;
        }
    }

    Ok(())
}
