//! CLI for a running router

use clap::{Parser, Subcommand};
use shardcache::client::HttpClient;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "shardcache")]
#[command(about = "shardcache distributed cache CLI")]
#[command(version)]
struct Cli {
    /// Router URL
    #[arg(long, global = true, default_value = "http://localhost:8080")]
    server: String,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value = "10")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a key
    Get {
        /// Key
        key: String,
    },

    /// Write a key
    Set {
        /// Key
        key: String,

        /// Value
        value: String,
    },

    /// Delete a key
    Delete {
        /// Key
        key: String,
    },

    /// Show cluster health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let client = HttpClient::new(cli.server, Duration::from_secs(cli.timeout))?;

    match cli.command {
        Commands::Get { key } => {
            let value = client.get(&key).await?;
            println!("{}", value);
        }

        Commands::Set { key, value } => {
            client.set(&key, &value).await?;
            println!("OK");
        }

        Commands::Delete { key } => {
            client.delete(&key).await?;
            println!("OK");
        }

        Commands::Health => {
            let health = client.health().await?;
            println!("Cluster health: {}", health.status);
            if let (Some(healthy), Some(total)) = (health.healthy, health.total) {
                println!("  Healthy nodes: {}/{}", healthy, total);
            }
            println!("  Nodes: {}", health.nodes.join(", "));
            if health.status == "unhealthy" {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
