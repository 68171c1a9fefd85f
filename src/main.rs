use anyhow::Result;
use clap::{Parser, Subcommand};
use fraudwatch::config::FraudWatchConfig;
use fraudwatch::server::FraudServer;
use fraudwatch::FraudEngine;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Parser)]
#[command(name = "fraudwatch")]
#[command(about = "Fraud rule-evaluation service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the FraudWatch server
    Run {
        /// Path to the configuration file
        #[arg(short, long, default_value = "fraudwatch.toml")]
        config: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = 8086)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Cli::parse();

    match &args.command {
        Commands::Run { config, port } => {
            println!("Initializing FraudWatch...");

            let config_data = FraudWatchConfig::from_file(config)?;
            let rate_limit = config_data.engine.analyze_rate_limit;

            let engine = FraudEngine::from_config(config_data).await?;

            let server = FraudServer::new(
                Arc::new(RwLock::new(engine)),
                config.to_string(),
                rate_limit,
            );
            server.run(*port).await?;
        }
    }

    Ok(())
}
