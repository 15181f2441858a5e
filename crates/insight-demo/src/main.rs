mod manual;
mod server;

use clap::{Parser, Subcommand};
use insight::{Client, Config};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "insight-demo")]
#[command(about = "Sample services reporting to an Insight collector", long_about = None)]
struct Cli {
    /// Collector base URL
    #[arg(long, env = "INSIGHT_ENDPOINT", default_value = "http://localhost:8080")]
    endpoint: String,

    /// Collector API key
    #[arg(long, env = "INSIGHT_API_KEY", default_value = "your-api-key")]
    api_key: String,

    /// Request timeout in milliseconds
    #[arg(long, env = "INSIGHT_TIMEOUT_MS", default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an HTTP service with automatic request instrumentation
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8081")]
        port: u16,

        /// Service name reported to the collector
        #[arg(long, env = "INSIGHT_SERVICE_NAME", default_value = "axum-example-service")]
        service: String,
    },

    /// Walk through manual traces, spans, instrumented functions and metrics
    Manual {
        /// Service name reported to the collector
        #[arg(long, env = "INSIGHT_SERVICE_NAME", default_value = "manual-instrumentation-example")]
        service: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,insight=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = |service: String| {
        Config::new(cli.endpoint.clone(), cli.api_key.clone(), service)
            .with_timeout(Duration::from_millis(cli.timeout_ms))
    };

    match cli.command {
        Commands::Serve {
            ref host,
            port,
            ref service,
        } => {
            let client = Client::new(config(service.clone()));
            server::run(client, host, port).await
        }
        Commands::Manual { ref service } => {
            let client = Client::new(config(service.clone()));
            manual::run(client).await
        }
    }
}
