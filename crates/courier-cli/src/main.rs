use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use courier_core::config::{ServerConfig, validate_path};
use courier_core::impls::{WebSocketServer, default_app};
use courier_core::observability::init_tracing;

/// Correlated request/response server over WebSocket.
///
/// Flags override `COURIER_*` environment variables (a `.env` file is read first).
#[derive(Debug, Parser)]
#[command(name = "courier", version)]
struct Cli {
    /// Address to listen on
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// WebSocket upgrade path
    #[arg(long)]
    path: Option<String>,

    /// Concurrent handling units per connection (0 = unbounded)
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Per-handler timeout in milliseconds (0 = none)
    #[arg(long)]
    handler_timeout_ms: Option<u64>,

    /// Outbound HTTP request timeout in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    http_timeout_ms: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long)]
    log: Option<String>,
}

impl Cli {
    fn apply(self, mut config: ServerConfig) -> Result<ServerConfig, Box<dyn Error>> {
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(path) = self.path {
            config.ws_path = validate_path("--path", path)?;
        }
        if let Some(limit) = self.max_in_flight {
            config.max_in_flight = (limit > 0).then_some(limit);
        }
        if let Some(ms) = self.handler_timeout_ms {
            config.handler_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(ms) = self.http_timeout_ms {
            config.http_timeout = Duration::from_millis(ms);
        }
        if let Some(log) = self.log {
            config.log_filter = log;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // .env は任意
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = cli.apply(ServerConfig::from_env()?)?;
    init_tracing(&config.log_filter)?;

    let app = Arc::new(default_app(&config)?);
    let server = WebSocketServer::bind(config.listen_addr, config.ws_path.clone()).await?;
    info!(
        addr = %server.local_addr()?,
        path = %config.ws_path,
        max_in_flight = ?config.max_in_flight,
        handler_timeout = ?config.handler_timeout,
        "courier listening"
    );

    tokio::select! {
        _ = server.serve(app) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("shutting down");
        }
    }
    Ok(())
}
