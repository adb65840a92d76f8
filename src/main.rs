//! Room-based Chat Relay - Server Entry Point
//!
//! Binds the listener and runs the event loop until Ctrl+C.

use clap::Parser;
use tracing::{error, info};

use tinychat::logger::setup_logger;
use tinychat::server::{DEFAULT_MAX_FRAME_BYTES, ServerConfig};
use tinychat::ChatServer;

#[derive(Parser, Debug)]
#[command(name = "tinychat-server")]
#[command(about = "Room-based TCP chat relay", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "9001")]
    port: u16,

    /// Largest accepted inbound payload in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_BYTES)]
    max_frame_bytes: u64,
}

// All room state lives on one thread
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logger("tinychat=info,tinychat_server=info");

    let args = Args::parse();
    let config = ServerConfig {
        addr: format!("{}:{}", args.host, args.port),
        max_frame_bytes: args.max_frame_bytes,
    };

    let server = match ChatServer::bind(config.clone()).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind {}: {}", config.addr, e);
            return Err(e.into());
        }
    };

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Ctrl+C received");
        })
        .await;

    Ok(())
}
