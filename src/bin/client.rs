//! Room-based Chat Relay - Interactive Client
//!
//! Loads `$HOME/.tiny` (or asks for a username), connects, prints every
//! server message and sends typed lines until EOF or Ctrl+C.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::error;

use tinychat::logger::setup_logger;
use tinychat::{ChatClient, ClientConfig, Session};

#[derive(Parser, Debug)]
#[command(name = "tinychat-client")]
#[command(about = "Interactive client for the tinychat relay", long_about = None)]
struct Args {
    /// Server host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short = 'p', long, default_value = "9001")]
    port: u16,

    /// Config file (defaults to $HOME/.tiny)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn prompt(text: &str) {
    print!("{}", text);
    let _ = std::io::stdout().flush();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logger("tinychat=warn");

    let args = Args::parse();
    let path = args
        .config
        .or_else(ClientConfig::default_path)
        .ok_or("cannot determine home directory for the config file")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut config = match ClientConfig::load(&path)? {
        Some(config) => {
            println!(
                "Config file detected and loaded successfully. Welcome back, {}",
                config.username
            );
            config
        }
        None => {
            println!("No config file detected... Please setup your name.");
            loop {
                prompt("Please enter alphabetical username: ");
                let Some(name) = lines.next_line().await? else {
                    return Ok(());
                };
                let name = name.trim();
                if ClientConfig::is_valid_username(name) {
                    break ClientConfig::new(name.to_string());
                }
            }
        }
    };

    let addr = format!("{}:{}", args.host, args.port);
    let client = ChatClient::connect(&addr, &config.username).await?;
    let (mut incoming, mut outgoing) = client.into_split();

    // Frames are read in their own task: a half-read frame must never be
    // abandoned by the select below
    let (messages_tx, mut messages) = mpsc::channel::<String>(64);
    tokio::spawn(async move {
        loop {
            match incoming.recv().await {
                Ok(Some(message)) => {
                    if messages_tx.send(message).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    println!("\nconnection closed by the server");
                    break;
                }
                Err(e) => {
                    error!("Reading error: {}", e);
                    break;
                }
            }
        }
    });

    let mut session = Session::new();
    loop {
        prompt(&session.prompt(&config.username));
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if let Some(payload) = session.outgoing(&line) {
                    outgoing.send(&payload).await?;
                }
            }
            message = messages.recv() => {
                let Some(message) = message else { break };
                println!("\n{}", message);
                session.observe(&message, &mut config);
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nYou pressed Ctrl+C! Saving config to {}", path.display());
                break;
            }
        }
    }

    config.save(&path)?;
    Ok(())
}
