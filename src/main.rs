//! georelay: geolocation chat relay
//!
//! `georelay serve` runs the HTTP relay; `georelay chat` is a line-oriented
//! chat client that talks to the configured provider directly.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use georelay::config::{RelayConfig, ServerConfig, load_env_file};
use georelay::{ChatSession, Client, ImageRef, RelayResult, SessionError, server};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve POST /api/analyze
    Serve {
        #[command(flatten)]
        server: ServerConfig,

        #[command(flatten)]
        relay: RelayConfig,
    },
    /// Interactive chat in the terminal
    Chat {
        #[command(flatten)]
        relay: RelayConfig,
    },
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env_file();
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Command::Serve { server, relay } => {
            let provider = relay.build_provider(Arc::new(Client::new()));
            server::serve(&server.host, server.port, provider).await
        }
        Command::Chat { relay } => {
            let provider = relay.build_provider(Arc::new(Client::new()));
            chat(ChatSession::new(Arc::new(provider))).await
        }
    }
}

fn load_image(path: &str) -> anyhow::Result<ImageRef> {
    let path = Path::new(path);
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    image_from_bytes(path, &bytes)
}

/// Encode file contents as a data URI, refusing anything a provider could not
/// be sent.
fn image_from_bytes(path: &Path, bytes: &[u8]) -> anyhow::Result<ImageRef> {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        anyhow::bail!("{} is not an image ({})", path.display(), mime);
    }
    let image = ImageRef::from_base64(mime.essence_str(), &STANDARD.encode(bytes));
    if let Err(e) = image.decode() {
        anyhow::bail!("{} has an unsupported image type {} ({})", path.display(), mime, e);
    }
    Ok(image)
}

fn print_help() {
    println!("Commands:");
    println!("  /image <path>  attach an image to the next message");
    println!("  /drop <n>      remove attached image n (starting at 1)");
    println!("  /clear         start a new conversation");
    println!("  /help          show this help");
    println!("  /quit          exit");
    println!("Anything else is sent as a message. Ctrl+D exits.");
}

async fn chat(session: ChatSession) -> anyhow::Result<()> {
    println!(
        "georelay chat ({} / {}). Type /help for commands.",
        session.provider().kind(),
        session.provider().model_name()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, arg) = match line.split_once(' ') {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match command {
            "/quit" | "/exit" => break,
            "/help" => print_help(),
            "/clear" => {
                session.clear();
                println!("Conversation cleared.");
            }
            "/image" => match load_image(arg) {
                Ok(image) => {
                    session.attach_image(image);
                    println!("Attached ({} pending).", session.drafts().len());
                }
                Err(e) => println!("Error: {:#}", e),
            },
            "/drop" => match arg.parse::<usize>() {
                Ok(n) if n > 0 => match session.remove_image(n - 1) {
                    Ok(_) => println!("Removed ({} pending).", session.drafts().len()),
                    Err(e) => println!("Error: {}", e),
                },
                _ => println!("Usage: /drop <n>"),
            },
            _ => match session.submit(line).await {
                Ok(RelayResult::Ok { text }) => println!("\n{}\n", text),
                Ok(RelayResult::Error { error }) => println!("\nError: {}\n", error),
                Err(SessionError::NothingToSend) => {}
                Err(e) => println!("{}", e),
            },
        }
    }

    Ok(())
}
