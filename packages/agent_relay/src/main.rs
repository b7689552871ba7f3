use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::prelude::*;

use agent_relay::registry::{RegisterRequest, TargetKind};
use agent_relay::{cli, config, server};

#[derive(Parser)]
#[command(name = "agent-relay")]
#[command(about = "Message relay for tmux-hosted agent instances")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Custom data directory (defaults to ~/.agent-relay)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay server in the foreground
    Serve(ServeArgs),

    /// Register an instance with a running relay
    Register(RegisterArgs),

    /// Send a message through a running relay
    Send(SendArgs),

    /// Show registered instances and recent messages
    Status(StatusArgs),
}

#[derive(Parser, Default)]
struct ServeArgs {
    /// Port to bind (overrides config and env)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind (overrides config and env)
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Parser)]
struct RegisterArgs {
    /// Instance id (unique key)
    id: String,

    /// Logical role, e.g. "main"
    role: String,

    /// Display name (defaults to the id)
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    tmux_session: Option<String>,

    #[arg(long)]
    tmux_window: Option<String>,

    #[arg(long)]
    tmux_pane: Option<String>,

    /// Delivery strategy for this instance's terminal
    #[arg(long, value_enum, default_value_t = TargetKind::Generic)]
    window_type: TargetKind,

    /// Relay base URL (defaults to the configured bind address)
    #[arg(long)]
    url: Option<String>,
}

#[derive(Parser)]
struct SendArgs {
    /// Message text
    content: String,

    /// Sender id
    #[arg(long, default_value = "human")]
    from: String,

    /// Recipient id, "main", "all", or "human"
    #[arg(long, default_value = "main")]
    to: String,

    /// Mark as a completion notice instead of a plain message
    #[arg(long)]
    completion: bool,

    /// Relay base URL (defaults to the configured bind address)
    #[arg(long)]
    url: Option<String>,
}

#[derive(Parser)]
struct StatusArgs {
    /// Relay base URL (defaults to the configured bind address)
    #[arg(long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(config::default_data_dir);

    match cli.command {
        // Bare `agent-relay` runs the server with configured defaults.
        None => serve(ServeArgs::default(), &data_dir).await,
        Some(Commands::Serve(args)) => serve(args, &data_dir).await,
        Some(Commands::Register(args)) => {
            let base = base_url(&data_dir, args.url.as_deref())?;
            cli::register_command(
                &base,
                &RegisterRequest {
                    id: args.id,
                    name: args.name,
                    role: args.role,
                    tmux_session: args.tmux_session,
                    tmux_window: args.tmux_window,
                    tmux_pane: args.tmux_pane,
                    window_type: args.window_type,
                },
            )
            .await
        }
        Some(Commands::Send(args)) => {
            let base = base_url(&data_dir, args.url.as_deref())?;
            cli::send_command(&base, &args.from, &args.to, &args.content, args.completion).await
        }
        Some(Commands::Status(args)) => {
            let base = base_url(&data_dir, args.url.as_deref())?;
            cli::status_command(&base).await
        }
    }
}

async fn serve(args: ServeArgs, data_dir: &std::path::Path) -> Result<()> {
    let default_directive = if args.debug {
        "agent_relay=debug,tower_http=debug,info"
    } else {
        "agent_relay=info,tower_http=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    info!("Starting Agent Relay - Instance Registry and Message Router");

    let file_config = config::resolve_config(data_dir)?;
    let host = args.host.unwrap_or(file_config.server.host);
    let port = args.port.unwrap_or(file_config.server.port);

    server::run(&host, port).await
}

/// Where the client subcommands should talk to: an explicit `--url`, or
/// the address the server would bind with the same config.
fn base_url(data_dir: &std::path::Path, url: Option<&str>) -> Result<String> {
    if let Some(url) = url {
        return Ok(url.trim_end_matches('/').to_string());
    }
    let file_config = config::resolve_config(data_dir)?;
    Ok(format!(
        "http://{}:{}",
        file_config.server.host, file_config.server.port
    ))
}
