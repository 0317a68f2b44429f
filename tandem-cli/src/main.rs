use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Input;
use std::net::IpAddr;
use std::sync::Arc;
use tandem::client::{
    ClientConfig, ClientEvent, ConnectionSupervisor, RtcTransportFactory, SupervisorHandle,
    SupervisorState, WsConnector,
};
use tandem::server::{ServerConfig, serve};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tandem", about = "Two-party signaling relay and peer chat")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay. Flags override TANDEM_HOST / TANDEM_PORT.
    Serve {
        #[arg(long)]
        host: Option<IpAddr>,

        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Join a room and chat with whoever else joins it.
    Chat {
        #[arg(short, long, default_value = "ws://127.0.0.1:3000")]
        url: String,

        #[arg(short, long)]
        room: Option<String>,

        #[arg(long)]
        id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Serve { host, port } => run_serve(host, port).await,
        Commands::Chat { url, room, id } => run_chat(url, room, id).await,
    }
}

async fn run_serve(host: Option<IpAddr>, port: Option<u16>) -> Result<()> {
    let mut config = ServerConfig::from_env().context("Invalid relay configuration")?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    println!(
        "{} {}",
        "Starting tandem relay on".green().bold(),
        config.socket_addr()
    );
    serve(config).await
}

async fn run_chat(url: String, room: Option<String>, id: Option<String>) -> Result<()> {
    let room = match room {
        Some(room) => room,
        None => Input::<String>::new()
            .with_prompt("Room")
            .default("chat".into())
            .interact_text()
            .context("Failed to read room name")?,
    };

    let mut config = ClientConfig::new(url, room.as_str());
    if let Some(id) = id {
        config = config.with_peer_id(id);
    }
    let connector = WsConnector::new(config.endpoint());

    let mut handle = ConnectionSupervisor::connect(config, Arc::new(RtcTransportFactory), connector)
        .await
        .context("Failed to reach the relay")?;
    println!(
        "{}",
        format!("Joining '{}'. Type to chat, /reconnect or /leave.", room).cyan()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                if !handle_input(&handle, line.trim()).await? {
                    break;
                }
            }
            event = handle.next_event() => {
                let Some(event) = event else { break };
                print_event(&event);
            }
        }
    }

    if handle.state() != SupervisorState::Left {
        handle.leave().await?;
    }
    handle.shutdown().await;
    Ok(())
}

/// Returns `false` when the user asked to quit.
async fn handle_input(handle: &SupervisorHandle, line: &str) -> Result<bool> {
    match line {
        "" => {}
        "/leave" | "/quit" => return Ok(false),
        "/reconnect" => {
            if let Err(e) = handle.reconnect().await {
                println!("{} {:#}", "Reconnect failed:".red(), e);
            }
        }
        text => {
            if !handle.send(text).await {
                println!("{}", "Not connected to a peer yet.".yellow());
            }
        }
    }
    Ok(true)
}

fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::Registered(id) => println!("{} {}", "Registered as".dimmed(), id),
        ClientEvent::Paired { peer, role } => {
            println!("{} {} ({:?})", "Paired with".green(), peer, role)
        }
        ClientEvent::ChannelOpen => println!("{}", "Channel open, say hi.".green().bold()),
        ClientEvent::Message(text) => println!("{} {}", ">".blue().bold(), text),
        ClientEvent::ChannelError(err) => println!("{} {}", "Channel error:".red(), err),
        ClientEvent::ChannelClosed => println!("{}", "Channel closed.".yellow()),
        ClientEvent::PeerLeft(peer) => println!("{} {}", peer, "left the room.".yellow()),
        ClientEvent::RoomFull(room) => {
            println!("{} {}", "Room is full:".red().bold(), room)
        }
        ClientEvent::NegotiationFailed(reason) => {
            println!("{} {}", "Negotiation failed:".red(), reason)
        }
        ClientEvent::StateChanged(SupervisorState::Disconnected) => {
            println!("{}", "Disconnected. Type /reconnect to try again.".yellow())
        }
        ClientEvent::StateChanged(_) => {}
    }
}
