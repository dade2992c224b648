use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Input;
use huddle::client::{
    CallEvent, CallSession, DEFAULT_SIGNALING_URL, RtcConfig, SessionConfig, SessionEvent,
    SyntheticCapture, WebRtcTransportFactory,
};
use huddle::server::{RelayServer, ServerConfig};
use huddle::{PeerId, RoomId};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(bin_name = "huddle")]
#[command(about = "Room-based WebRTC signaling relay and headless participant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Serve {
        /// Overrides HUDDLE_HOST.
        #[arg(long)]
        host: Option<String>,

        /// Overrides HUDDLE_PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Join a room with synthetic media and stay until Ctrl-C.
    Join {
        #[arg(long, default_value = DEFAULT_SIGNALING_URL)]
        url: String,

        /// Prompted for when absent.
        #[arg(short, long)]
        room: Option<String>,

        #[arg(long)]
        peer_id: Option<String>,

        /// STUN/TURN urls; the public Google STUN server when empty.
        #[arg(long = "ice-server")]
        ice_servers: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve { host, port } => run_serve(host, port).await,
        Commands::Join {
            url,
            room,
            peer_id,
            ice_servers,
        } => run_join(url, room, peer_id, ice_servers).await,
    }
}

async fn run_serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = ServerConfig::from_env().context("Failed to read relay configuration")?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let relay = RelayServer::bind(&config)
        .await
        .context("Failed to start the relay")?;

    println!("{}", "📡 Huddle relay is up".green().bold());
    println!("   🔌 ws://{}", config.addr());

    relay
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Relay stopped unexpectedly")?;

    println!("{}", "👋 Relay stopped".yellow());
    Ok(())
}

async fn run_join(
    url: String,
    room: Option<String>,
    peer_id: Option<String>,
    ice_servers: Vec<String>,
) -> Result<()> {
    let room = match room {
        Some(room) => room,
        None => Input::<String>::new()
            .with_prompt("Room code")
            .interact_text()
            .context("Failed to read room code")?,
    };
    let room_id = RoomId::parse(room.trim()).context("Room code cannot be empty")?;

    let mut config = SessionConfig::new(room_id).with_signaling_url(url);
    if let Some(peer_id) = peer_id {
        config = config.with_peer_id(PeerId::parse(&peer_id).context("Peer id cannot be empty")?);
    }

    let rtc = if ice_servers.is_empty() {
        RtcConfig::default()
    } else {
        RtcConfig { ice_servers }
    };

    println!("{}", "🚀 Joining room...".cyan());
    let (mut session, mut events) = CallSession::start(
        config,
        Arc::new(SyntheticCapture::new()),
        Arc::new(WebRtcTransportFactory::new(rtc)),
    )
    .await
    .context("Failed to join room")?;

    println!(
        "{} as {}",
        "✨ Joined".green().bold(),
        session.local_peer_id().to_string().bold()
    );
    println!("   Press Ctrl-C to hang up.");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            _ = &mut ctrl_c => break,
        }
    }

    session.end_call().await;
    println!("{}", "👋 Call ended".yellow());
    Ok(())
}

fn print_event(event: &CallEvent) {
    match event {
        CallEvent::Peer { peer_id, event } => print_peer_event(peer_id, event),
        CallEvent::RelayError { message } => {
            println!("{} {}", "⚠ relay:".yellow().bold(), message);
        }
        CallEvent::Error(e) => println!("{} {}", "✖".red().bold(), e),
    }
}

fn print_peer_event(peer_id: &PeerId, event: &SessionEvent) {
    let peer = format!("[{}]", peer_id).dimmed();
    match event {
        SessionEvent::StateChanged(state) => {
            println!("{} {} {}", peer, "● state".cyan(), state);
        }
        SessionEvent::RemoteMediaUpdated(snapshot) if snapshot.is_empty() => {
            println!("{} {}", peer, "● no remote media".dimmed());
        }
        SessionEvent::RemoteMediaUpdated(snapshot) => {
            for media in snapshot.values() {
                let kinds: Vec<String> = media.tracks.iter().map(|t| t.kind.to_string()).collect();
                println!(
                    "{} {} stream {} [{}]",
                    peer,
                    "▶ remote".green(),
                    media.stream_id,
                    kinds.join(", ")
                );
            }
        }
        SessionEvent::Error(e) => println!("{} {} {}", peer, "✖".red().bold(), e),
    }
}
