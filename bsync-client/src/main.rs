//! bsync-client - command-line participant
//!
//! Joins a room and either follows the queue or performs one change on it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use bsync_client::preview::PreviewResolution;
use bsync_client::transport::EventStream;
use bsync_client::{
    mirror, ClientConfig, DragOutcome, DragReorderController, HttpTransport, OptimisticPreview,
    Session, SessionUpdate,
};
use bsync_common::{ClientRequest, EntryUrl, QueueEntryState, RoomId};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for bsync-client
#[derive(Parser, Debug)]
#[command(name = "bsync-client")]
#[command(about = "Shared room queue participant")]
#[command(version)]
struct Args {
    /// Client config file (TOML)
    #[arg(short, long, env = "BSYNC_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Server base URL (overrides config)
    #[arg(short, long, env = "BSYNC_SERVER_URL")]
    server: Option<String>,

    /// Room to join
    #[arg(short, long, default_value = "lobby")]
    room: String,

    /// Display name announced when joining
    #[arg(short, long)]
    name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the queue on every change
    Watch,
    /// Move the entry at one position to another
    Move {
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },
    /// Append entries
    Add { urls: Vec<String> },
    /// Remove entries
    Delete { urls: Vec<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "bsync_client=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(server) = &args.server {
        config.server_url = server.clone();
    }

    let transport = HttpTransport::new(&config.server_url, RoomId::new(args.room.clone()));
    let (writer, _) = mirror();
    let mut session = Session::new(writer, OptimisticPreview::new(config.preview_timeout()));

    info!("Joining room {} at {}", args.room, config.server_url);
    let mut events = transport
        .open_events(args.name.as_deref())
        .await
        .context("Failed to join room")?;

    // CONNECTED, then the snapshot
    wait_for_snapshot(&mut session, &mut events, &transport).await?;

    match args.command {
        Command::Watch => watch(&mut session, &mut events, &transport).await,
        Command::Move { from, to } => move_entry(&config, &mut session, &mut events, &transport, from, to).await,
        Command::Add { urls } => {
            let request = ClientRequest::AddEntries {
                urls: urls.into_iter().map(EntryUrl::from).collect(),
                request_id: None,
            };
            transport.send(&request).await.context("Add failed")?;
            println!("accepted");
            Ok(())
        }
        Command::Delete { urls } => {
            let request = ClientRequest::DeleteEntries {
                urls: urls.into_iter().map(EntryUrl::from).collect(),
                request_id: None,
            };
            transport.send(&request).await.context("Delete failed")?;
            println!("accepted");
            Ok(())
        }
    }
}

async fn wait_for_snapshot(session: &mut Session, events: &mut EventStream, transport: &HttpTransport) -> Result<()> {
    loop {
        match session.next_update(events, transport).await? {
            Some(SessionUpdate::QueueSet { .. }) => return Ok(()),
            Some(_) => {}
            None => bail!("Server closed the stream before sending the queue"),
        }
    }
}

async fn watch(session: &mut Session, events: &mut EventStream, transport: &HttpTransport) -> Result<()> {
    print_queue(session);
    while let Some(update) = session.next_update(events, transport).await? {
        match update {
            SessionUpdate::QueueSet { .. } => print_queue(session),
            SessionUpdate::Connected { role, can_mutate, .. } => {
                println!("role: {} (can reorder: {})", role, can_mutate)
            }
            SessionUpdate::Rejected { reason, .. } => println!("rejected: {} {}", reason.code, reason.url),
            SessionUpdate::PreviewExpired => {}
        }
    }
    println!("stream closed");
    Ok(())
}

async fn move_entry(
    config: &ClientConfig,
    session: &mut Session,
    events: &mut EventStream,
    transport: &HttpTransport,
    from: usize,
    to: usize,
) -> Result<()> {
    let mirror = session.mirror();
    let order = mirror.current_order();
    let (Some(active), Some(over)) = (order.get(from), order.get(to)) else {
        bail!("Positions must be below {}", order.len());
    };

    let mut controller = DragReorderController::new(
        mirror.clone(),
        session.preview().clone(),
        Arc::new(transport.clone()),
        config.touch,
        config.mouse,
    );

    match controller.drop_on(&active.url, Some(&over.url), Instant::now()) {
        DragOutcome::Submitted { .. } => {}
        DragOutcome::NoOp(reason) => {
            println!("nothing to do: {:?}", reason);
            return Ok(());
        }
        other => bail!("Unexpected outcome {:?}", other),
    }
    print_queue(session);

    while let Some(update) = session.next_update(events, transport).await? {
        match update {
            SessionUpdate::QueueSet {
                preview: Some(PreviewResolution::Confirmed),
                ..
            } => {
                println!("confirmed");
                print_queue(session);
                return Ok(());
            }
            SessionUpdate::Rejected {
                reason,
                preview: Some(_),
            } => bail!("Rejected: {} {}", reason.code, reason.url),
            SessionUpdate::PreviewExpired => bail!("No confirmation within {:?}", config.preview_timeout()),
            _ => {}
        }
    }
    bail!("Stream closed before confirmation")
}

fn print_queue(session: &Session) {
    let entries: Vec<QueueEntryState> = session.preview().view(&session.mirror().current_order());
    let pending = if session.preview().is_pending() { " (pending)" } else { "" };
    println!("queue{}:", pending);
    for (i, entry) in entries.iter().enumerate() {
        match entry.status.error_message() {
            Some(error) => println!("  {:>3}. {} [{}: {}]", i, entry.url.file_name(), entry.status.label(), error),
            None => println!("  {:>3}. {} [{}]", i, entry.url.file_name(), entry.status.label()),
        }
    }
}
