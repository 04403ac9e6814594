//! # hrms-chat
//!
//! Headless chat client for the HRMS backend.
//!
//! Pulls the conversation list over REST, follows the WebSocket push channel
//! and logs a summary line every time the chat state changes. Useful for
//! exercising a backend without the web UI. The `meeting` subcommands manage
//! the local live-meeting badges shown next to conversations.

use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use hrms_client::api::RestBackend;
use hrms_client::config::ClientConfig;
use hrms_client::meetings::MeetingBadges;
use hrms_client::socket::PushConnection;
use hrms_client::view::ChatSnapshot;
use hrms_client::{init_tracing, ChatSession, SessionOptions};
use hrms_shared::types::ConversationId;

#[derive(Parser)]
#[command(name = "hrms-chat")]
#[command(about = "Headless HRMS chat client", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Follow the chat session and log every state change (default)
    Follow,

    /// Manage live meeting badges in the local cache
    #[command(subcommand)]
    Meeting(MeetingCommand),
}

#[derive(Subcommand)]
enum MeetingCommand {
    /// Show a live badge on a conversation
    Start {
        conversation: String,

        /// How long the badge stays live
        #[arg(long, short, default_value_t = 60)]
        minutes: i64,
    },

    /// Remove the badge from a conversation
    End { conversation: String },

    /// List conversations that currently carry a badge
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 1. Tracing and configuration
    // -----------------------------------------------------------------------
    init_tracing();
    info!("Starting hrms-chat v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();

    // -----------------------------------------------------------------------
    // 2. Local badge cache
    // -----------------------------------------------------------------------
    let badges = MeetingBadges::open(config.db_path.as_deref())?;

    match cli.command.unwrap_or(Command::Follow) {
        Command::Follow => follow(&config, &badges).await,
        Command::Meeting(command) => run_meeting(&badges, command),
    }
}

fn run_meeting(badges: &MeetingBadges, command: MeetingCommand) -> anyhow::Result<()> {
    let now = Utc::now();
    match command {
        MeetingCommand::Start {
            conversation,
            minutes,
        } => {
            if minutes <= 0 {
                anyhow::bail!("--minutes must be positive");
            }
            badges.start(&ConversationId(conversation), Duration::minutes(minutes), now)?;
        }
        MeetingCommand::End { conversation } => {
            let id = ConversationId(conversation);
            if !badges.end(&id)? {
                warn!(conversation = %id, "No live meeting to end");
            }
        }
        MeetingCommand::List => {
            for meeting in badges.live(now)? {
                info!(
                    conversation = %meeting.conversation_id,
                    expires_at = %meeting.expires_at,
                    "Live meeting"
                );
            }
        }
    }
    Ok(())
}

async fn follow(config: &ClientConfig, badges: &MeetingBadges) -> anyhow::Result<()> {
    let options = SessionOptions::from_config(config)?;
    info!(
        api = %config.api_url,
        socket = %config.socket_url,
        user = %options.local_user,
        policy = options.read_policy.name(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Backend, push channel and session
    // -----------------------------------------------------------------------
    let backend = Arc::new(RestBackend::from_config(config)?);
    let push = PushConnection::connect(&config.socket_url, &config.token, config.reconnect_delay)?;
    let handle = ChatSession::activate(options, backend, push);

    let mut snapshots = handle.watch();
    let mut events = handle.subscribe();

    // -----------------------------------------------------------------------
    // 4. Follow state changes until Ctrl+C
    // -----------------------------------------------------------------------
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    warn!("Session ended unexpectedly");
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                report(&snapshot, badges);
            }
            event = events.recv() => match event {
                Ok(event) => info!(event = event.name(), ?event, "Session event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed session events"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    if let Err(e) = handle.teardown().await {
        warn!(error = %e, "Session teardown failed");
    }
    Ok(())
}

fn report(snapshot: &ChatSnapshot, badges: &MeetingBadges) {
    if snapshot.is_loading() {
        info!("Loading conversations");
        return;
    }

    let summary = snapshot.summary();
    info!(
        phase = ?snapshot.phase,
        total = summary.total,
        unread = summary.unread,
        online = summary.online,
        "Chat state"
    );

    let live = match badges.live_set(Utc::now()) {
        Ok(live) => live,
        Err(e) => {
            warn!(error = %e, "Cannot read meeting badges");
            Default::default()
        }
    };

    for conv in snapshot.conversations.iter().take(10) {
        info!(
            conversation = %conv.id,
            name = %snapshot.display_name(conv),
            unread = conv.unread_count,
            live = live.contains(&conv.id),
            "  "
        );
    }
}
