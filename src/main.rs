//! Arena Duel
//!
//! Command-line front end: a scripted hot-seat demo that verifies replay
//! determinism, and a networked mode where one process hosts the authority
//! and the other joins it over WebSocket.

use std::net::SocketAddr;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

use arena_duel::{
    VERSION,
    config::DuelConfig,
    core::hash::to_hex,
    game::{
        moves::{Move, Seat},
        record::MatchRecord,
        round::replay_rounds,
        state::ArenaState,
        turn::Game,
    },
    network::{
        client::{ClientError, Selection},
        router::{Context, RoutingError},
        socket,
    },
};

#[derive(Parser)]
#[clap(version, about = "Deterministic two-player arena duel")]
struct Cli {
    /// Cells on the arena axis
    #[clap(long, global = true)]
    size: Option<i32>,
    /// Starting health of both players
    #[clap(long, global = true)]
    health: Option<u32>,
    /// Skip state hash checks on broadcasts
    #[clap(long, global = true)]
    no_verify: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a scripted hot-seat match and verify it replays identically.
    Local {
        /// Rounds as `first/second` pairs, e.g. `advance/retreat`
        rounds: Vec<String>,
    },
    /// Host the authority and wait for a peer.
    Host {
        #[clap(long)]
        bind: Option<SocketAddr>,
    },
    /// Join a hosting peer.
    Join {
        #[clap(long)]
        url: Option<String>,
    },
}

const DEMO_SCRIPT: [&str; 6] = [
    "advance/stance",
    "advance/retreat",
    "switch/advance",
    "stance/attack",
    "attack/switch",
    "switch/retreat",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let default_level = if cfg!(feature = "debug-tracing") { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Arena Duel v{}", VERSION);

    let cli = Cli::parse();
    let mut config = DuelConfig::from_env()?;
    if let Some(size) = cli.size {
        config.arena.arena_size = size;
    }
    if let Some(health) = cli.health {
        config.arena.starting_health = health;
    }
    if cli.no_verify {
        config.verify_hash = false;
    }
    config.validate()?;

    info!(
        "Arena: {} cells, {} health, hash checks {}",
        config.arena.arena_size,
        config.arena.starting_health,
        if config.verify_hash { "on" } else { "off" },
    );

    match cli.command {
        Command::Local { rounds } => demo_match(&config, &rounds),
        Command::Host { bind } => {
            let bind = bind.unwrap_or(config.network.bind_addr);
            let link = socket::host(bind, config.network.channel_capacity).await?;
            let (transport, inbound) = link.into_parts();
            let ctx = Context::host(&config, Box::new(transport));
            play_networked(ctx, inbound).await
        }
        Command::Join { url } => {
            let url = url.unwrap_or_else(|| config.network.peer_url.clone());
            let link = socket::join(&url, config.network.channel_capacity).await?;
            let (transport, inbound) = link.into_parts();
            let mut ctx = Context::peer(&config, Box::new(transport));
            // The joining side always takes the second seat.
            ctx.assign_seat(0, Seat::Second)?;
            play_networked(ctx, inbound).await
        }
    }
}

fn parse_round(round: &str) -> anyhow::Result<(Move, Move)> {
    let (first, second) = round
        .split_once('/')
        .with_context(|| format!("expected `first/second`, got `{round}`"))?;
    Ok((first.parse()?, second.parse()?))
}

/// Run a scripted hot-seat match, then verify determinism by replaying it.
fn demo_match(config: &DuelConfig, rounds: &[String]) -> anyhow::Result<()> {
    info!("=== Starting Demo Match ===");

    let script: Vec<(Move, Move)> = if rounds.is_empty() {
        DEMO_SCRIPT.iter().map(|r| parse_round(r)).collect::<Result<_, _>>()?
    } else {
        rounds.iter().map(|r| parse_round(r)).collect::<Result<_, _>>()?
    };

    let initial = ArenaState::new(config.arena);
    let mut ctx = Context::local(config);
    render(ctx.clients()[0].game());

    for (first, second) in script {
        for (index, mv) in [first, second].into_iter().enumerate() {
            ctx.submit(index, Selection::Move(mv))?;
            ctx.submit(index, Selection::Submit)?;
        }
        ctx.tick()?;

        let game = ctx.clients()[0].game();
        for event in game.last_events() {
            info!("  {:?}: {:?}", event.phase, event.data);
        }
        render(game);

        if let Some(outcome) = game.outcome() {
            info!("Match ended: {:?}", outcome);
            break;
        }
    }

    let game = ctx
        .server()
        .map(|server| server.game())
        .context("local context has no server")?;

    info!("=== Match Results ===");
    let hash = game.state_hash();
    info!("Rounds played: {}", game.round());
    info!("Final State Hash: {}", to_hex(&hash));

    info!("=== Verifying Determinism ===");
    let (replayed, events) = replay_rounds(initial.clone(), &game.rounds());
    info!("Replay produced {} events", events.len());

    let record = MatchRecord::from_game(Uuid::new_v4(), &initial, game);
    let verified = record.replay()?;
    info!("Record {} commitment {}", record.match_id, to_hex(&record.commitment()));

    if replayed.compute_hash() == hash && verified.state_hash() == hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
        Ok(())
    } else {
        anyhow::bail!("DETERMINISM FAILURE: Hashes differ!")
    }
}

/// Drive one side of a networked match from stdin.
async fn play_networked(mut ctx: Context, mut inbound: mpsc::Receiver<String>) -> anyhow::Result<()> {
    info!("Moves: advance, charge, retreat, attack, switch, stance. Also: undo, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    if let Some(client) = ctx.client(0) {
        render(client.game());
    }

    loop {
        tokio::select! {
            frame = inbound.recv() => match frame {
                Some(frame) => ctx.on_message(&frame)?,
                None => {
                    info!("Peer disconnected");
                    break;
                }
            },
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !handle_input(&mut ctx, line.trim())? {
                        break;
                    }
                }
                None => break,
            },
        }

        ctx.tick()?;

        let Some(client) = ctx.client_mut(0) else { break };
        if client.has_updated() {
            let game = client.game();
            render(game);
            if let Some(outcome) = game.outcome() {
                info!("Match ended: {:?}", outcome);
                break;
            }
        }
    }

    Ok(())
}

/// Apply one line of player input. Returns `false` to quit.
fn handle_input(ctx: &mut Context, line: &str) -> anyhow::Result<bool> {
    let result = match line {
        "" => return Ok(true),
        "quit" | "q" => return Ok(false),
        "undo" | "u" => ctx.request_undo(0),
        name => match name.parse::<Move>() {
            Ok(mv) => ctx
                .submit(0, Selection::Move(mv))
                .and_then(|_| ctx.submit(0, Selection::Submit)),
            Err(e) => {
                warn!("{}", e);
                return Ok(true);
            }
        },
    };

    match result {
        Ok(()) => Ok(true),
        Err(RoutingError::Client(
            e @ (ClientError::AlreadySubmitted(_) | ClientError::IncompleteSelection(_) | ClientError::NoSeat),
        )) => {
            warn!("{}", e);
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}

/// Print the arena as one line per round.
fn render(game: &Game) {
    let state = game.state();
    let mut cells = vec!['.'; state.arena_size() as usize];
    for (seat, glyph) in Seat::ALL.into_iter().zip(['A', 'B']) {
        if let Some(cell) = cells.get_mut(state.player(seat).position as usize) {
            *cell = glyph;
        }
    }

    let a = state.player(Seat::First);
    let b = state.player(Seat::Second);
    info!(
        "round {:>3} |{}|  A: hp {} {:?}  B: hp {} {:?}",
        game.round(),
        cells.into_iter().collect::<String>(),
        a.health,
        a.stance,
        b.health,
        b.stance,
    );
}
