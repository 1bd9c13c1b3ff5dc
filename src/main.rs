//! Reaction Grid Demo
//!
//! Runs one round against a simulated player, then replays the recorded
//! transcript and checks it reproduces the same final state.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use reaction_grid::{
    DeterministicRng, EngineConfig, GameEventData, GameHandle, GameSession, SelectOutcome,
    SessionConfig, VERSION,
    game::events::GameEvent,
    replay::verify_transcript,
    runtime::next_finished,
};

/// Seed for the simulated player's reaction times.
const PLAYER_SEED: u64 = 0x5EED_CAFE;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Reaction Grid v{}", VERSION);

    let config = config_from_env()?;
    config.validate()?;
    info!(
        quantity = config.square_quantity,
        timer_ms = config.timer_ms,
        max_score = config.max_score,
        seed = ?config.seed,
        "Engine configuration"
    );

    demo_round(config).await
}

/// Defaults overridden by `REACTION_GRID_*` environment variables.
fn config_from_env() -> Result<EngineConfig> {
    let mut config = EngineConfig::default();
    if let Some(quantity) = env_var("REACTION_GRID_QUANTITY")? {
        config.square_quantity = quantity;
    }
    if let Some(timer_ms) = env_var("REACTION_GRID_TIMER_MS")? {
        config.timer_ms = timer_ms;
    }
    if let Some(max_score) = env_var("REACTION_GRID_MAX_SCORE")? {
        config.max_score = max_score;
    }
    config.seed = env_var("REACTION_GRID_SEED")?;
    Ok(config)
}

fn env_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid value for {name}: {raw:?}"))?;
            Ok(Some(value))
        }
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("cannot read {name}")),
    }
}

async fn demo_round(config: EngineConfig) -> Result<()> {
    info!("=== Starting Demo Round ===");

    let timer_ms = config.timer_ms;
    let (handle, task) = GameSession::spawn(config, SessionConfig::default())?;

    let mut finished = handle.subscribe();
    let player = tokio::spawn(simulated_player(handle.clone(), handle.subscribe(), timer_ms));

    let round_id = handle.start(timer_ms).await?;
    info!(%round_id, "Round running");

    let Some(summary) = next_finished(&mut finished).await else {
        bail!("session closed before the round finished");
    };
    info!(
        success = summary.success_count,
        fail = summary.fail_count,
        turns = summary.turns,
        reason = ?summary.reason,
        "=== Round Complete ==="
    );

    let transcript = handle.transcript().await?;
    let encoded = transcript.to_bytes()?;
    info!(
        inputs = transcript.inputs.len(),
        bytes = encoded.len(),
        seed = transcript.metadata.rng_seed,
        "Transcript recorded"
    );

    let verification = verify_transcript(&transcript)?;
    info!("Expected final hash: {}", hex::encode(verification.expected_final_hash));
    info!("Computed final hash: {}", hex::encode(verification.computed_final_hash));
    if verification.valid {
        info!("Replay verification: PASSED");
    } else {
        warn!("Replay verification: FAILED");
    }

    handle.shutdown().await?;
    task.await.context("session task panicked")?;
    player.abort();

    if !verification.valid {
        bail!("replay diverged from the recorded round");
    }
    Ok(())
}

/// Clicks each lit square after a reaction time drawn from a seeded RNG.
///
/// Each click runs on its own task so a slow reaction never delays the next.
/// Reactions range up to 1.5x the deadline, so some turns expire first.
async fn simulated_player(
    handle: GameHandle,
    mut events: broadcast::Receiver<GameEvent>,
    timer_ms: u64,
) {
    let mut rng = DeterministicRng::new(PLAYER_SEED);
    let slowest = u32::try_from(timer_ms.saturating_mul(3) / 2).unwrap_or(u32::MAX);
    let fastest = (slowest / 6).max(1);

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Player lagged behind events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };

        match event.data {
            GameEventData::SquareActivated { square } => {
                let reaction = rng.next_int_range(fastest, slowest);
                let handle = handle.clone();
                let turn = event.turn;
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(reaction as u64)).await;
                    match handle.select(square).await {
                        Ok(SelectOutcome::Hit) => info!(turn, square, reaction, "Hit"),
                        Ok(outcome) => info!(turn, square, reaction, ?outcome, "Too slow"),
                        Err(e) => debug!("Click dropped: {}", e),
                    }
                });
            }
            GameEventData::SquareResolved { square, state } => {
                debug!(turn = event.turn, square, ?state, "Square resolved");
            }
            GameEventData::ScoreChanged { success_count, fail_count } => {
                info!(success_count, fail_count, "Score");
            }
            GameEventData::RoundFinished { .. } => return,
            _ => {}
        }
    }
}
