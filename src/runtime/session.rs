//! Game Session Task
//!
//! One tokio task exclusively owns the `GameEngine`. Player clicks arrive
//! as commands and the turn deadline is a `tokio::time::Sleep` polled in
//! the same `select!`, so the two entry points can never interleave.
//!
//! After every step the task re-syncs its deadline from
//! `GameEngine::turn_timer()`: a new generation replaces (and thereby
//! cancels) the armed sleep, `None` drops it.

use std::pin::Pin;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Sleep;
use tracing::{debug, info, instrument, warn};

use crate::game::engine::{EngineConfig, ExpireOutcome, GameEngine, GameError, SelectOutcome};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::snapshot::RoundSnapshot;
use crate::game::state::{RoundId, RoundSummary, SquareId};
use crate::replay::transcript::RoundTranscript;
use crate::runtime::protocol::SessionCommand;

/// Configuration for a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pending commands before `GameHandle` calls wait.
    pub command_buffer: usize,
    /// Events retained for slow subscribers.
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_buffer: 64,
            event_buffer: 256,
        }
    }
}

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The engine rejected the command.
    #[error("game error: {0}")]
    Game(#[from] GameError),

    /// The session task is gone.
    #[error("session closed")]
    Closed,
}

/// Armed turn deadline.
struct Deadline {
    generation: u64,
    sleep: Pin<Box<Sleep>>,
}

/// What woke the task.
enum Step {
    Command(Option<SessionCommand>),
    Deadline(u64),
}

/// The session task state.
pub struct GameSession {
    engine: GameEngine,
    events: broadcast::Sender<GameEvent>,
    deadline: Option<Deadline>,
    round_started_at: DateTime<Utc>,
}

impl GameSession {
    /// Spawn the session task on the current runtime.
    pub fn spawn(
        engine_config: EngineConfig,
        config: SessionConfig,
    ) -> Result<(GameHandle, JoinHandle<()>), SessionError> {
        let engine = GameEngine::new(engine_config)?;
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
        let (event_tx, _) = broadcast::channel(config.event_buffer);

        let session = GameSession {
            engine,
            events: event_tx.clone(),
            deadline: None,
            round_started_at: Utc::now(),
        };
        let task = tokio::spawn(session.run(command_rx));

        let handle = GameHandle {
            commands: command_tx,
            events: event_tx,
        };
        Ok((handle, task))
    }

    /// Main loop: commands and the turn deadline, one at a time.
    #[instrument(skip_all)]
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        info!("Game session started");

        loop {
            let step = tokio::select! {
                command = commands.recv() => Step::Command(command),
                generation = deadline_elapsed(&mut self.deadline) => Step::Deadline(generation),
            };

            match step {
                Step::Command(None) | Step::Command(Some(SessionCommand::Shutdown)) => break,
                Step::Command(Some(command)) => self.handle_command(command),
                Step::Deadline(generation) => {
                    self.deadline = None;
                    if let ExpireOutcome::Missed { square } = self.engine.expire(generation) {
                        debug!(square, generation, "Turn deadline missed");
                    }
                    self.after_step();
                }
            }
        }

        info!("Game session stopped");
    }

    fn handle_command(&mut self, command: SessionCommand) {
        debug!(command = command.name(), "Handling command");

        match command {
            SessionCommand::Configure { quantity, reply } => {
                let result = self.engine.configure(quantity);
                self.finish_command(reply, result);
            }
            SessionCommand::Start { timer_ms, reply } => {
                let result = self.engine.start(timer_ms);
                if result.is_ok() {
                    self.round_started_at = Utc::now();
                }
                self.finish_command(reply, result);
            }
            SessionCommand::Select { square, reply } => {
                let result = self.engine.select(square);
                self.finish_command(reply, result);
            }
            SessionCommand::SetMaxScore { max_score, reply } => {
                let result = self.engine.set_max_score(max_score);
                self.finish_command(reply, result);
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.engine.snapshot());
            }
            SessionCommand::Transcript { reply } => {
                let _ = reply.send(RoundTranscript::capture(&self.engine, self.round_started_at));
            }
            SessionCommand::Shutdown => {}
        }
    }

    /// Publish effects, then answer the caller.
    fn finish_command<T>(&mut self, reply: oneshot::Sender<Result<T, GameError>>, result: Result<T, GameError>) {
        if let Err(e) = &result {
            warn!("Command rejected: {}", e);
        }
        self.after_step();
        // Caller may have given up waiting
        let _ = reply.send(result);
    }

    fn after_step(&mut self) {
        self.publish_events();
        self.sync_deadline();
    }

    fn publish_events(&mut self) {
        for event in self.engine.take_events() {
            match &event.data {
                GameEventData::RoundStarted { round_id, quantity, timer_ms, max_score } => {
                    info!(%round_id, quantity, timer_ms, max_score, "Round started");
                }
                GameEventData::RoundFinished { summary } => {
                    info!(
                        round_id = %summary.round_id,
                        success = summary.success_count,
                        fail = summary.fail_count,
                        reason = ?summary.reason,
                        "Round finished"
                    );
                }
                GameEventData::SquareActivated { square } => {
                    debug!(turn = event.turn, square, "Square lit");
                }
                _ => {}
            }
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }

    fn sync_deadline(&mut self) {
        match self.engine.turn_timer() {
            Some(timer) => {
                let armed = self.deadline.as_ref().map(|d| d.generation);
                if armed != Some(timer.generation) {
                    self.deadline = Some(Deadline {
                        generation: timer.generation,
                        sleep: Box::pin(tokio::time::sleep(timer.duration)),
                    });
                }
            }
            None => self.deadline = None,
        }
    }
}

/// Resolves when the armed deadline elapses; never resolves if none is armed.
async fn deadline_elapsed(deadline: &mut Option<Deadline>) -> u64 {
    match deadline {
        Some(armed) => {
            armed.sleep.as_mut().await;
            armed.generation
        }
        None => std::future::pending().await,
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable client for a running session.
#[derive(Clone, Debug)]
pub struct GameHandle {
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<GameEvent>,
}

impl GameHandle {
    /// Rebuild the board with `quantity` squares.
    pub async fn configure(&self, quantity: u32) -> Result<(), SessionError> {
        Ok(self
            .request(|reply| SessionCommand::Configure { quantity, reply })
            .await??)
    }

    /// Start (or restart) a round.
    pub async fn start(&self, timer_ms: u64) -> Result<RoundId, SessionError> {
        Ok(self
            .request(|reply| SessionCommand::Start { timer_ms, reply })
            .await??)
    }

    /// Forward a click.
    pub async fn select(&self, square: SquareId) -> Result<SelectOutcome, SessionError> {
        Ok(self
            .request(|reply| SessionCommand::Select { square, reply })
            .await??)
    }

    /// Change the finish threshold.
    pub async fn set_max_score(&self, max_score: u32) -> Result<(), SessionError> {
        Ok(self
            .request(|reply| SessionCommand::SetMaxScore { max_score, reply })
            .await??)
    }

    /// Read-only projection of the round.
    pub async fn snapshot(&self) -> Result<RoundSnapshot, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Transcript of the current or last round.
    pub async fn transcript(&self) -> Result<RoundTranscript, SessionError> {
        self.request(|reply| SessionCommand::Transcript { reply }).await
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Stop the session task.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.commands
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| SessionError::Closed)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }
}

/// Wait for the next finished notification on an event stream.
///
/// Returns `None` once the session is gone.
pub async fn next_finished(events: &mut broadcast::Receiver<GameEvent>) -> Option<RoundSummary> {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(summary) = event.finished_summary() {
                    return Some(*summary);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{FinishReason, RoundPhase, SquareState};
    use std::time::Duration;
    use tokio::time::sleep;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn spawn_session(quantity: u32, max_score: u32) -> (GameHandle, JoinHandle<()>) {
        GameSession::spawn(
            EngineConfig {
                square_quantity: quantity,
                max_score,
                seed: Some(2024),
                ..EngineConfig::default()
            },
            SessionConfig::default(),
        )
        .unwrap()
    }

    fn current_count(snapshot: &RoundSnapshot) -> usize {
        snapshot
            .squares
            .iter()
            .filter(|s| s.state == SquareState::Current)
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fails_square() {
        let (handle, _task) = spawn_session(5, 3);
        handle.start(1000).await.unwrap();

        let first = handle.snapshot().await.unwrap();
        assert_eq!(current_count(&first), 1);
        let lit = first.active_square.unwrap();

        sleep(ms(1001)).await;

        let after = handle.snapshot().await.unwrap();
        assert_eq!(after.fail_count, 1);
        assert_eq!(after.squares[lit as usize].state, SquareState::Fail);
        assert_eq!(current_count(&after), 1);
        assert_ne!(after.active_square, Some(lit));
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_cancels_deadline() {
        let (handle, _task) = spawn_session(5, 3);
        handle.start(1000).await.unwrap();

        sleep(ms(600)).await;
        let lit = handle.snapshot().await.unwrap().active_square.unwrap();
        assert_eq!(handle.select(lit).await.unwrap(), SelectOutcome::Hit);

        // Past the first deadline, before the second
        sleep(ms(600)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.success_count, 1);
        assert_eq!(snapshot.fail_count, 0);

        sleep(ms(500)).await;
        assert_eq!(handle.snapshot().await.unwrap().fail_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_notified_once() {
        let (handle, _task) = spawn_session(5, 2);
        let mut events = handle.subscribe();
        handle.start(100).await.unwrap();

        let summary = next_finished(&mut events).await.unwrap();
        assert_eq!(summary.fail_count, 2);
        assert_eq!(summary.success_count, 0);
        assert_eq!(summary.reason, FinishReason::FailTarget);

        // Nothing else fires after the round ends
        sleep(ms(1000)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, RoundPhase::Finished);
        assert_eq!(snapshot.fail_count, 2);
        assert_eq!(current_count(&snapshot), 0);
        assert!(events.try_recv().is_err());

        assert_eq!(handle.select(0).await.unwrap(), SelectOutcome::RoundOver);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_drops_old_deadline() {
        let (handle, _task) = spawn_session(5, 3);
        handle.start(1000).await.unwrap();

        sleep(ms(900)).await;
        handle.start(1000).await.unwrap();

        // The first round's deadline would have fired at 1000
        sleep(ms(500)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.fail_count, 0);
        assert_eq!(current_count(&snapshot), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_surface() {
        let (handle, _task) = spawn_session(5, 3);
        handle.start(1000).await.unwrap();

        assert_eq!(
            handle.select(42).await,
            Err(SessionError::Game(GameError::UnknownSquareId { id: 42, board_size: 5 }))
        );
        assert!(matches!(
            handle.configure(0).await,
            Err(SessionError::Game(GameError::InvalidConfiguration { .. }))
        ));

        // Still running
        assert_eq!(handle.snapshot().await.unwrap().phase, RoundPhase::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transcript_verifies() {
        let (handle, _task) = spawn_session(6, 2);
        let mut events = handle.subscribe();
        handle.start(200).await.unwrap();

        let lit = handle.snapshot().await.unwrap().active_square.unwrap();
        handle.select(lit).await.unwrap();
        next_finished(&mut events).await.unwrap();

        let transcript = handle.transcript().await.unwrap();
        assert!(transcript.is_complete());
        let result = crate::replay::verify_transcript(&transcript).unwrap();
        assert!(result.valid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes() {
        let (handle, task) = spawn_session(3, 3);
        handle.start(1000).await.unwrap();
        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert_eq!(handle.snapshot().await, Err(SessionError::Closed));
    }
}
