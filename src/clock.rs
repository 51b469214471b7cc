//! Simulation clock
//!
//! Owns one `GameSession` and drives it from two entry points:
//! - `pump_logic(now)`: called on a ~16 ms cadence. Runs the step catch-up
//!   loop, polls an outstanding remote verdict and fires due timers.
//! - `render_frame(now)`: called on display refresh. Animates the explosion and
//!   returns a snapshot of committed state.
//!
//! Time is always passed in as milliseconds on a monotonic clock.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot::error::TryRecvError;

use crate::consts::LOGIC_INTERVAL_MS;
use crate::error::ServiceError;
use crate::leaderboard::{LeaderboardEntry, LeaderboardSink};
use crate::oracle::{CorrectnessOracle, Verdict, VerdictReceiver};
use crate::questions::Question;
use crate::sim::tick::session_step_delay;
use crate::sim::{
    DeathCause, Direction, ExplosionParticle, GamePhase, GameSession, GridPos, InputOutcome,
    QuestionToken, Target, TickOutcome, TimerKind, resolve_verdict, tick,
};

/// Maximum steps per pump to prevent spiral of death after a stall
const MAX_CATCHUP_STEPS: u32 = 8;

/// Something the front end may want to react to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ClockEvent {
    /// First accepted key; the run clock is ticking
    Started,
    Moved,
    Correct { level: u32 },
    /// Half the bank answered correctly (once per run)
    NextLevelEligible,
    VerdictPending,
    GameOver(DeathCause),
    SlowMotionEnded,
    /// Death splash done; `start()` begins a new run
    Restartable { level: u32, elapsed_ms: u64 },
}

/// Read-only view for the renderer
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub segments: Vec<GridPos>,
    pub targets: Vec<Target>,
    pub level: u32,
    pub elapsed_ms: u64,
    pub running: bool,
    pub over: bool,
    pub question: Option<Question>,
    pub folder: String,
    pub particles: Vec<ExplosionParticle>,
    pub explosion_progress: f32,
    pub death_cause: Option<DeathCause>,
    pub verdict_pending: bool,
    pub slow_motion: bool,
    pub eligible_for_next_level: bool,
    pub placement_relaxed: bool,
}

struct InFlight {
    token: QuestionToken,
    rx: VerdictReceiver,
}

pub struct SimulationClock {
    session: GameSession,
    oracle: Box<dyn CorrectnessOracle>,
    leaderboard: Option<Arc<dyn LeaderboardSink>>,
    player_name: String,
    /// Time the last step was due
    last_step_ms: u64,
    in_flight: Option<InFlight>,
    events: Vec<ClockEvent>,
}

impl SimulationClock {
    pub fn new(session: GameSession, oracle: Box<dyn CorrectnessOracle>) -> Self {
        Self {
            session,
            oracle,
            leaderboard: None,
            player_name: String::new(),
            last_step_ms: 0,
            in_flight: None,
            events: Vec::new(),
        }
    }

    /// Report finished runs to `sink` under `player_name`
    pub fn with_leaderboard(mut self, sink: Arc<dyn LeaderboardSink>, player_name: impl Into<String>) -> Self {
        self.leaderboard = Some(sink);
        self.player_name = player_name.into();
        self
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn is_verdict_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Begin a fresh run. Valid from any phase; anything left over from the
    /// previous run (explosion, timers, in-flight verdict) is discarded.
    pub fn start(&mut self, now_ms: u64) {
        if self.in_flight.take().is_some() {
            log::debug!("Abandoning in-flight verdict on restart");
        }
        self.session.reset_run();
        self.last_step_ms = now_ms;
        self.events.clear();
        log::info!(
            "Run {} started: folder '{}', {} questions{}",
            self.session.generation,
            self.session.bank.folder,
            self.session.bank.len(),
            if self.session.config.practice_mode { " (practice)" } else { "" }
        );
    }

    /// Feed one direction key. Ignored unless a run is alive.
    pub fn direction_input(&mut self, dir: Direction, now_ms: u64) -> InputOutcome {
        if self.session.phase != GamePhase::Alive {
            return InputOutcome::Rejected;
        }
        let outcome = self.session.input.push(dir);
        if outcome == InputOutcome::Started {
            self.session.started_at_ms = Some(now_ms);
            self.events.push(ClockEvent::Started);
        }
        outcome
    }

    /// Feed a raw key name. Direction keys steer; Enter or Space (re)starts
    /// when no run is alive. Returns false for keys with no meaning.
    pub fn key_down(&mut self, key: &str, now_ms: u64) -> bool {
        if let Some(dir) = Direction::from_key(key) {
            self.direction_input(dir, now_ms);
            return true;
        }
        let restart_key = matches!(key, "Enter" | " " | "Space" | "space" | "enter");
        if restart_key && matches!(self.session.phase, GamePhase::Idle | GamePhase::AwaitingRestart) {
            self.start(now_ms);
            return true;
        }
        false
    }

    /// Logic loop body. Returns events produced since the last call.
    pub fn pump_logic(&mut self, now_ms: u64) -> Vec<ClockEvent> {
        self.poll_verdict(now_ms);
        self.fire_timers(now_ms);

        if self.session.phase == GamePhase::Alive && self.in_flight.is_none() {
            self.catch_up(now_ms);
        }

        std::mem::take(&mut self.events)
    }

    /// Render loop body
    pub fn render_frame(&mut self, now_ms: u64) -> Snapshot {
        self.session.death.animate(now_ms, self.session.generation);
        self.snapshot(now_ms)
    }

    pub fn snapshot(&self, now_ms: u64) -> Snapshot {
        let session = &self.session;
        let particles = session
            .death
            .explosion()
            .map(|e| e.particles.clone())
            .unwrap_or_default();
        Snapshot {
            phase: session.phase,
            segments: session.snake.clone(),
            targets: session.targets.clone(),
            level: session.level,
            elapsed_ms: session.elapsed_ms(now_ms),
            running: session.is_running(),
            over: session.is_over(),
            question: session.current_question().cloned(),
            folder: session.bank.folder.clone(),
            particles,
            explosion_progress: session.death.progress(),
            death_cause: session.death.cause(),
            verdict_pending: self.in_flight.is_some(),
            slow_motion: session.slow_motion,
            eligible_for_next_level: session.eligible_for_next_level,
            placement_relaxed: session.placement_relaxed,
        }
    }

    /// Suggested sleep between logic pumps
    pub fn logic_interval_ms(&self) -> u64 {
        LOGIC_INTERVAL_MS
    }

    fn catch_up(&mut self, now_ms: u64) {
        let mut steps = 0;
        loop {
            let delay = session_step_delay(&self.session);
            if now_ms.saturating_sub(self.last_step_ms) < delay {
                break;
            }
            if steps >= MAX_CATCHUP_STEPS {
                log::debug!("Logic loop fell behind, dropping owed steps");
                self.last_step_ms = now_ms;
                break;
            }
            self.last_step_ms += delay;
            steps += 1;

            let outcome = tick(&mut self.session, self.oracle.as_ref(), now_ms);
            if !self.handle_outcome(outcome, now_ms) {
                break;
            }
        }
    }

    /// Record events for a step; false when stepping must stop
    fn handle_outcome(&mut self, outcome: TickOutcome, now_ms: u64) -> bool {
        match outcome {
            TickOutcome::Idle => true,
            TickOutcome::Moved => {
                self.events.push(ClockEvent::Moved);
                true
            }
            TickOutcome::Grew { level, eligible } => {
                self.events.push(ClockEvent::Correct { level });
                if eligible {
                    self.events.push(ClockEvent::NextLevelEligible);
                }
                true
            }
            TickOutcome::Died(cause) => {
                self.events.push(ClockEvent::GameOver(cause));
                false
            }
            TickOutcome::AwaitingVerdict(rx) => {
                match self.session.pending.map(|p| p.token) {
                    Some(token) => {
                        self.in_flight = Some(InFlight { token, rx });
                        self.events.push(ClockEvent::VerdictPending);
                    }
                    None => {
                        log::warn!("Verdict receiver without a pending step at {}", now_ms);
                    }
                }
                false
            }
        }
    }

    fn poll_verdict(&mut self, now_ms: u64) {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return;
        };
        let verdict = match in_flight.rx.try_recv() {
            Ok(result) => Verdict::from_reply(result),
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Closed) => Verdict::from_reply(Err(ServiceError::ChannelClosed)),
        };
        let token = in_flight.token;
        self.in_flight = None;

        if let Some(outcome) = resolve_verdict(&mut self.session, token, verdict, now_ms) {
            // Time spent waiting is not owed as steps
            self.last_step_ms = now_ms;
            self.handle_outcome(outcome, now_ms);
        }
    }

    fn fire_timers(&mut self, now_ms: u64) {
        let generation = self.session.generation;
        for kind in self.session.timers.take_due(now_ms, generation) {
            match kind {
                TimerKind::SlowMotionEnd => {
                    if self.session.slow_motion {
                        self.session.slow_motion = false;
                        self.events.push(ClockEvent::SlowMotionEnded);
                    }
                }
                TimerKind::SplashEnd => self.finish_death(now_ms),
            }
        }
    }

    fn finish_death(&mut self, now_ms: u64) {
        if !self.session.death.finish_splash() {
            return;
        }
        self.session.phase = GamePhase::AwaitingRestart;
        self.session.input.set_enabled(true);
        let level = self.session.level;
        let elapsed_ms = self.session.elapsed_ms(now_ms);
        log::info!("Run over at level {} after {} ms", level, elapsed_ms);

        if self.session.config.practice_mode {
            log::debug!("Practice run, not reported");
        } else if let Some(sink) = &self.leaderboard {
            let entry = LeaderboardEntry::new(
                self.player_name.clone(),
                level,
                elapsed_ms,
                self.session.bank.folder.clone(),
            );
            sink.submit(&entry);
        }
        self.events.push(ClockEvent::Restartable { level, elapsed_ms });
    }
}
