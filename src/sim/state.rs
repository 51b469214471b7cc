//! Session state and core simulation types
//!
//! A `GameSession` exclusively owns the snake, the active targets, the death
//! sequence (and its particles), the question reservoir and the timers. The
//! input buffer's direction slots live here too but are only written by
//! `InputBuffer` itself.

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::explosion::DeathSequencer;
use super::grid::{Direction, Grid, GridPos, initial_snake};
use super::input::InputBuffer;
use super::placement::{PlacementRules, place_targets};
use super::progression::LevelProgressionTracker;
use super::timers::Timers;
use crate::oracle::TrustMode;
use crate::questions::{OptionLabel, Question, QuestionBank};

/// Cosmetic colour for targets and particles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    Hsl { h: u16, s: u8, l: u8 },
    Rgb(u32),
}

impl Color {
    /// Vivid target colour: any hue, fixed saturation and lightness
    pub fn random_bright<R: Rng>(rng: &mut R) -> Self {
        Color::Hsl {
            h: rng.random_range(0..360),
            s: 85,
            l: 65,
        }
    }

    /// Particle colour, skipping the blue band the board background uses
    pub fn random_particle<R: Rng>(rng: &mut R) -> Self {
        let h = loop {
            let h = rng.random_range(0..360u16);
            if !(210..=270).contains(&h) {
                break h;
            }
        };
        Color::Hsl {
            h,
            s: rng.random_range(70..90),
            l: rng.random_range(65..83),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Hsl { h, s, l } => write!(f, "hsl({},{}%,{}%)", h, s, l),
            Color::Rgb(rgb) => write!(f, "#{:06x}", rgb),
        }
    }
}

/// A consumable answer cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub pos: GridPos,
    pub label: OptionLabel,
    pub color: Color,
    /// Known only in local trust mode
    pub correct: Option<bool>,
}

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Never started; waiting for `start()`
    Idle,
    /// Running (including waiting for the first move)
    Alive,
    /// Death animation playing; input ignored
    Exploding,
    /// Death splash done; `start()` begins a new run
    AwaitingRestart,
}

/// Static session parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub grid: Grid,
    pub placement: PlacementRules,
    pub trust_mode: TrustMode,
    pub practice_mode: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grid: Grid::default(),
            placement: PlacementRules::default(),
            trust_mode: TrustMode::Local,
            practice_mode: false,
        }
    }
}

/// Identifies the question a verdict was requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionToken {
    pub generation: u64,
    /// Increments on every draw, so a repeated index still differs
    pub serial: u64,
    pub index: usize,
}

/// A step waiting on a remote verdict (nothing committed yet)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingStep {
    pub new_head: GridPos,
    pub target_index: usize,
    pub label: OptionLabel,
    pub token: QuestionToken,
}

/// Complete state of one game session
#[derive(Debug, Clone)]
pub struct GameSession {
    pub config: SessionConfig,
    pub bank: QuestionBank,
    /// Head first
    pub snake: Vec<GridPos>,
    pub targets: Vec<Target>,
    pub input: InputBuffer,
    pub death: DeathSequencer,
    pub progression: LevelProgressionTracker,
    pub timers: Timers,
    pub phase: GamePhase,
    pub level: u32,
    /// Index into `bank` of the question on the board
    pub question_index: Option<usize>,
    question_serial: u64,
    /// Bumped on every `start()`; stale callbacks compare against it
    pub generation: u64,
    /// Session clock anchor (first accepted key), ms
    pub started_at_ms: Option<u64>,
    /// Frozen end of the run, ms
    pub ended_at_ms: Option<u64>,
    pub slow_motion: bool,
    pub pending: Option<PendingStep>,
    /// Last placement needed the relaxed fallback
    pub placement_relaxed: bool,
    pub eligible_for_next_level: bool,
    pub rng: Pcg32,
}

impl GameSession {
    /// Create an idle session; call `reset_run` to begin play
    pub fn new(config: SessionConfig, bank: QuestionBank, seed: u64) -> Self {
        let snake = initial_snake();
        let orientation = Direction::between(snake[1], snake[0]);
        let total = bank.len();
        Self {
            config,
            bank,
            snake,
            targets: Vec::new(),
            input: InputBuffer::new(orientation),
            death: DeathSequencer::default(),
            progression: LevelProgressionTracker::new(total),
            timers: Timers::default(),
            phase: GamePhase::Idle,
            level: 1,
            question_index: None,
            question_serial: 0,
            generation: 0,
            started_at_ms: None,
            ended_at_ms: None,
            slow_motion: false,
            pending: None,
            placement_relaxed: false,
            eligible_for_next_level: false,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Reset to the canonical starting layout and present the first question.
    /// Any explosion, timer or pending verdict of the previous run is dropped.
    pub fn reset_run(&mut self) {
        self.generation += 1;
        self.snake = initial_snake();
        let orientation = Direction::between(self.snake[1], self.snake[0]);
        self.input.reset(orientation);
        self.death.reset();
        self.timers.clear();
        self.progression.reset();
        self.phase = GamePhase::Alive;
        self.level = 1;
        self.started_at_ms = None;
        self.ended_at_ms = None;
        self.slow_motion = false;
        self.pending = None;
        self.eligible_for_next_level = false;
        self.question_index = None;
        self.next_question();
    }

    pub fn head(&self) -> GridPos {
        self.snake[0]
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.question_index.and_then(|i| self.bank.get(i))
    }

    /// Token for the question currently on the board
    pub fn question_token(&self) -> Option<QuestionToken> {
        self.question_index.map(|index| QuestionToken {
            generation: self.generation,
            serial: self.question_serial,
            index,
        })
    }

    /// Draw the next question and lay out its four targets against the
    /// current snake
    pub fn next_question(&mut self) {
        self.question_index = self.progression.draw(&mut self.rng);
        self.question_serial += 1;
        self.regenerate_targets();
    }

    pub fn regenerate_targets(&mut self) {
        self.targets.clear();
        let Some(question) = self.question_index.and_then(|i| self.bank.get(i)).cloned() else {
            log::warn!("No question available for folder '{}'", self.bank.folder);
            return;
        };
        let placement = place_targets(
            &self.config.grid,
            &self.snake,
            &self.config.placement,
            &mut self.rng,
        );
        self.placement_relaxed = placement.relaxed;
        let local = self.config.trust_mode == TrustMode::Local;
        for (label, pos) in OptionLabel::ALL.into_iter().zip(placement.cells) {
            let color = Color::random_bright(&mut self.rng);
            self.targets.push(Target {
                pos,
                label,
                color,
                correct: if local { question.is_correct(label) } else { None },
            });
        }
    }

    pub fn target_at(&self, pos: GridPos) -> Option<usize> {
        self.targets.iter().position(|t| t.pos == pos)
    }

    pub fn is_running(&self) -> bool {
        self.phase == GamePhase::Alive
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, GamePhase::Exploding | GamePhase::AwaitingRestart)
    }

    /// Run time in ms: zero before the first move, frozen after death
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        match self.started_at_ms {
            Some(start) => self.ended_at_ms.unwrap_or(now_ms).saturating_sub(start),
            None => 0,
        }
    }
}
