//! Tuna Quiz - A grid snake arcade quiz game
//!
//! Core modules:
//! - `sim`: Tick-based simulation (movement, input buffering, placement, death sequence)
//! - `clock`: Fixed-cadence logic loop and render loop over one owned session
//! - `oracle`: Local or remote verdict on whether an eaten target was correct
//! - `services`: HTTP collaborators (questions, answer checks, level unlocks)
//! - `leaderboard`: Score ranking and the leaderboard sink
//! - `settings`: Configuration with JSON and environment overrides
//! - `demo`: Autopilot used by the headless binary

pub mod clock;
pub mod demo;
pub mod error;
pub mod leaderboard;
pub mod oracle;
pub mod questions;
pub mod services;
pub mod settings;
pub mod sim;

pub use clock::{ClockEvent, SimulationClock, Snapshot};
pub use error::{ConfigError, ServiceError};
pub use leaderboard::{Leaderboard, LeaderboardEntry, LeaderboardSink};
pub use oracle::{CorrectnessOracle, LocalOracle, RemoteOracle, TrustMode};
pub use questions::{OptionLabel, Question, QuestionBank};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Cell edge in pixels
    pub const CELL_SIZE: i32 = 24;
    /// Board size in pixels
    pub const BOARD_WIDTH_PX: i32 = 900;
    pub const BOARD_HEIGHT_PX: i32 = 700;
    /// Pixel band at the top reserved for the question panel
    pub const RESERVED_TOP_PX: i32 = 100;

    /// Grid dimensions derived from the board
    pub const GRID_WIDTH: i32 = BOARD_WIDTH_PX / CELL_SIZE;
    pub const GRID_HEIGHT: i32 = BOARD_HEIGHT_PX / CELL_SIZE;
    pub const RESERVED_ROWS: i32 = (RESERVED_TOP_PX + CELL_SIZE - 1) / CELL_SIZE;

    /// Step delay at level 0 (ms)
    pub const START_STEP_DELAY_MS: u64 = 180;
    /// Fastest step delay (ms)
    pub const MIN_STEP_DELAY_MS: u64 = 105;
    /// Flat step delay inside the slow-motion window (ms)
    pub const SLOW_STEP_DELAY_MS: u64 = 340;
    /// Slow-motion window after every correct answer (ms)
    pub const SLOW_MOTION_MS: u64 = 2000;
    /// Extra delay added to every step in practice mode (ms)
    pub const PRACTICE_STEP_OFFSET_MS: u64 = 60;

    /// Logic loop cadence (~60 Hz scheduling granularity)
    pub const LOGIC_INTERVAL_MS: u64 = 16;
    /// Wall-clock delay from death to restartable state (ms)
    pub const SPLASH_DELAY_MS: u64 = 1100;

    /// Explosion animation frame (60 Hz)
    pub const EXPLOSION_FRAME_SECS: f32 = 1.0 / 60.0;
    /// Maximum animation frames per render call to prevent spiral of death
    pub const MAX_EXPLOSION_SUBSTEPS: u32 = 8;
    /// Alpha lost per animation frame
    pub const EXPLOSION_ALPHA_DECAY: f32 = 0.027;
    /// Particles at or below this alpha are gone
    pub const EXPLOSION_ALPHA_EPSILON: f32 = 0.02;
    /// Velocity multiplier per frame
    pub const EXPLOSION_DRAG: f32 = 0.985;
    /// Particle trail cap
    pub const EXPLOSION_TRAIL_LENGTH: usize = 12;
    /// Particle launch speed range (px per frame)
    pub const EXPLOSION_MIN_SPEED: f32 = 7.0;
    pub const EXPLOSION_MAX_SPEED: f32 = 15.0;
}

/// Manhattan distance between two grid cells
#[inline]
pub fn manhattan(a: sim::GridPos, b: sim::GridPos) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}
