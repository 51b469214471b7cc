//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time is passed in, never read from a clock
//! - Seeded RNG only
//! - No rendering, network or platform dependencies

pub mod collision;
pub mod explosion;
pub mod grid;
pub mod input;
pub mod placement;
pub mod progression;
pub mod state;
pub mod tick;
pub mod timers;

pub use collision::{Collision, check_collision};
pub use explosion::{DeathCause, DeathSequencer, DeathState, Explosion, ExplosionParticle};
pub use grid::{Direction, Grid, GridPos, initial_snake};
pub use input::{InputBuffer, InputOutcome};
pub use placement::{Placement, PlacementRules, TARGET_COUNT, place_targets};
pub use progression::LevelProgressionTracker;
pub use state::{Color, GamePhase, GameSession, QuestionToken, SessionConfig, Target};
pub use tick::{TickOutcome, resolve_verdict, step_delay, tick};
pub use timers::{TimerKind, Timers};
