//! Death sequence: Alive -> Exploding -> AwaitingRestart
//!
//! On a fatal outcome every snake segment is turned into a particle flung
//! outward. The particles are animated by the render loop (not the logic loop)
//! and fade out on their own; the move to `AwaitingRestart` happens on a
//! wall-clock timer regardless of how far the fade got.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::grid::GridPos;
use super::state::Color;
use crate::consts::*;
use crate::questions::OptionLabel;

/// Phase of the death state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeathState {
    #[default]
    Alive,
    Exploding,
    AwaitingRestart,
}

/// Why the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Wall,
    SelfHit,
    /// The oracle said no; `correct_answer` when it told us
    WrongAnswer {
        selected: OptionLabel,
        correct_answer: Option<OptionLabel>,
    },
    /// The oracle could not be reached or replied with garbage
    VerdictFailed { selected: OptionLabel },
}

/// Head particle colour
pub const HEAD_PARTICLE_COLOR: Color = Color::Rgb(0xfff200);

/// One trail sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrailPoint {
    pub pos: Vec2,
    pub alpha: f32,
}

/// A flying snake segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplosionParticle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub alpha: f32,
    pub color: Color,
    pub is_head: bool,
    /// Oldest first, capped at [`EXPLOSION_TRAIL_LENGTH`]
    pub trail: VecDeque<TrailPoint>,
}

impl ExplosionParticle {
    fn new(pos: Vec2, vel: Vec2, color: Color, is_head: bool) -> Self {
        let mut trail = VecDeque::with_capacity(EXPLOSION_TRAIL_LENGTH);
        trail.push_back(TrailPoint { pos, alpha: 1.0 });
        Self {
            pos,
            vel,
            alpha: 1.0,
            color,
            is_head,
            trail,
        }
    }

    /// Advance one animation frame
    fn step(&mut self) {
        self.pos += self.vel;
        self.vel *= EXPLOSION_DRAG;
        self.alpha = (self.alpha - EXPLOSION_ALPHA_DECAY).max(0.0);
        self.record_trail();
    }

    fn record_trail(&mut self) {
        self.trail.push_back(TrailPoint {
            pos: self.pos,
            alpha: self.alpha,
        });
        while self.trail.len() > EXPLOSION_TRAIL_LENGTH {
            self.trail.pop_front();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.alpha > EXPLOSION_ALPHA_EPSILON
    }
}

/// Frames for a fresh particle to fade below epsilon
fn frames_to_fade() -> u32 {
    ((1.0 - EXPLOSION_ALPHA_EPSILON) / EXPLOSION_ALPHA_DECAY).ceil() as u32
}

/// A running explosion animation, tied to the session that spawned it
#[derive(Debug, Clone)]
pub struct Explosion {
    pub generation: u64,
    pub started_at_ms: u64,
    pub particles: Vec<ExplosionParticle>,
    accumulator: f32,
    last_frame_ms: u64,
    frames: u32,
}

impl Explosion {
    pub fn new<R: Rng>(
        segments: &[GridPos],
        cell_size: i32,
        generation: u64,
        now_ms: u64,
        rng: &mut R,
    ) -> Self {
        let particles = segments
            .iter()
            .enumerate()
            .map(|(i, seg)| {
                let angle = rng.random::<f32>() * std::f32::consts::TAU;
                let speed = rng.random_range(EXPLOSION_MIN_SPEED..EXPLOSION_MAX_SPEED);
                let vel = Vec2::new(angle.cos(), angle.sin()) * speed;
                let is_head = i == 0;
                let color = if is_head {
                    HEAD_PARTICLE_COLOR
                } else {
                    Color::random_particle(rng)
                };
                ExplosionParticle::new(seg.to_pixels(cell_size), vel, color, is_head)
            })
            .collect();

        Self {
            generation,
            started_at_ms: now_ms,
            particles,
            accumulator: 0.0,
            last_frame_ms: now_ms,
            frames: 0,
        }
    }

    /// Run the fixed-rate animation frames owed up to `now_ms`
    pub fn animate(&mut self, now_ms: u64) {
        let dt = (now_ms.saturating_sub(self.last_frame_ms) as f32 / 1000.0).min(0.1);
        self.last_frame_ms = now_ms.max(self.last_frame_ms);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= EXPLOSION_FRAME_SECS
            && substeps < MAX_EXPLOSION_SUBSTEPS
            && !self.is_finished()
        {
            self.step_frame();
            self.accumulator -= EXPLOSION_FRAME_SECS;
            substeps += 1;
        }
        if self.is_finished() {
            self.accumulator = 0.0;
        }
    }

    /// One animation frame; faded particles are destroyed
    pub fn step_frame(&mut self) {
        for particle in &mut self.particles {
            particle.step();
        }
        self.particles.retain(ExplosionParticle::is_visible);
        self.frames += 1;
    }

    pub fn is_finished(&self) -> bool {
        self.particles.is_empty()
    }

    /// Fade progress in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.is_finished() {
            return 1.0;
        }
        (self.frames as f32 / frames_to_fade() as f32).min(1.0)
    }
}

/// Drives the death state machine for one session
#[derive(Debug, Clone, Default)]
pub struct DeathSequencer {
    state: DeathState,
    cause: Option<DeathCause>,
    explosion: Option<Explosion>,
    last_progress: f32,
}

impl DeathSequencer {
    pub fn state(&self) -> DeathState {
        self.state
    }

    pub fn cause(&self) -> Option<DeathCause> {
        self.cause
    }

    pub fn explosion(&self) -> Option<&Explosion> {
        self.explosion.as_ref()
    }

    pub fn is_alive(&self) -> bool {
        self.state == DeathState::Alive
    }

    /// Alive -> Exploding. Ignored unless currently alive.
    pub fn enter<R: Rng>(
        &mut self,
        cause: DeathCause,
        segments: &[GridPos],
        cell_size: i32,
        generation: u64,
        now_ms: u64,
        rng: &mut R,
    ) -> bool {
        if self.state != DeathState::Alive {
            return false;
        }
        log::info!("Run ended: {:?} ({} segments)", cause, segments.len());
        self.state = DeathState::Exploding;
        self.cause = Some(cause);
        self.last_progress = 0.0;
        self.explosion = Some(Explosion::new(segments, cell_size, generation, now_ms, rng));
        true
    }

    /// Render-loop hook: advance the explosion owned by `generation`.
    /// An explosion left over from another session is dropped.
    pub fn animate(&mut self, now_ms: u64, generation: u64) {
        let Some(explosion) = self.explosion.as_mut() else {
            return;
        };
        if explosion.generation != generation {
            log::debug!(
                "Dropping explosion from generation {} (now {})",
                explosion.generation,
                generation
            );
            self.explosion = None;
            return;
        }
        explosion.animate(now_ms);
        self.last_progress = explosion.progress();
        if explosion.is_finished() {
            self.explosion = None;
        }
    }

    /// Exploding -> AwaitingRestart (splash timer fired)
    pub fn finish_splash(&mut self) -> bool {
        if self.state != DeathState::Exploding {
            return false;
        }
        self.state = DeathState::AwaitingRestart;
        true
    }

    /// Last explosion progress for the renderer
    pub fn progress(&self) -> f32 {
        match self.state {
            DeathState::Alive => 0.0,
            _ => self.last_progress,
        }
    }

    /// Back to Alive, cancelling any running animation
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::grid::initial_snake;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn exploding() -> DeathSequencer {
        let mut rng = Pcg32::seed_from_u64(11);
        let mut seq = DeathSequencer::default();
        assert!(seq.enter(DeathCause::Wall, &initial_snake(), CELL_SIZE, 1, 0, &mut rng));
        seq
    }

    #[test]
    fn test_enter_snapshots_every_segment() {
        let seq = exploding();
        assert_eq!(seq.state(), DeathState::Exploding);
        let explosion = seq.explosion().unwrap();
        assert_eq!(explosion.particles.len(), 3);
        assert!(explosion.particles[0].is_head);
        assert_eq!(explosion.particles[0].color, HEAD_PARTICLE_COLOR);
        assert!(explosion.particles[1..].iter().all(|p| !p.is_head));
        assert_eq!(explosion.particles[0].pos, Vec2::new(96.0, 192.0));
    }

    #[test]
    fn test_enter_only_from_alive() {
        let mut seq = exploding();
        let mut rng = Pcg32::seed_from_u64(0);
        assert!(!seq.enter(DeathCause::SelfHit, &initial_snake(), CELL_SIZE, 1, 5, &mut rng));
        assert_eq!(seq.cause(), Some(DeathCause::Wall));
    }

    #[test]
    fn test_particles_fade_and_loop_terminates() {
        let mut seq = exploding();
        let mut now = 0;
        for _ in 0..200 {
            now += 16;
            seq.animate(now, 1);
        }
        assert!(seq.explosion().is_none());
        assert_eq!(seq.progress(), 1.0);
        // Timer has not fired: still exploding
        assert_eq!(seq.state(), DeathState::Exploding);
    }

    #[test]
    fn test_trail_is_bounded() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut explosion = Explosion::new(&initial_snake(), CELL_SIZE, 1, 0, &mut rng);
        for _ in 0..30 {
            explosion.step_frame();
        }
        for p in &explosion.particles {
            assert_eq!(p.trail.len(), EXPLOSION_TRAIL_LENGTH);
            assert!(p.alpha < 1.0);
        }
    }

    #[test]
    fn test_stale_explosion_dropped() {
        let mut seq = exploding();
        seq.animate(16, 2);
        assert!(seq.explosion().is_none());
    }

    #[test]
    fn test_splash_then_reset() {
        let mut seq = exploding();
        assert!(seq.finish_splash());
        assert_eq!(seq.state(), DeathState::AwaitingRestart);
        assert!(!seq.finish_splash());
        seq.reset();
        assert!(seq.is_alive());
        assert!(seq.explosion().is_none());
        assert_eq!(seq.progress(), 0.0);
    }
}
