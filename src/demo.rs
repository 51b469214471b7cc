//! Demo autopilot
//!
//! Plays a session through the same input path a player uses. It picks a goal
//! target per question (the correct one when the answer is known, otherwise a
//! random one) and steers greedily toward it, refusing moves into walls, the
//! body or any other target.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::manhattan;
use crate::sim::collision::{check_collision, occupied_after_move};
use crate::sim::{Direction, GameSession, GridPos, QuestionToken};

#[derive(Debug, Clone)]
pub struct Autopilot {
    rng: Pcg32,
    /// Chance of deliberately going for a wrong answer
    mistake_rate: f32,
    goal: Option<(QuestionToken, usize)>,
}

impl Autopilot {
    pub fn new(seed: u64, mistake_rate: f32) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            mistake_rate: mistake_rate.clamp(0.0, 1.0),
            goal: None,
        }
    }

    /// Target index the autopilot is heading for
    pub fn goal(&mut self, session: &GameSession) -> Option<usize> {
        let token = session.question_token()?;
        if session.targets.is_empty() {
            return None;
        }
        if let Some((goal_token, index)) = self.goal {
            if goal_token == token && index < session.targets.len() {
                return Some(index);
            }
        }

        let correct = session.targets.iter().position(|t| t.correct == Some(true));
        let index = match correct {
            Some(correct)
                if session.targets.len() < 2 || self.rng.random::<f32>() >= self.mistake_rate =>
            {
                correct
            }
            Some(correct) => {
                // Any other target
                let offset = self.rng.random_range(1..session.targets.len());
                (correct + offset) % session.targets.len()
            }
            None => self.rng.random_range(0..session.targets.len()),
        };
        log::debug!(
            "Autopilot heading for {} at {:?}",
            session.targets[index].label,
            session.targets[index].pos
        );
        self.goal = Some((token, index));
        Some(index)
    }

    /// Direction to feed this pump, or `None` when the current course is fine
    /// or a turn is already queued
    pub fn next_direction(&mut self, session: &GameSession) -> Option<Direction> {
        if !session.is_running() {
            return None;
        }
        let input = &session.input;
        let awaiting = input.is_awaiting_initial_move();
        if !awaiting && input.primary_next() != input.current() {
            return None;
        }

        let goal_index = self.goal(session)?;
        let goal = session.targets[goal_index].pos;
        let head = session.head();

        let heading = if awaiting {
            Direction::between(session.snake[1], head)
        } else {
            input.current()
        };

        let best = Direction::ALL
            .into_iter()
            .filter(|&dir| dir != heading.opposite())
            .filter(|&dir| is_safe(session, head.step(dir), goal_index))
            .min_by_key(|&dir| (manhattan(head.step(dir), goal), dir != heading))?;

        if awaiting || best != heading {
            Some(best)
        } else {
            None
        }
    }
}

fn is_safe(session: &GameSession, cell: GridPos, goal_index: usize) -> bool {
    let hit = session.target_at(cell);
    if hit.is_some_and(|i| i != goal_index) {
        return false;
    }
    let body = occupied_after_move(&session.snake, hit.is_some());
    check_collision(&session.config.grid, cell, body).is_none()
}
