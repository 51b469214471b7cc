//! Movement engine: one snake step per call
//!
//! The step is applied in a fixed order: take the buffered direction, compute
//! the new head, check walls and body, then either translate, or ask the oracle
//! about the eaten target before committing growth. Nothing is committed while
//! a remote verdict is in flight.

use super::collision::{Collision, check_collision, occupied_after_move};
use super::explosion::DeathCause;
use super::state::{GamePhase, GameSession, PendingStep, QuestionToken};
use super::timers::TimerKind;
use crate::consts::*;
use crate::oracle::{CorrectnessOracle, Verdict, VerdictReceiver, VerdictRequest, VerdictTicket};

/// Result of one step
#[derive(Debug)]
pub enum TickOutcome {
    /// No direction yet, or not running
    Idle,
    /// Plain translation
    Moved,
    /// Correct answer eaten
    Grew {
        level: u32,
        /// First time this run the next-level threshold was reached
        eligible: bool,
    },
    /// Fatal move; the session is now exploding
    Died(DeathCause),
    /// Target eaten, remote verdict pending; caller polls the receiver
    AwaitingVerdict(VerdictReceiver),
}

/// Delay between steps at `level`
pub fn step_delay(level: u32, slow_motion: bool, practice: bool) -> u64 {
    let base = if slow_motion {
        SLOW_STEP_DELAY_MS
    } else {
        START_STEP_DELAY_MS
            .saturating_sub(2 * level as u64)
            .max(MIN_STEP_DELAY_MS)
    };
    if practice {
        base + PRACTICE_STEP_OFFSET_MS
    } else {
        base
    }
}

/// Current step delay for a session
pub fn session_step_delay(session: &GameSession) -> u64 {
    step_delay(
        session.level,
        session.slow_motion,
        session.config.practice_mode,
    )
}

/// Advance the snake one cell
pub fn tick(session: &mut GameSession, oracle: &dyn CorrectnessOracle, now_ms: u64) -> TickOutcome {
    if session.phase != GamePhase::Alive || session.pending.is_some() {
        return TickOutcome::Idle;
    }

    let dir = session.input.begin_tick();
    if dir.is_idle() {
        return TickOutcome::Idle;
    }

    let new_head = session.head().step(dir);
    let target_index = session.target_at(new_head);
    let grows = target_index.is_some();

    let body = occupied_after_move(&session.snake, grows);
    if let Some(collision) = check_collision(&session.config.grid, new_head, body) {
        let cause = match collision {
            Collision::Wall => DeathCause::Wall,
            Collision::SelfHit { .. } => DeathCause::SelfHit,
        };
        die(session, cause, now_ms);
        return TickOutcome::Died(cause);
    }

    let Some(target_index) = target_index else {
        session.snake.insert(0, new_head);
        session.snake.pop();
        session.input.after_advance();
        return TickOutcome::Moved;
    };

    let Some(token) = session.question_token() else {
        // Targets without a question cannot be judged
        let cause = DeathCause::VerdictFailed {
            selected: session.targets[target_index].label,
        };
        die(session, cause, now_ms);
        return TickOutcome::Died(cause);
    };

    let target = &session.targets[target_index];
    let step = PendingStep {
        new_head,
        target_index,
        label: target.label,
        token,
    };
    let request = VerdictRequest {
        folder: session.bank.folder.clone(),
        question_index: token.index,
        selected: target.label,
        precomputed: target.correct,
        known_answer: session.current_question().and_then(|q| q.answer),
    };

    match oracle.check(request) {
        VerdictTicket::Ready(verdict) => commit(session, step, verdict, now_ms),
        VerdictTicket::Pending(rx) => {
            log::debug!(
                "Waiting for verdict on question {} (label {})",
                token.index,
                step.label
            );
            session.pending = Some(step);
            TickOutcome::AwaitingVerdict(rx)
        }
    }
}

/// Apply a verdict that arrived for `token`. Returns `None` when the reply is
/// stale (session restarted or the question changed) and was dropped.
pub fn resolve_verdict(
    session: &mut GameSession,
    token: QuestionToken,
    verdict: Verdict,
    now_ms: u64,
) -> Option<TickOutcome> {
    let Some(step) = session.pending else {
        log::debug!("Dropping verdict for {:?}: nothing pending", token);
        return None;
    };
    if step.token != token || session.question_token() != Some(token) {
        log::debug!(
            "Dropping stale verdict for {:?} (pending {:?})",
            token,
            step.token
        );
        return None;
    }
    session.pending = None;
    Some(commit(session, step, verdict, now_ms))
}

fn commit(session: &mut GameSession, step: PendingStep, verdict: Verdict, now_ms: u64) -> TickOutcome {
    match verdict {
        Verdict::Correct => {
            session.snake.insert(0, step.new_head);
            session.input.after_advance();
            session.level += 1;

            let mut eligible = false;
            if !session.config.practice_mode && session.progression.record_correct(step.token.index) {
                session.eligible_for_next_level = true;
                eligible = true;
            }
            session.next_question();

            session.slow_motion = true;
            session.timers.schedule(
                TimerKind::SlowMotionEnd,
                now_ms + SLOW_MOTION_MS,
                session.generation,
            );
            log::info!(
                "Correct answer {} -> level {} (length {})",
                step.label,
                session.level,
                session.snake.len()
            );
            TickOutcome::Grew {
                level: session.level,
                eligible,
            }
        }
        Verdict::Incorrect { correct_answer } => {
            let cause = DeathCause::WrongAnswer {
                selected: step.label,
                correct_answer,
            };
            die(session, cause, now_ms);
            TickOutcome::Died(cause)
        }
        Verdict::Failed => {
            let cause = DeathCause::VerdictFailed {
                selected: step.label,
            };
            die(session, cause, now_ms);
            TickOutcome::Died(cause)
        }
    }
}

/// Freeze the run and start the death sequence
fn die(session: &mut GameSession, cause: DeathCause, now_ms: u64) {
    session.pending = None;
    session.phase = GamePhase::Exploding;
    session.ended_at_ms = Some(now_ms);
    session.slow_motion = false;
    session.input.set_enabled(false);
    session.timers.cancel(TimerKind::SlowMotionEnd);
    session.death.enter(
        cause,
        &session.snake,
        session.config.grid.cell_size,
        session.generation,
        now_ms,
        &mut session.rng,
    );
    session
        .timers
        .schedule(TimerKind::SplashEnd, now_ms + SPLASH_DELAY_MS, session.generation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{LocalOracle, TrustMode};
    use crate::questions::QuestionBank;
    use crate::sim::grid::{Direction, GridPos};
    use crate::sim::state::SessionConfig;

    /// Local oracle that answers whatever the test says
    struct Fixed(Verdict);

    impl CorrectnessOracle for Fixed {
        fn mode(&self) -> TrustMode {
            TrustMode::Local
        }

        fn check(&self, _request: VerdictRequest) -> VerdictTicket {
            VerdictTicket::Ready(self.0)
        }
    }

    fn running() -> GameSession {
        let mut session = GameSession::new(SessionConfig::default(), QuestionBank::builtin(), 7);
        session.reset_run();
        session.input.push(Direction::Right);
        session
    }

    /// Put target `index` directly in front of the head
    fn target_ahead(session: &mut GameSession, index: usize) {
        let ahead = session.head().step(Direction::Right);
        session.targets[index].pos = ahead;
    }

    #[test]
    fn test_step_delay_values() {
        assert_eq!(step_delay(1, false, false), 178);
        assert_eq!(step_delay(50, false, false), 105);
        assert_eq!(step_delay(1, true, false), SLOW_STEP_DELAY_MS);
        assert_eq!(step_delay(1, false, true), 238);
        assert_eq!(step_delay(1, true, true), SLOW_STEP_DELAY_MS + PRACTICE_STEP_OFFSET_MS);
    }

    #[test]
    fn test_step_delay_monotone() {
        let mut last = u64::MAX;
        for level in 0..200 {
            let d = step_delay(level, false, false);
            assert!(d <= last);
            assert!(d >= MIN_STEP_DELAY_MS);
            last = d;
        }
    }

    #[test]
    fn test_idle_before_first_key() {
        let mut session = GameSession::new(SessionConfig::default(), QuestionBank::builtin(), 7);
        session.reset_run();
        let before = session.snake.clone();
        assert!(matches!(tick(&mut session, &LocalOracle, 0), TickOutcome::Idle));
        assert_eq!(session.snake, before);
    }

    #[test]
    fn test_translation_keeps_length() {
        let mut session = running();
        // Move targets out of the way
        for (i, t) in session.targets.iter_mut().enumerate() {
            t.pos = GridPos::new(30, 20 + i as i32);
        }
        let head = session.head();
        assert!(matches!(tick(&mut session, &LocalOracle, 0), TickOutcome::Moved));
        assert_eq!(session.snake.len(), 3);
        assert_eq!(session.head(), head.step(Direction::Right));
    }

    #[test]
    fn test_correct_answer_grows() {
        let mut session = running();
        target_ahead(&mut session, 0);
        let old_token = session.question_token();
        let outcome = tick(&mut session, &Fixed(Verdict::Correct), 500);
        assert!(matches!(outcome, TickOutcome::Grew { level: 2, .. }));
        assert_eq!(session.snake.len(), 4);
        assert_eq!(session.targets.len(), 4);
        assert_ne!(session.question_token(), old_token);
        assert!(session.slow_motion);
        assert!(session.timers.is_scheduled(TimerKind::SlowMotionEnd));
        for t in &session.targets {
            assert!(!session.snake.contains(&t.pos));
        }
        if !session.placement_relaxed {
            let rules = session.config.placement;
            let head = session.head();
            for (i, a) in session.targets.iter().enumerate() {
                assert!(crate::manhattan(a.pos, head) >= rules.min_head_distance);
                for b in &session.targets[i + 1..] {
                    assert!(crate::manhattan(a.pos, b.pos) >= rules.min_target_distance);
                }
            }
        }
    }

    #[test]
    fn test_wrong_answer_explodes_same_tick() {
        let mut session = running();
        target_ahead(&mut session, 2);
        let wrong = Verdict::Incorrect {
            correct_answer: Some(crate::OptionLabel::B),
        };
        let outcome = tick(&mut session, &Fixed(wrong), 800);
        assert!(matches!(
            outcome,
            TickOutcome::Died(DeathCause::WrongAnswer { .. })
        ));
        assert_eq!(session.phase, GamePhase::Exploding);
        assert_eq!(session.level, 1);
        // Prepended head discarded
        assert_eq!(session.snake.len(), 3);
        assert!(!session.input.is_enabled());
        assert!(session.timers.is_scheduled(TimerKind::SplashEnd));
        assert_eq!(session.ended_at_ms, Some(800));
    }

    #[test]
    fn test_wall_collision_wins() {
        let mut session = running();
        session.snake = vec![GridPos::new(36, 8), GridPos::new(35, 8), GridPos::new(34, 8)];
        let outcome = tick(&mut session, &LocalOracle, 0);
        assert!(matches!(outcome, TickOutcome::Died(DeathCause::Wall)));
        assert_eq!(session.level, 1);
    }

    #[test]
    fn test_failed_verdict_is_fatal() {
        let mut session = running();
        target_ahead(&mut session, 1);
        let outcome = tick(&mut session, &Fixed(Verdict::Failed), 0);
        assert!(matches!(
            outcome,
            TickOutcome::Died(DeathCause::VerdictFailed { .. })
        ));
    }

    #[test]
    fn test_practice_never_eligible() {
        let config = SessionConfig {
            practice_mode: true,
            ..Default::default()
        };
        let mut session = GameSession::new(config, QuestionBank::builtin(), 7);
        session.reset_run();
        session.input.push(Direction::Right);
        for _ in 0..3 {
            target_ahead(&mut session, 0);
            let outcome = tick(&mut session, &Fixed(Verdict::Correct), 0);
            assert!(matches!(outcome, TickOutcome::Grew { eligible: false, .. }));
        }
        assert!(!session.eligible_for_next_level);
    }

    #[test]
    fn test_stale_verdict_dropped() {
        let mut session = running();
        let token = session.question_token().unwrap();
        session.pending = Some(PendingStep {
            new_head: session.head().step(Direction::Right),
            target_index: 0,
            label: crate::OptionLabel::A,
            token,
        });
        session.reset_run();
        assert!(resolve_verdict(&mut session, token, Verdict::Correct, 10).is_none());
        assert_eq!(session.level, 1);
    }
}
