//! Two-stage directional input buffer
//!
//! Key events are staged into at most two turns: `primary_next` (applied on the
//! next tick) and `pending_next` (promoted after that tick advances the snake).
//! Neither slot can ever hold the reverse of the direction it will follow, so
//! the snake cannot fold back onto itself no matter how fast keys arrive.

use super::grid::Direction;

/// What the buffer did with a key event (diagnostic only, never an error)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// First accepted key of the session: motion starts on the next tick
    Started,
    /// Became the turn applied on the next tick
    Queued,
    /// Stored as the follow-up turn after the queued one
    Pending,
    /// Dropped (reversal, duplicate, disabled or waiting for the first tick)
    Rejected,
}

/// Where the buffer is in the session's life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// No direction chosen yet
    AwaitingInitial,
    /// First direction chosen, its tick has not executed yet
    Primed,
    /// Snake is moving
    Moving,
}

#[derive(Debug, Clone)]
pub struct InputBuffer {
    current: Direction,
    primary_next: Direction,
    pending_next: Option<Direction>,
    /// Orientation inferred from the starting layout (head minus neck)
    initial_orientation: Direction,
    stage: Stage,
    enabled: bool,
}

impl InputBuffer {
    pub fn new(initial_orientation: Direction) -> Self {
        Self {
            current: Direction::Idle,
            primary_next: Direction::Idle,
            pending_next: None,
            initial_orientation,
            stage: Stage::AwaitingInitial,
            enabled: true,
        }
    }

    pub fn current(&self) -> Direction {
        self.current
    }

    pub fn primary_next(&self) -> Direction {
        self.primary_next
    }

    pub fn pending_next(&self) -> Option<Direction> {
        self.pending_next
    }

    pub fn is_awaiting_initial_move(&self) -> bool {
        self.stage != Stage::Moving
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Ignore (or stop ignoring) every key event
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Stage a key event
    pub fn push(&mut self, candidate: Direction) -> InputOutcome {
        if !self.enabled || candidate.is_idle() {
            return InputOutcome::Rejected;
        }

        match self.stage {
            Stage::AwaitingInitial => {
                if candidate == self.initial_orientation.opposite() {
                    return InputOutcome::Rejected;
                }
                self.primary_next = candidate;
                self.stage = Stage::Primed;
                InputOutcome::Started
            }
            // Only the very first key counts until its tick runs
            Stage::Primed => InputOutcome::Rejected,
            Stage::Moving => {
                if self.primary_next == self.current {
                    if candidate.is_perpendicular(self.current) {
                        self.primary_next = candidate;
                        InputOutcome::Queued
                    } else {
                        InputOutcome::Rejected
                    }
                } else if candidate != self.primary_next
                    && candidate != self.primary_next.opposite()
                {
                    self.pending_next = Some(candidate);
                    InputOutcome::Pending
                } else {
                    InputOutcome::Rejected
                }
            }
        }
    }

    /// Commit the queued turn; returns the direction this tick applies
    pub fn begin_tick(&mut self) -> Direction {
        self.current = self.primary_next;
        if !self.current.is_idle() {
            self.stage = Stage::Moving;
        }
        self.current
    }

    /// Called after a tick that actually moved the snake
    pub fn after_advance(&mut self) {
        if let Some(pending) = self.pending_next.take() {
            if pending.is_perpendicular(self.current) {
                self.primary_next = pending;
            }
        }
    }

    /// Back to the pre-game state (new session)
    pub fn reset(&mut self, initial_orientation: Direction) {
        *self = Self::new(initial_orientation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn moving_right() -> InputBuffer {
        let mut buf = InputBuffer::new(Direction::Right);
        assert_eq!(buf.push(Direction::Right), InputOutcome::Started);
        buf.begin_tick();
        buf.after_advance();
        buf
    }

    #[test]
    fn test_initial_reverse_rejected() {
        let mut buf = InputBuffer::new(Direction::Right);
        assert_eq!(buf.push(Direction::Left), InputOutcome::Rejected);
        assert_eq!(buf.primary_next(), Direction::Idle);
        assert_eq!(buf.push(Direction::Up), InputOutcome::Started);
        assert_eq!(buf.primary_next(), Direction::Up);
    }

    #[test]
    fn test_keys_before_first_tick_discarded() {
        let mut buf = InputBuffer::new(Direction::Right);
        buf.push(Direction::Down);
        // Perfectly valid turn, still dropped
        assert_eq!(buf.push(Direction::Right), InputOutcome::Rejected);
        assert_eq!(buf.begin_tick(), Direction::Down);
        buf.after_advance();
        assert!(!buf.is_awaiting_initial_move());
        assert_eq!(buf.push(Direction::Right), InputOutcome::Queued);
    }

    #[test]
    fn test_reverse_while_moving_rejected() {
        let mut buf = moving_right();
        assert_eq!(buf.push(Direction::Left), InputOutcome::Rejected);
        assert_eq!(buf.push(Direction::Right), InputOutcome::Rejected);
        assert_eq!(buf.primary_next(), Direction::Right);
    }

    #[test]
    fn test_pending_turn_promoted_after_tick() {
        let mut buf = moving_right();
        assert_eq!(buf.push(Direction::Up), InputOutcome::Queued);
        assert_eq!(buf.push(Direction::Left), InputOutcome::Pending);
        assert_eq!(buf.begin_tick(), Direction::Up);
        buf.after_advance();
        assert_eq!(buf.primary_next(), Direction::Left);
        assert_eq!(buf.pending_next(), None);
        assert_eq!(buf.begin_tick(), Direction::Left);
    }

    #[test]
    fn test_pending_last_writer_wins() {
        let mut buf = moving_right();
        buf.push(Direction::Up);
        buf.push(Direction::Left);
        buf.push(Direction::Right);
        assert_eq!(buf.pending_next(), Some(Direction::Right));
        buf.begin_tick();
        buf.after_advance();
        assert_eq!(buf.primary_next(), Direction::Right);
    }

    #[test]
    fn test_pending_reverse_of_queued_rejected() {
        let mut buf = moving_right();
        buf.push(Direction::Up);
        assert_eq!(buf.push(Direction::Down), InputOutcome::Rejected);
        assert_eq!(buf.push(Direction::Up), InputOutcome::Rejected);
        assert_eq!(buf.pending_next(), None);
    }

    #[test]
    fn test_disabled_buffer_ignores_everything() {
        let mut buf = moving_right();
        buf.set_enabled(false);
        assert_eq!(buf.push(Direction::Up), InputOutcome::Rejected);
        assert_eq!(buf.primary_next(), Direction::Right);
    }

    fn any_direction() -> impl Strategy<Value = Direction> {
        prop_oneof![
            Just(Direction::Up),
            Just(Direction::Down),
            Just(Direction::Left),
            Just(Direction::Right),
        ]
    }

    proptest! {
        #[test]
        fn prop_applied_direction_never_reverses(
            batches in prop::collection::vec(prop::collection::vec(any_direction(), 0..5), 1..60)
        ) {
            let mut buf = InputBuffer::new(Direction::Right);
            let mut last = Direction::Right;
            for keys in batches {
                for key in keys {
                    buf.push(key);
                }
                let applied = buf.begin_tick();
                if !applied.is_idle() {
                    prop_assert_ne!(applied, last.opposite());
                    last = applied;
                }
                buf.after_advance();
            }
        }
    }
}
