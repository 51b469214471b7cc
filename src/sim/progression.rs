//! Question reservoir and next-level eligibility

use std::collections::BTreeSet;

use rand::Rng;

/// Draws question indices without replacement, refilling when exhausted, and
/// raises a one-shot signal once half the bank has been answered correctly.
#[derive(Debug, Clone, Default)]
pub struct LevelProgressionTracker {
    total: usize,
    /// Indices presented in the current replay cycle
    used: Vec<usize>,
    /// Distinct indices answered correctly this run
    answered: BTreeSet<usize>,
    eligibility_signalled: bool,
}

impl LevelProgressionTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Indices already presented in this cycle
    pub fn used(&self) -> &[usize] {
        &self.used
    }

    /// Questions left before the reservoir refills
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.used.len())
    }

    pub fn answered_correctly(&self) -> usize {
        self.answered.len()
    }

    /// Correct answers needed for the next level: ceil(total / 2)
    pub fn threshold(&self) -> usize {
        self.total.div_ceil(2)
    }

    pub fn is_eligible(&self) -> bool {
        self.total > 0 && self.answered.len() >= self.threshold()
    }

    /// Draw the next question index; `None` only for an empty bank
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Option<usize> {
        if self.total == 0 {
            return None;
        }
        if self.used.len() >= self.total {
            log::debug!("Question reservoir exhausted, refilling {}", self.total);
            self.used.clear();
        }
        let remaining: Vec<usize> = (0..self.total).filter(|i| !self.used.contains(i)).collect();
        let index = remaining[rng.random_range(0..remaining.len())];
        self.used.push(index);
        Some(index)
    }

    /// Record a correct answer. Returns `true` exactly once per run, on the
    /// answer that first reaches the threshold.
    pub fn record_correct(&mut self, index: usize) -> bool {
        self.answered.insert(index);
        if !self.eligibility_signalled && self.is_eligible() {
            self.eligibility_signalled = true;
            return true;
        }
        false
    }

    /// Empty the reservoir bookkeeping for a new run
    pub fn reset(&mut self) {
        self.used.clear();
        self.answered.clear();
        self.eligibility_signalled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_draws_without_replacement_then_refills() {
        let mut tracker = LevelProgressionTracker::new(5);
        let mut rng = Pcg32::seed_from_u64(42);

        let mut first_cycle: Vec<usize> = (0..5).map(|_| tracker.draw(&mut rng).unwrap()).collect();
        first_cycle.sort();
        assert_eq!(first_cycle, vec![0, 1, 2, 3, 4]);
        assert_eq!(tracker.remaining(), 0);

        tracker.draw(&mut rng).unwrap();
        assert_eq!(tracker.used().len(), 1);
        assert_eq!(tracker.remaining(), 4);
    }

    #[test]
    fn test_empty_bank_draws_nothing() {
        let mut tracker = LevelProgressionTracker::new(0);
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(tracker.draw(&mut rng), None);
        assert!(!tracker.is_eligible());
    }

    #[test]
    fn test_eligibility_is_one_shot() {
        let mut tracker = LevelProgressionTracker::new(5);
        assert_eq!(tracker.threshold(), 3);
        assert!(!tracker.record_correct(0));
        assert!(!tracker.record_correct(0)); // duplicates don't count
        assert!(!tracker.record_correct(1));
        assert!(tracker.record_correct(2));
        assert!(!tracker.record_correct(3));
        assert!(tracker.is_eligible());
    }

    #[test]
    fn test_reset_clears_run() {
        let mut tracker = LevelProgressionTracker::new(2);
        let mut rng = Pcg32::seed_from_u64(9);
        tracker.draw(&mut rng);
        assert!(tracker.record_correct(0));
        tracker.reset();
        assert!(tracker.used().is_empty());
        assert_eq!(tracker.answered_correctly(), 0);
        assert!(tracker.record_correct(1));
    }
}
