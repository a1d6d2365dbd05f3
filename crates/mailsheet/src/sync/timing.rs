//! Wall-clock budget for one invocation

use std::time::{Duration, Instant};

/// Tracks time spent against a fixed allowance
///
/// Long operations check [`ExecutionBudget::exceeded`] at safe points and
/// yield, leaving their checkpoint for the next invocation.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionBudget {
    started: Instant,
    allowance: Duration,
}

impl ExecutionBudget {
    pub fn new(allowance: Duration) -> Self {
        Self {
            started: Instant::now(),
            allowance,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.allowance.saturating_sub(self.elapsed())
    }

    /// True once the allowance is used up (immediately for a zero allowance)
    pub fn exceeded(&self) -> bool {
        self.elapsed() >= self.allowance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_exceeded() {
        let budget = ExecutionBudget::new(Duration::ZERO);
        assert!(budget.exceeded());
        assert_eq!(budget.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_generous_budget() {
        let budget = ExecutionBudget::new(Duration::from_secs(3600));
        assert!(!budget.exceeded());
        assert!(budget.remaining() > Duration::from_secs(3500));
    }

    #[test]
    fn test_budget_runs_out() {
        let budget = ExecutionBudget::new(Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(10));
        assert!(budget.exceeded());
    }
}
