//! Iteration and wall-clock budgets for the cycle runner.

use std::time::{Duration, Instant};

/// Limits for one planning call. The clock starts when the budget is created.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    max_iterations: u32,
    timeout: Duration,
    started: Instant,
    /// `None` when the timeout is too large to represent as an instant.
    deadline: Option<Instant>,
}

impl Budget {
    pub fn new(max_iterations: u32, timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            max_iterations,
            timeout,
            started,
            deadline: started.checked_add(timeout),
        }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// True once `used` cycles have consumed the iteration cap.
    pub fn iterations_exhausted(&self, used: u32) -> bool {
        used >= self.max_iterations
    }

    /// Remaining wall-clock budget, or `None` once the deadline has passed.
    pub fn remaining_time(&self) -> Option<Duration> {
        let Some(deadline) = self.deadline else {
            return Some(Duration::MAX);
        };
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .unwrap_or(Duration::from_secs(0));
        if remaining.is_zero() {
            return None;
        }
        Some(remaining)
    }
}
