//! Bounded exponential backoff for the adapter watch loops.

use std::time::Duration;

/// Adapter-local retry state: exponential delays up to a cap, with a hard
/// attempt budget after which the loop gives up and the adapter is marked
/// unhealthy.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl Backoff {
    #[must_use]
    pub fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            cap,
            max_attempts,
            attempts: 0,
        }
    }

    /// The delay before the next retry, or `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        let exp = self.base.saturating_mul(1u32 << self.attempts.min(16));
        self.attempts += 1;
        Some(exp.min(self.cap))
    }

    /// Forget past failures after a successful cycle.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60), 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_up_to_cap() {
        let mut b = Backoff::new(Duration::from_secs(1), Duration::from_secs(5), 10);
        assert_eq!(b.next_delay(), Some(Duration::from_secs(1)));
        assert_eq!(b.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(b.next_delay(), Some(Duration::from_secs(4)));
        assert_eq!(b.next_delay(), Some(Duration::from_secs(5)));
        assert_eq!(b.next_delay(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn budget_exhausts() {
        let mut b = Backoff::new(Duration::from_millis(10), Duration::from_secs(1), 2);
        assert!(b.next_delay().is_some());
        assert!(b.next_delay().is_some());
        assert_eq!(b.next_delay(), None);
        assert_eq!(b.next_delay(), None);
    }

    #[test]
    fn reset_restores_budget() {
        let mut b = Backoff::new(Duration::from_millis(10), Duration::from_secs(1), 1);
        assert!(b.next_delay().is_some());
        assert_eq!(b.next_delay(), None);
        b.reset();
        assert_eq!(b.attempts(), 0);
        assert_eq!(b.next_delay(), Some(Duration::from_millis(10)));
    }
}
