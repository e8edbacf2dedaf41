//! Watcher restart policy

use std::time::Duration;

/// Delay used by the default policy
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(5);

/// How the watcher recovers from a fatal monitoring error
///
/// The default waits a fixed five seconds and retries forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl RestartPolicy {
    /// Fixed delay, unbounded attempts
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Fixed delay, giving up after `max_attempts` restarts
    pub fn bounded(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts),
        }
    }

    /// Delay before restart number `attempt` (1-based), or `None` to give up
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempt > max => None,
            _ => Some(self.delay),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RESTART_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fixed_five_seconds_unbounded() {
        let policy = RestartPolicy::default();

        assert_eq!(policy.delay(), Duration::from_secs(5));
        assert_eq!(policy.max_attempts(), None);
        assert_eq!(policy.next_delay(1), Some(Duration::from_secs(5)));
        assert_eq!(policy.next_delay(10_000), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_bounded_gives_up() {
        let policy = RestartPolicy::bounded(Duration::from_millis(10), 2);

        assert_eq!(policy.next_delay(1), Some(Duration::from_millis(10)));
        assert_eq!(policy.next_delay(2), Some(Duration::from_millis(10)));
        assert_eq!(policy.next_delay(3), None);
    }
}
