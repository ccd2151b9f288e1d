use std::time::Duration;

use super::retry::retry_delay;

/// Delay schedule for polling an accepted request.
///
/// Delays start at `initial` and double; the last one is shortened so that the
/// time spent never exceeds `timeout`.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    initial: Duration,
    timeout: Duration,
    attempt: u32,
}

impl PollSchedule {
    pub fn new(initial: Duration, timeout: Duration) -> Self {
        Self {
            initial,
            timeout,
            attempt: 0,
        }
    }

    /// Number of delays handed out so far.
    pub fn attempts(&self) -> u32 { self.attempt }

    /// Next delay given the time already spent, or `None` once the budget is gone.
    pub fn next_delay(&mut self, elapsed: Duration) -> Option<Duration> {
        let remaining = self.timeout.checked_sub(elapsed).filter(|d| !d.is_zero())?;
        let delay = retry_delay(self.attempt, self.initial).min(remaining);
        self.attempt += 1;
        Some(delay)
    }
}
