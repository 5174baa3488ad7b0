//! Bounded retry with exponential backoff for transient failures.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1 is the first retry).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = self.multiplier.max(1.0).powi(attempt as i32 - 1);
        let millis = self.base_delay.as_millis() as f64 * factor;
        Duration::from_millis(millis.min(self.max_delay.as_millis() as f64) as u64)
    }

    /// Runs `op` until it succeeds, fails permanently, or runs out of
    /// attempts. `sleep` is called between attempts.
    pub fn run<T, E, Op, Transient, Sleep>(
        &self,
        mut op: Op,
        is_transient: Transient,
        mut sleep: Sleep,
    ) -> Result<T, E>
    where
        Op: FnMut(u32) -> Result<T, E>,
        Transient: Fn(&E) -> bool,
        Sleep: FnMut(Duration),
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(error) if attempt + 1 < attempts && is_transient(&error) => {
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    tracing::debug!("transient failure, retrying in {:?} (attempt {})", delay, attempt + 1);
                    sleep(delay);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_grow_and_cap() {
        let policy = RetryPolicy {
            max_attempts: 6,
            base_delay: Duration::from_millis(200),
            multiplier: 2.0,
            max_delay: Duration::from_millis(1000),
        };

        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1000));
    }

    #[test]
    fn test_transient_errors_are_retried_until_success() {
        let mut slept = Vec::new();
        let result: Result<&str, &str> = RetryPolicy::default().run(
            |attempt| if attempt < 2 { Err("timeout") } else { Ok("listing") },
            |_| true,
            |delay| slept.push(delay),
        );

        assert_eq!(result, Ok("listing"));
        assert_eq!(slept, vec![Duration::from_millis(200), Duration::from_millis(400)]);
    }

    #[test]
    fn test_permanent_error_is_not_retried() {
        let mut calls = 0;
        let result: Result<(), &str> = RetryPolicy::default().run(
            |_| {
                calls += 1;
                Err("forbidden")
            },
            |e| *e != "forbidden",
            |_| {},
        );

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_attempts_are_bounded() {
        let mut calls = 0;
        let result: Result<(), &str> = RetryPolicy::default().run(
            |_| {
                calls += 1;
                Err("timeout")
            },
            |_| true,
            |_| {},
        );

        assert!(result.is_err());
        assert_eq!(calls, 3);
    }
}
