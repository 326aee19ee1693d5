use std::time::Duration;

use log::warn;
use thiserror::Error;

/// Bounded retry for the two connection steps (Wi-Fi join, broker connect).
/// Fixed delay between attempts, no backoff. Exhaustion is not an error to
/// recover from locally; the caller is expected to escalate to a full device
/// restart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
#[error("{task}: giving up after {attempts} attempts")]
pub struct RetriesExhausted {
    pub task: &'static str,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Runs `attempt` up to `max_attempts` times, calling `wait` with the
    /// fixed delay after every failure. Each failure is logged with its
    /// attempt number and the underlying diagnostic.
    pub fn run<T, E, A, W>(
        &self,
        task: &'static str,
        mut attempt: A,
        mut wait: W,
    ) -> Result<T, RetriesExhausted>
    where
        A: FnMut(u32) -> Result<T, E>,
        E: std::fmt::Display,
        W: FnMut(Duration),
    {
        for n in 1..=self.max_attempts {
            match attempt(n) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!("{task}: attempt {n}/{} failed: {err}", self.max_attempts);
                    // No delay after the last failure; escalation is immediate.
                    if n < self.max_attempts {
                        wait(self.delay);
                    }
                }
            }
        }

        Err(RetriesExhausted {
            task,
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_after_exactly_max_attempts() {
        let policy = RetryPolicy::default();
        let mut attempts = 0u32;
        let mut waits = 0u32;

        let result: Result<(), _> = policy.run(
            "wifi",
            |_| {
                attempts += 1;
                Err::<(), _>("no association")
            },
            |_| waits += 1,
        );

        let exhausted = result.unwrap_err();
        assert_eq!(attempts, 6);
        // Five delays between six attempts; the final failure escalates
        // without waiting.
        assert_eq!(waits, 5);
        assert_eq!(exhausted.attempts, 6);
        assert_eq!(exhausted.task, "wifi");
    }

    #[test]
    fn returns_first_success_without_further_attempts() {
        let policy = RetryPolicy::default();
        let mut attempts = 0u32;
        let mut waited = Duration::ZERO;

        let result = policy.run(
            "broker",
            |n| {
                attempts += 1;
                if n < 3 {
                    Err("refused")
                } else {
                    Ok(n)
                }
            },
            |d| waited += d,
        );

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts, 3);
        assert_eq!(waited, Duration::from_secs(2));
    }
}
