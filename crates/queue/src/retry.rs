//! Retry configuration.

use std::time::Duration;

/// Fixed-delay retry configuration.
///
/// Sanitization tolerates replica lag by retrying a bounded number of
/// times with a constant delay; after the attempts are exhausted the
/// job is abandoned and the post stays in its pending display state.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Check if another attempt is allowed after `attempt` tries
    /// (1-indexed).
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.delay, Duration::from_secs(10));
    }

    #[test]
    fn test_should_retry_boundary() {
        let config = RetryConfig::default();
        assert!(config.should_retry(4));
        assert!(!config.should_retry(5));
    }
}
