use crate::config::PipelineConfig;
use crate::error::AnalystError;
use std::time::Duration;

/// Retry policy for store writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Pause before reconnecting
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_retry()
    }
}

impl RetryPolicy {
    /// One reconnect-and-retry after a transient failure
    pub fn single_retry() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_millis(500),
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_attempts: config.persist_max_attempts.max(1),
            backoff: config.persist_backoff(),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Whether `attempt` (1-based) failing with `err` earns another attempt
    pub fn should_retry(&self, attempt: u32, err: &AnalystError) -> bool {
        attempt < self.max_attempts && err.is_transient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_retry_only_for_transient() {
        let policy = RetryPolicy::single_retry();
        assert!(policy.should_retry(1, &AnalystError::StoreClosed));
        assert!(!policy.should_retry(2, &AnalystError::StoreClosed));
        assert!(!policy.should_retry(1, &AnalystError::Validation("bad row".into())));
    }

    #[test]
    fn test_no_retry() {
        assert!(!RetryPolicy::no_retry().should_retry(1, &AnalystError::StoreClosed));
    }

    #[test]
    fn test_from_config() {
        let config = PipelineConfig {
            persist_max_attempts: 0,
            persist_backoff_ms: 20,
            ..Default::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff, Duration::from_millis(20));
        assert_eq!(RetryPolicy::default().max_attempts, 2);
    }
}
