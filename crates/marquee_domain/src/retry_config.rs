use derive_setters::Setters;
use serde::{Deserialize, Serialize};

/// How failed completion calls are retried.
#[derive(Debug, Clone, Serialize, Deserialize, Setters, PartialEq)]
#[setters(into)]
pub struct RetryConfig {
    /// Delay before the first retry, in milliseconds
    pub min_delay_ms: u64,

    /// Each further delay is the previous one times this factor
    pub backoff_factor: u64,

    /// Retries after the first call; zero disables retrying
    pub max_retry_attempts: usize,

    /// Provider responses with these statuses become `Error::Retryable`
    pub retry_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 500,
            backoff_factor: 2,
            max_retry_attempts: 2,
            retry_status_codes: vec![429, 500, 502, 503, 504, 408],
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();

        assert_eq!(config.min_delay_ms, 500);
        assert_eq!(config.backoff_factor, 2);
        assert_eq!(config.max_retry_attempts, 2);
        assert_eq!(
            config.retry_status_codes,
            vec![429, 500, 502, 503, 504, 408]
        );
    }

    #[test]
    fn test_retry_config_setters() {
        let config = RetryConfig::default()
            .min_delay_ms(10u64)
            .max_retry_attempts(5usize)
            .retry_status_codes(vec![503]);

        assert_eq!(config.min_delay_ms, 10);
        assert_eq!(config.max_retry_attempts, 5);
        assert_eq!(config.retry_status_codes, vec![503]);
    }
}
