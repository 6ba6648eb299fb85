//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry, polling and timeout policy for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Submission attempts per clip, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt (milliseconds).
    /// Doubles for every further attempt.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds).
    #[serde(default = "default_backoff_cap")]
    pub backoff_cap_ms: u64,

    /// Delay between status checks of a submitted job (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Wall-clock budget for the poll phase of one submission (seconds).
    /// A job still running after this is timed out and not retried.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    2000 // 2 seconds
}

fn default_backoff_cap() -> u64 {
    30_000 // 30 seconds
}

fn default_poll_interval() -> u64 {
    5000 // 5 seconds
}

fn default_job_timeout() -> u64 {
    600 // 10 minutes
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
            backoff_cap_ms: default_backoff_cap(),
            poll_interval_ms: default_poll_interval(),
            job_timeout_secs: default_job_timeout(),
        }
    }
}

impl OrchestratorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Delay before the next submission after `failed_attempts` failures:
    /// `min(base * 2^(failed_attempts - 1), cap)`.
    pub fn backoff_delay(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(31);
        let delay = self
            .backoff_base_ms
            .saturating_mul(1u64 << exponent)
            .min(self.backoff_cap_ms);
        Duration::from_millis(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff_base_ms, 2000);
        assert_eq!(config.backoff_cap_ms, 30_000);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.job_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(config.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(config.backoff_delay(3), Duration::from_secs(8));
        assert_eq!(config.backoff_delay(4), Duration::from_secs(16));
        assert_eq!(config.backoff_delay(5), Duration::from_secs(30));
        assert_eq!(config.backoff_delay(60), Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_zero_attempts_uses_base() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.backoff_delay(0), Duration::from_secs(2));
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            max_attempts = 5
            poll_interval_ms = 250
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.job_timeout_secs, 600);
    }
}
