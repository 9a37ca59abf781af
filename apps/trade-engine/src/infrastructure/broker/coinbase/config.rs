//! Coinbase Advanced Trade adapter configuration.

use std::time::Duration;

/// Configuration for the Coinbase broker adapter.
#[derive(Debug, Clone)]
pub struct CoinbaseConfig {
    /// CDP API key name, e.g. `organizations/{org}/apiKeys/{key}`.
    pub api_key_name: String,
    /// EC private key in PEM format, used to sign request JWTs.
    pub private_key_pem: String,
    /// REST API host, used both for requests and the JWT `uri` claim.
    pub host: String,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Retry policy configuration.
    pub retry: RetryConfig,
}

impl CoinbaseConfig {
    /// Create a new configuration against the production host.
    #[must_use]
    pub fn new(api_key_name: String, private_key_pem: String) -> Self {
        Self {
            api_key_name,
            private_key_pem,
            host: "api.coinbase.com".to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Base URL for REST requests.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}", self.host)
    }
}

/// Retry policy for the Coinbase REST client: 429/502/503/504 back off
/// 1s, 2s, 4s across a maximum of 3 attempts; 4xx business errors never
/// retry.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_attempts: u32,
    /// Backoff delays, applied in order as attempts are exhausted.
    pub backoff_schedule: Vec<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_schedule: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_production_host() {
        let config = CoinbaseConfig::new("key".to_string(), "pem".to_string());
        assert_eq!(config.base_url(), "https://api.coinbase.com");
    }

    #[test]
    fn config_with_timeout() {
        let config = CoinbaseConfig::new("key".to_string(), "pem".to_string())
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn retry_config_default_matches_the_three_attempt_schedule() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(
            retry.backoff_schedule,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }
}
