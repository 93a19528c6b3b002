use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub http: HttpConfig,
    /// PostgreSQL connection URL for this service's store.
    #[serde(default)]
    pub database_url: Option<String>,
    pub broker: BrokerConfig,
    #[serde(default)]
    pub saga: SagaConfig,
    #[serde(default)]
    pub outbox: OutboxConfig,
    /// Coordinator only.
    #[serde(default)]
    pub timeout_scanner: TimeoutScannerConfig,
    /// Ledger only.
    #[serde(default)]
    pub refund_retry: RefundRetryConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BrokerConfig {
    /// Kafka bootstrap servers (comma-separated).
    pub brokers: String,
    /// Consumer group id for this service.
    pub group_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SagaConfig {
    /// Wall-clock deadline for a saga to reach a terminal state.
    pub timeout_ms: u64,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self { timeout_ms: 60_000 }
    }
}

impl SagaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutboxConfig {
    pub poll_interval_ms: u64,
    pub batch_size: i64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            batch_size: 100,
        }
    }
}

impl OutboxConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimeoutScannerConfig {
    pub period_ms: u64,
    pub batch_size: i64,
}

impl Default for TimeoutScannerConfig {
    fn default() -> Self {
        Self {
            period_ms: 10_000,
            batch_size: 100,
        }
    }
}

impl TimeoutScannerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefundRetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub multiplier: u32,
    pub max_backoff_ms: u64,
}

impl Default for RefundRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            multiplier: 2,
            max_backoff_ms: 2_000,
        }
    }
}

impl AppConfig {
    /// Load config from YAML file based on service name and environment,
    /// e.g. `config/coordinator.dev.yaml`.
    pub fn load(service: &str, env: &str) -> Result<Self> {
        let config_path = format!("config/{}.{}.yaml", service, env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config: Self =
            serde_yaml::from_str(&content).context("Failed to parse config yaml")?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Environment variables take precedence over YAML config:
    /// - DATABASE_URL: PostgreSQL connection URL
    /// - KAFKA_BROKERS: Kafka bootstrap servers
    /// - HTTP_PORT: HTTP listen port (u16)
    /// - LOG_LEVEL: Log level (trace/debug/info/warn/error)
    /// - SAGA_TIMEOUT_MS: saga timeout deadline
    /// - OUTBOX_POLL_INTERVAL_MS / OUTBOX_BATCH_SIZE: outbox publisher tuning
    /// - TIMEOUT_SCAN_PERIOD_MS: timeout scanner period (coordinator)
    /// - REFUND_RETRY_MAX_ATTEMPTS / REFUND_RETRY_BACKOFF_MS: refund retry (ledger)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            tracing::info!("Config override: database_url = [REDACTED] (from DATABASE_URL)");
            self.database_url = Some(url);
        }
        if let Ok(brokers) = std::env::var("KAFKA_BROKERS") {
            tracing::info!("Config override: broker.brokers = {} (from KAFKA_BROKERS)", brokers);
            self.broker.brokers = brokers;
        }
        if let Ok(port) = std::env::var("HTTP_PORT")
            && let Ok(p) = port.parse::<u16>()
        {
            tracing::info!("Config override: http.port = {} (from HTTP_PORT)", p);
            self.http.port = p;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            tracing::info!("Config override: log_level = {} (from LOG_LEVEL)", level);
            self.log_level = level;
        }
        if let Ok(timeout) = std::env::var("SAGA_TIMEOUT_MS")
            && let Ok(ms) = timeout.parse::<u64>()
        {
            tracing::info!("Config override: saga.timeout_ms = {} (from SAGA_TIMEOUT_MS)", ms);
            self.saga.timeout_ms = ms;
        }
        if let Ok(interval) = std::env::var("OUTBOX_POLL_INTERVAL_MS")
            && let Ok(ms) = interval.parse::<u64>()
        {
            tracing::info!(
                "Config override: outbox.poll_interval_ms = {} (from OUTBOX_POLL_INTERVAL_MS)",
                ms
            );
            self.outbox.poll_interval_ms = ms;
        }
        if let Ok(batch) = std::env::var("OUTBOX_BATCH_SIZE")
            && let Ok(n) = batch.parse::<i64>()
        {
            tracing::info!("Config override: outbox.batch_size = {} (from OUTBOX_BATCH_SIZE)", n);
            self.outbox.batch_size = n;
        }
        if let Ok(period) = std::env::var("TIMEOUT_SCAN_PERIOD_MS")
            && let Ok(ms) = period.parse::<u64>()
        {
            tracing::info!(
                "Config override: timeout_scanner.period_ms = {} (from TIMEOUT_SCAN_PERIOD_MS)",
                ms
            );
            self.timeout_scanner.period_ms = ms;
        }
        if let Ok(attempts) = std::env::var("REFUND_RETRY_MAX_ATTEMPTS")
            && let Ok(n) = attempts.parse::<u32>()
        {
            tracing::info!(
                "Config override: refund_retry.max_attempts = {} (from REFUND_RETRY_MAX_ATTEMPTS)",
                n
            );
            self.refund_retry.max_attempts = n;
        }
        if let Ok(backoff) = std::env::var("REFUND_RETRY_BACKOFF_MS")
            && let Ok(ms) = backoff.parse::<u64>()
        {
            tracing::info!(
                "Config override: refund_retry.initial_backoff_ms = {} (from REFUND_RETRY_BACKOFF_MS)",
                ms
            );
            self.refund_retry.initial_backoff_ms = ms;
        }
    }

    /// Validate configuration at startup.
    pub fn validate(&self) -> Result<()> {
        if self.http.port == 0 {
            anyhow::bail!("Invalid http.port: must be > 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log_level '{}': must be one of {:?}",
                self.log_level,
                valid_levels
            );
        }

        if self.broker.brokers.is_empty() {
            anyhow::bail!("Invalid broker.brokers: must not be empty");
        }
        if self.broker.group_id.is_empty() {
            anyhow::bail!("Invalid broker.group_id: must not be empty");
        }
        if self.outbox.batch_size <= 0 {
            anyhow::bail!("Invalid outbox.batch_size: must be > 0");
        }
        if self.timeout_scanner.batch_size <= 0 {
            anyhow::bail!("Invalid timeout_scanner.batch_size: must be > 0");
        }
        if self.refund_retry.max_attempts == 0 {
            anyhow::bail!("Invalid refund_retry.max_attempts: must be > 0");
        }
        if self.saga.timeout_ms == 0 {
            anyhow::bail!("Invalid saga.timeout_ms: must be > 0");
        }

        Ok(())
    }

    /// The database URL, required at service startup.
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("database_url not configured (set DATABASE_URL or the yaml key)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "app.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            http: HttpConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database_url: Some("postgres://localhost/fundflow".to_string()),
            broker: BrokerConfig {
                brokers: "localhost:9092".to_string(),
                group_id: "coordinator".to_string(),
            },
            saga: SagaConfig::default(),
            outbox: OutboxConfig::default(),
            timeout_scanner: TimeoutScannerConfig::default(),
            refund_retry: RefundRetryConfig::default(),
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_port() {
        let mut config = base_config();
        config.http.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = base_config();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_match_contract() {
        let saga = SagaConfig::default();
        assert_eq!(saga.timeout_ms, 60_000);

        let outbox = OutboxConfig::default();
        assert_eq!(outbox.poll_interval_ms, 50);
        assert_eq!(outbox.batch_size, 100);

        let scanner = TimeoutScannerConfig::default();
        assert_eq!(scanner.period_ms, 10_000);

        let retry = RefundRetryConfig::default();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.initial_backoff_ms, 100);
        assert_eq!(retry.multiplier, 2);
        assert_eq!(retry.max_backoff_ms, 2_000);
    }

    #[test]
    fn test_require_database_url() {
        let mut config = base_config();
        assert!(config.require_database_url().is_ok());
        config.database_url = None;
        assert!(config.require_database_url().is_err());
    }
}
