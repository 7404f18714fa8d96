use crate::config::types::{
    Config, ConnectionPoolConfig, CrawlerConfig, RetryConfig, SessionConfig, UserAgentConfig,
};
use crate::ConfigError;
use reqwest::header::HeaderValue;

/// Upper bound on retry rounds; more would only re-hit pages that are gone
const MAX_RETRY_ROUNDS: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_pool_config(&config.connection_pool)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_session_config(&config.sessions)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.jitter_min_ms > config.jitter_max_ms {
        return Err(ConfigError::Validation(format!(
            "jitter-min-ms ({}) must not exceed jitter-max-ms ({})",
            config.jitter_min_ms, config.jitter_max_ms
        )));
    }

    if config.min_concurrency < 1 {
        return Err(ConfigError::Validation(
            "min-concurrency must be >= 1".to_string(),
        ));
    }

    if config.baseline_concurrency == Some(0) {
        return Err(ConfigError::Validation(
            "baseline-concurrency must be >= 1 when set".to_string(),
        ));
    }

    if config.max_backoff_ms < 1_000 {
        return Err(ConfigError::Validation(format!(
            "max-backoff-ms must be >= 1000ms, got {}ms",
            config.max_backoff_ms
        )));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_rounds > MAX_RETRY_ROUNDS {
        return Err(ConfigError::Validation(format!(
            "max-rounds must be <= {}, got {}",
            MAX_RETRY_ROUNDS, config.max_rounds
        )));
    }

    if config.sub_batch_size < 1 {
        return Err(ConfigError::Validation(
            "sub-batch-size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates connection pool configuration
fn validate_pool_config(config: &ConnectionPoolConfig) -> Result<(), ConfigError> {
    if config.max_idle_per_host < 1 {
        return Err(ConfigError::Validation(
            "max-idle-per-host must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the user agent pool
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.pool.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent pool cannot be empty".to_string(),
        ));
    }

    if config.pool.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agent pool cannot contain blank entries".to_string(),
        ));
    }

    if let Some(ua) = config
        .pool
        .iter()
        .find(|ua| HeaderValue::from_str(ua).is_err())
    {
        return Err(ConfigError::Validation(format!(
            "user-agent {:?} is not a valid header value",
            ua
        )));
    }

    Ok(())
}

/// Validates session registry configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.ttl_secs < 1 {
        return Err(ConfigError::Validation("ttl-secs must be >= 1".to_string()));
    }

    if config.cleanup_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "cleanup-interval-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}
