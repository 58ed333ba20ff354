//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Per-IP rate limiting on the scoring routes using tower_governor.
//! The Generic Cell Rate Algorithm (GCRA) enforces the rate without
//! background processes; only stale per-IP state needs periodic pruning.

use crate::ApiError;
use governor::middleware::StateInformationMiddleware;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tracing::debug;

/// Governor config keyed by peer IP, with X-RateLimit-* headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration.
///
/// Off by default: behind a reverse proxy every client shares the proxy's IP
/// and therefore one bucket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Burst size (max requests that can be made immediately)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            per_second: 1,
            burst_size: 50,
        }
    }
}

impl RateLimitConfig {
    /// Config for deployments exposed to untrusted clients
    pub fn strict() -> Self {
        Self {
            enabled: true,
            per_second: 4,
            burst_size: 5,
        }
    }
}

/// Build the governor config, or `None` when rate limiting is disabled.
///
/// Requires the service to be served with
/// `into_make_service_with_connect_info::<SocketAddr>()` for IP extraction.
pub fn create_governor_config(
    config: &RateLimitConfig,
) -> Result<Option<Arc<DefaultGovernorConfig>>, ApiError> {
    if !config.enabled {
        return Ok(None);
    }
    let governor = GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .ok_or_else(|| {
            ApiError::RateLimit(format!(
                "per_second {} and burst_size {} must both be positive",
                config.per_second, config.burst_size
            ))
        })?;
    Ok(Some(Arc::new(governor)))
}

/// Periodically drop per-IP state that has fully replenished
pub fn spawn_cleanup(config: &Arc<DefaultGovernorConfig>, every: Duration) {
    let limiter = config.limiter().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            debug!(tracked = limiter.len(), "Pruning rate limiter state");
            limiter.retain_recent();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(!config.enabled);
        assert!(create_governor_config(&config).unwrap().is_none());
        assert_eq!(config.per_second, 1);
        assert_eq!(config.burst_size, 50);
    }

    #[test]
    fn test_create_governor_config() {
        let governor = create_governor_config(&RateLimitConfig::strict()).unwrap();
        assert!(governor.is_some());
    }

    #[test]
    fn test_enabled_default_limits() {
        let config = RateLimitConfig {
            enabled: true,
            ..RateLimitConfig::default()
        };
        assert!(create_governor_config(&config).unwrap().is_some());
    }

    #[test]
    fn test_zero_burst_rejected() {
        let config = RateLimitConfig {
            burst_size: 0,
            ..RateLimitConfig::strict()
        };
        assert!(matches!(
            create_governor_config(&config),
            Err(ApiError::RateLimit(_))
        ));
    }
}
