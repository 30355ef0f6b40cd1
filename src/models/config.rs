// src/models/config.rs

use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub fetcher: FetcherConfig,
    pub paths: PathsConfig,
    pub logging: LoggingConfig,
}

/// Fetch engine tuning knobs.
///
/// `pool_size` workers each hold one persistent HTTP client, so more
/// workers means more parallel connections to the server.
/// `max_requests_per_sec` is a global token-bucket cap across all workers;
/// rates of 1000 and above disable the limiter entirely.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FetcherConfig {
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Number of persistent fetch workers
    pub pool_size: usize,
    /// Global request rate cap shared by all workers
    pub max_requests_per_sec: f64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            pool_size: 50,
            max_requests_per_sec: 1000.0,
        }
    }
}

/// File path configurations
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    /// Official school roster CSV
    pub roster: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            roster: "data/schools.csv".to_string(),
        }
    }
}

/// Logging configurations
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_progress: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_progress: true,
        }
    }
}
