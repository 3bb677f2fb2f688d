//! Engine tunables, loadable from a TOML file with sensible defaults.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors related to engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for the retrieval engine.
///
/// Every field has a default tuned against the live provider, so an empty
/// file (or no file at all) yields a working engine. Unknown keys are
/// ignored to keep old configs loadable.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the charting API host.
    pub charting_base_url: String,
    /// Page fetched once per session to collect the anti-bot cookies.
    pub bootstrap_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// How long acquired cookies are trusted before a fresh handshake.
    pub session_max_age_secs: u64,
    /// Request pacing against the provider.
    pub rate_limit_per_minute: u32,
    /// How many sub-range requests a single historical call may have in
    /// flight at once.
    pub fetch_concurrency: usize,
    /// Longest span the provider serves per request at intraday
    /// resolutions. The provider truncates silently past this, so it is
    /// treated as a hard limit.
    pub intraday_max_span_days: i64,
    /// Longest span per request at daily resolution.
    pub daily_max_span_days: i64,
    /// User-Agent presented during the handshake and all API calls.
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            charting_base_url: "https://charting.nseindia.com".to_string(),
            bootstrap_url: "https://www.nseindia.com".to_string(),
            timeout_secs: 10,
            session_max_age_secs: 30 * 60,
            rate_limit_per_minute: 60,
            fetch_concurrency: 4,
            intraday_max_span_days: 15,
            daily_max_span_days: 365,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads the file named by `NSE_DATA_CONFIG` if set, defaults otherwise.
    pub fn from_env() -> Result<Self, ConfigError> {
        match shared_utils::env::env_var("NSE_DATA_CONFIG") {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }
}
