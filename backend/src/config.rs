//! Server configuration.
//!
//! Values come from command-line flags with environment-variable fallbacks, so
//! the same binary runs unchanged under a process manager or a container. The
//! parsed [`Config`] is validated once at startup; the ingestion pipeline only
//! ever sees the derived [`IngestLimits`] and [`TokenSecret`].

use clap::Parser;
use thiserror::Error;

/// Smallest accepted length, in bytes, for the integrity-token signing secret.
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Parser, Debug, Clone)]
#[command(name = "ingest-backend")]
#[command(about = "CSV ingestion service: preview, then confirm, an uploaded dataset")]
#[command(version)]
pub struct Config {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "INGEST_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "INGEST_PORT")]
    pub port: u16,

    /// SQLite database file
    #[arg(long, default_value = "ingest.sqlite", env = "INGEST_DATABASE")]
    pub database: String,

    /// Secret used to sign preview tokens (at least 32 bytes)
    #[arg(long, env = "INGEST_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: String,

    /// Largest accepted upload, in bytes
    #[arg(long, default_value = "10485760", env = "INGEST_MAX_FILE_BYTES")]
    pub max_file_bytes: usize,

    /// Largest accepted number of data rows
    #[arg(long, default_value = "50000", env = "INGEST_MAX_ROWS")]
    pub max_rows: usize,

    /// Number of leading rows checked field by field
    #[arg(long, default_value = "100", env = "INGEST_SAMPLE_SIZE")]
    pub sample_size: usize,

    /// Lifetime of a preview token, in seconds
    #[arg(long, default_value = "1800", env = "INGEST_TOKEN_TTL_SECS")]
    pub token_ttl_secs: u64,

    /// Share of failing sampled rows above which the whole file is rejected
    #[arg(long, default_value = "0.5", env = "INGEST_MAX_FAIL_RATE")]
    pub max_fail_rate: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("token secret must be at least {MIN_SECRET_BYTES} bytes, got {0}")]
    SecretTooShort(usize),

    #[error("max fail rate must be within [0, 1), got {0}")]
    FailRateOutOfRange(f64),

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("token ttl of {0} seconds is too large")]
    TtlOutOfRange(u64),
}

/// Token lifetime in milliseconds, if it fits an `i64`.
fn ttl_millis(secs: u64) -> Option<i64> {
    i64::try_from(secs).ok()?.checked_mul(1000)
}

impl Config {
    /// Checks cross-field constraints clap cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::SecretTooShort(self.token_secret.len()));
        }
        if !(0.0..1.0).contains(&self.max_fail_rate) {
            return Err(ConfigError::FailRateOutOfRange(self.max_fail_rate));
        }
        if self.max_file_bytes == 0 {
            return Err(ConfigError::ZeroLimit("max file bytes"));
        }
        if self.max_rows == 0 {
            return Err(ConfigError::ZeroLimit("max rows"));
        }
        if self.sample_size == 0 {
            return Err(ConfigError::ZeroLimit("sample size"));
        }
        if ttl_millis(self.token_ttl_secs).is_none() {
            return Err(ConfigError::TtlOutOfRange(self.token_ttl_secs));
        }
        Ok(())
    }

    pub fn limits(&self) -> IngestLimits {
        IngestLimits {
            max_file_bytes: self.max_file_bytes,
            max_rows: self.max_rows,
            sample_size: self.sample_size,
            max_fail_rate: self.max_fail_rate,
            // Out-of-range values are refused by `validate`.
            token_ttl_ms: ttl_millis(self.token_ttl_secs).unwrap_or(i64::MAX),
        }
    }

    pub fn secret(&self) -> TokenSecret {
        TokenSecret::new(self.token_secret.as_bytes().to_vec())
    }
}

/// Bounds applied to every preview and confirm request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestLimits {
    pub max_file_bytes: usize,
    pub max_rows: usize,
    pub sample_size: usize,
    /// Rejection happens when the sampled failure rate is strictly greater.
    pub max_fail_rate: f64,
    pub token_ttl_ms: i64,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024, // 10 MB
            max_rows: 50_000,
            sample_size: 100,
            max_fail_rate: 0.5,
            token_ttl_ms: 30 * 60 * 1000,
        }
    }
}

/// Server-held HMAC key for preview tokens. Its bytes never leave the process
/// and are kept out of `Debug` output.
#[derive(Clone)]
pub struct TokenSecret(Vec<u8>);

impl TokenSecret {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenSecret(<{} bytes>)", self.0.len())
    }
}
