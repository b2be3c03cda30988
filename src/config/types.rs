//! Configuration types and CLI options.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::*;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to
/// most verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Pipeline configuration.
///
/// Doubles as the CLI surface (via `clap`) and as the library configuration;
/// library users construct it with struct-update syntax over
/// [`Config::default`].
///
/// Provider API keys are deliberately not part of this struct: they are read
/// from the `GSB_API_KEY` / `VT_API_KEY` environment variables, and a missing
/// key degrades that provider to a permanent `Unknown` rather than failing.
///
/// # Examples
///
/// ```no_run
/// use link_verdict::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     file: PathBuf::from("urls.txt"),
///     max_concurrency: 8,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "link_verdict",
    about = "Scan URLs against reputation providers and record encrypted audit history"
)]
pub struct Config {
    /// File to read URLs from, one per line (use "-" for stdin)
    #[arg(default_value = "urls.txt")]
    pub file: PathBuf,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    /// Audit database path (SQLite file)
    #[arg(long, default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Audit encryption key file (created with owner-only permissions on
    /// first run when the key env var is unset)
    #[arg(long, default_value = KEY_FILE)]
    pub key_file: PathBuf,

    /// Maximum concurrently executing scans
    #[arg(long, default_value_t = SEMAPHORE_LIMIT)]
    pub max_concurrency: usize,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = HTTP_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// Maximum redirect hops during short-link expansion
    #[arg(long, default_value_t = MAX_REDIRECT_HOPS)]
    pub max_redirects: usize,

    /// Maximum provider query attempts (initial attempt included)
    #[arg(long, default_value_t = RETRY_MAX_ATTEMPTS)]
    pub max_retries: usize,

    /// Backoff base in seconds (delay before attempt n is base^n seconds)
    #[arg(long, default_value_t = RETRY_BACKOFF_BASE_SECS)]
    pub backoff_base_secs: u64,

    /// Redirect-expansion cache TTL in seconds
    #[arg(long, default_value_t = REDIRECT_CACHE_TTL_SECS)]
    pub cache_ttl_secs: u64,

    /// Delay before the single indeterminate re-check, in seconds
    #[arg(long, default_value_t = RECHECK_DELAY_SECS)]
    pub recheck_delay_secs: u64,

    /// Disable the SSRF guard (blocked-host resolution checks)
    #[arg(long)]
    pub no_ssrf_block: bool,

    /// Domain treated as safe without contacting any provider (repeatable;
    /// subdomains match)
    #[arg(long = "allow-domain", value_name = "DOMAIN")]
    pub allow_domains: Vec<String>,

    /// Short-link domain to expand before analysis (repeatable; replaces the
    /// built-in list when given)
    #[arg(long = "shortlink-domain", value_name = "DOMAIN")]
    pub shortlink_domains: Vec<String>,
}

impl Config {
    /// Redirect-cache TTL as a [`Duration`].
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Indeterminate re-check delay as a [`Duration`].
    pub fn recheck_delay(&self) -> Duration {
        Duration::from_secs(self.recheck_delay_secs)
    }

    /// The short-link domain list in effect: the configured one, or the
    /// built-in defaults when none was given.
    pub fn shortlink_domains(&self) -> Vec<String> {
        if self.shortlink_domains.is_empty() {
            DEFAULT_SHORTLINK_DOMAINS
                .iter()
                .map(|d| d.to_string())
                .collect()
        } else {
            self.shortlink_domains.clone()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: PathBuf::from("urls.txt"),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            db_path: PathBuf::from(DB_PATH),
            key_file: PathBuf::from(KEY_FILE),
            max_concurrency: SEMAPHORE_LIMIT,
            timeout_seconds: HTTP_TIMEOUT_SECS,
            max_redirects: MAX_REDIRECT_HOPS,
            max_retries: RETRY_MAX_ATTEMPTS,
            backoff_base_secs: RETRY_BACKOFF_BASE_SECS,
            cache_ttl_secs: REDIRECT_CACHE_TTL_SECS,
            recheck_delay_secs: RECHECK_DELAY_SECS,
            no_ssrf_block: false,
            allow_domains: Vec::new(),
            shortlink_domains: Vec::new(),
        }
    }
}
