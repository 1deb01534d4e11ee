use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::models::{OutputFormat, Settings, TestMode};

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::{duration, parse_default};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub tester: TesterConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving generated playlists
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout", with = "duration")]
    pub connect_timeout: Duration,
    /// Timeout for downloading a whole playlist body
    #[serde(default = "default_fetch_timeout", with = "duration")]
    pub fetch_timeout: Duration,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TesterConfig {
    /// Number of test results kept in the LRU cache
    #[serde(default = "default_test_cache_capacity")]
    pub cache_capacity: usize,
    /// Channels quick-tested when a deep test finds a playlist
    #[serde(default = "default_deep_sample_size")]
    pub deep_sample_size: usize,
    /// Playlists with at least this many channels pass a deep test even when
    /// no sampled channel answers
    #[serde(default = "default_plausible_channel_count")]
    pub plausible_channel_count: usize,
    /// Bytes a raw stream must deliver to count as active
    #[serde(default = "default_min_stream_bytes")]
    pub min_stream_bytes: usize,
    /// Upper bound on bytes read by a deep test before deciding
    #[serde(default = "default_max_probe_bytes")]
    pub max_probe_bytes: usize,
    /// Added to the per-link timeout for the GET of a deep test
    #[serde(default = "default_deep_timeout_extra", with = "duration")]
    pub deep_timeout_extra: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Links tested at the same time in the auto workflow
    #[serde(default = "default_test_concurrency")]
    pub test_concurrency: usize,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIRECTORY)
}

fn default_connect_timeout() -> Duration {
    parse_default(DEFAULT_CONNECT_TIMEOUT, 5)
}

fn default_fetch_timeout() -> Duration {
    parse_default(DEFAULT_FETCH_TIMEOUT, 30)
}

fn default_max_redirects() -> usize {
    DEFAULT_MAX_REDIRECTS
}

fn default_test_cache_capacity() -> usize {
    DEFAULT_TEST_CACHE_CAPACITY
}

fn default_deep_sample_size() -> usize {
    DEFAULT_DEEP_SAMPLE_SIZE
}

fn default_plausible_channel_count() -> usize {
    DEFAULT_PLAUSIBLE_CHANNEL_COUNT
}

fn default_min_stream_bytes() -> usize {
    DEFAULT_MIN_STREAM_BYTES
}

fn default_max_probe_bytes() -> usize {
    DEFAULT_MAX_PROBE_BYTES
}

fn default_deep_timeout_extra() -> Duration {
    parse_default(DEFAULT_DEEP_TIMEOUT_EXTRA, 5)
}

fn default_test_concurrency() -> usize {
    DEFAULT_TEST_CONCURRENCY
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: Some(DEFAULT_MAX_CONNECTIONS),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            fetch_timeout: default_fetch_timeout(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_test_cache_capacity(),
            deep_sample_size: default_deep_sample_size(),
            plausible_channel_count: default_plausible_channel_count(),
            min_stream_bytes: default_min_stream_bytes(),
            max_probe_bytes: default_max_probe_bytes(),
            deep_timeout_extra: default_deep_timeout_extra(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            test_concurrency: default_test_concurrency(),
        }
    }
}

impl Config {
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }
}

/// Everything a workflow run needs, resolved from the config file and the
/// stored user settings
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub test_mode: TestMode,
    pub format: OutputFormat,
    pub dedupe: bool,
    /// Per-link test timeout
    pub test_timeout: Duration,
    /// Timeout for downloading a whole playlist
    pub fetch_timeout: Duration,
    pub test_concurrency: usize,
}

impl PipelineOptions {
    pub fn from_parts(config: &Config, settings: &Settings) -> Self {
        Self {
            test_mode: settings.test_mode,
            format: settings.format,
            dedupe: settings.dedupe,
            test_timeout: Duration::from_secs(settings.timeout_seconds.max(1)),
            fetch_timeout: config.http.fetch_timeout,
            test_concurrency: config.batch.test_concurrency.max(1),
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_parts(&Config::default(), &Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [tester]
            plausible_channel_count = 20
            deep_timeout_extra = "8s"

            [http]
            fetch_timeout = "1m"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.tester.plausible_channel_count, 20);
        assert_eq!(parsed.tester.deep_sample_size, DEFAULT_DEEP_SAMPLE_SIZE);
        assert_eq!(parsed.tester.deep_timeout_extra, Duration::from_secs(8));
        assert_eq!(parsed.http.fetch_timeout, Duration::from_secs(60));
        assert_eq!(parsed.batch.test_concurrency, DEFAULT_TEST_CONCURRENCY);
        assert_eq!(parsed.database.url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn test_load_from_file_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let created = Config::load_from_file(path).unwrap();
        assert!(std::path::Path::new(path).exists());
        let loaded = Config::load_from_file(path).unwrap();
        assert_eq!(created, loaded);
    }

    #[test]
    fn test_pipeline_options_from_settings() {
        let settings = Settings {
            timeout_seconds: 3,
            dedupe: true,
            test_mode: TestMode::Deep,
            ..Settings::default()
        };
        let options = PipelineOptions::from_parts(&Config::default(), &settings);
        assert_eq!(options.test_timeout, Duration::from_secs(3));
        assert!(options.dedupe);
        assert_eq!(options.test_mode, TestMode::Deep);
        assert_eq!(options.test_concurrency, DEFAULT_TEST_CONCURRENCY);
    }
}
