/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./m3u-sieve.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

// Output defaults
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "./output";

// HTTP defaults
pub const DEFAULT_CONNECT_TIMEOUT: &str = "5s";
pub const DEFAULT_FETCH_TIMEOUT: &str = "30s";
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

// Link tester defaults
pub const DEFAULT_TEST_CACHE_CAPACITY: usize = 256;
pub const DEFAULT_DEEP_SAMPLE_SIZE: usize = 3;
pub const DEFAULT_PLAUSIBLE_CHANNEL_COUNT: usize = 50;
pub const DEFAULT_MIN_STREAM_BYTES: usize = 1024;
pub const DEFAULT_MAX_PROBE_BYTES: usize = 32 * 1024; // 32KB
pub const DEFAULT_DEEP_TIMEOUT_EXTRA: &str = "5s";

// Batch defaults
pub const DEFAULT_TEST_CONCURRENCY: usize = 4;
