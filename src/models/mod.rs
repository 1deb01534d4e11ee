use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod country;

pub use country::CountryCode;

/// Group label used when an entry carries no `group-title`
pub const DEFAULT_GROUP: &str = "Other";

/// One playable entry of a playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub group: String,
    pub logo: Option<String>,
    pub tvg_id: Option<String>,
    pub tvg_name: Option<String>,
    pub url: String,
}

/// Channels sharing a `group-title` label, in first-seen order
#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub channels: Vec<Arc<Channel>>,
    pub logo: Option<String>,
    pub country: CountryCode,
}

impl Group {
    pub fn new(name: impl Into<String>, logo: Option<String>) -> Self {
        Self {
            name: name.into(),
            channels: Vec::new(),
            logo,
            country: CountryCode::Other,
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Outcome of one link test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub success: bool,
    pub detail: String,
}

impl TestResult {
    pub fn ok(detail: impl Into<String>) -> Self {
        Self {
            success: true,
            detail: detail.into(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: detail.into(),
        }
    }
}

/// Expiration derived from a playlist link or body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpiryInfo {
    Unknown,
    Date { at: DateTime<Utc>, expired: bool },
}

impl ExpiryInfo {
    pub const UNKNOWN_LABEL: &'static str = "Unknown";
    pub const EXPIRED_QUALIFIER: &'static str = "(EXPIRED)";

    /// Build from an instant, comparing against `now`
    pub fn at(at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        ExpiryInfo::Date {
            at,
            expired: at < now,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, ExpiryInfo::Date { .. })
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, ExpiryInfo::Date { expired: true, .. })
    }

    /// `dd.mm.yyyy` of the expiry, without qualifier
    pub fn date_label(&self) -> Option<String> {
        match self {
            ExpiryInfo::Unknown => None,
            ExpiryInfo::Date { at, .. } => Some(at.format("%d.%m.%Y").to_string()),
        }
    }

    /// The `DDMMYYYY` stamp used in output filenames
    ///
    /// Falls back to `today` when the expiry is unknown or already past.
    pub fn filename_stamp(&self, today: NaiveDate) -> String {
        match self {
            ExpiryInfo::Date { at, expired: false } => at.format("%d%m%Y").to_string(),
            _ => today.format("%d%m%Y").to_string(),
        }
    }
}

impl std::fmt::Display for ExpiryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpiryInfo::Unknown => f.write_str(Self::UNKNOWN_LABEL),
            ExpiryInfo::Date { at, expired } => {
                write!(f, "{}", at.format("%d.%m.%Y"))?;
                if *expired {
                    write!(f, " {}", Self::EXPIRED_QUALIFIER)?;
                }
                Ok(())
            }
        }
    }
}

/// Liveness check flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    /// HEAD request only
    #[default]
    Quick,
    /// Download and inspect the first bytes of the body
    Deep,
}

impl std::fmt::Display for TestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestMode::Quick => write!(f, "quick"),
            TestMode::Deep => write!(f, "deep"),
        }
    }
}

impl std::str::FromStr for TestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quick" => Ok(TestMode::Quick),
            "deep" => Ok(TestMode::Deep),
            _ => Err(format!("Unknown test mode: {s}")),
        }
    }
}

/// Output playlist format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    M3u,
    M3u8,
    Txt,
}

impl OutputFormat {
    /// File extension including the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::M3u => ".m3u",
            OutputFormat::M3u8 => ".m3u8",
            OutputFormat::Txt => ".txt",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::M3u => write!(f, "m3u"),
            OutputFormat::M3u8 => write!(f, "m3u8"),
            OutputFormat::Txt => write!(f, "txt"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "m3u" => Ok(OutputFormat::M3u),
            "m3u8" => Ok(OutputFormat::M3u8),
            "txt" => Ok(OutputFormat::Txt),
            _ => Err(format!("Unknown output format: {s}")),
        }
    }
}

/// User preferences kept in the settings table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub theme: String,
    pub test_mode: TestMode,
    pub format: OutputFormat,
    pub dedupe: bool,
    pub timeout_seconds: u64,
}

impl Settings {
    pub const KEY_THEME: &'static str = "theme";
    pub const KEY_TEST_MODE: &'static str = "test_mode";
    pub const KEY_FORMAT: &'static str = "format";
    pub const KEY_DEDUPE: &'static str = "dedupe";
    pub const KEY_TIMEOUT_SECONDS: &'static str = "timeout_seconds";

    /// Key/value pairs as stored
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (Self::KEY_THEME, self.theme.clone()),
            (Self::KEY_TEST_MODE, self.test_mode.to_string()),
            (Self::KEY_FORMAT, self.format.to_string()),
            (Self::KEY_DEDUPE, self.dedupe.to_string()),
            (Self::KEY_TIMEOUT_SECONDS, self.timeout_seconds.to_string()),
        ]
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            test_mode: TestMode::Quick,
            format: OutputFormat::M3u,
            dedupe: false,
            timeout_seconds: 10,
        }
    }
}

/// A saved playlist link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub url: String,
    pub name: String,
    pub expiry: String,
    pub channel_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Request to create or refresh a favorite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFavoriteRequest {
    pub url: String,
    pub name: String,
    pub expiry: String,
    pub channel_count: i64,
}

/// Usage counters of one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStat {
    pub date: NaiveDate,
    pub tested: i64,
    pub working: i64,
    pub channels: i64,
    pub files: i64,
}

/// Additive increment applied to a day's usage counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageDelta {
    pub tested: i64,
    pub working: i64,
    pub channels: i64,
    pub files: i64,
}

impl UsageDelta {
    pub fn is_empty(&self) -> bool {
        self.tested == 0 && self.working == 0 && self.channels == 0 && self.files == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    #[test]
    fn test_expiry_display() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let future = ExpiryInfo::at(Utc.with_ymd_and_hms(2027, 3, 5, 12, 0, 0).unwrap(), now);
        assert_eq!(future.to_string(), "05.03.2027");
        assert!(!future.is_expired());

        let past = ExpiryInfo::at(Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap(), now);
        assert_eq!(past.to_string(), "05.03.2025 (EXPIRED)");
        assert!(past.is_expired());

        assert_eq!(ExpiryInfo::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn test_filename_stamp_falls_back_to_today() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        let future = ExpiryInfo::at(Utc.with_ymd_and_hms(2027, 3, 5, 0, 0, 0).unwrap(), now);
        assert_eq!(future.filename_stamp(today), "05032027");

        let past = ExpiryInfo::at(Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap(), now);
        assert_eq!(past.filename_stamp(today), "01012026");
        assert_eq!(ExpiryInfo::Unknown.filename_stamp(today), "01012026");
    }

    #[test]
    fn test_mode_and_format_parsing() {
        assert_eq!(TestMode::from_str("Deep"), Ok(TestMode::Deep));
        assert!(TestMode::from_str("slow").is_err());
        assert_eq!(OutputFormat::from_str(".M3U8"), Ok(OutputFormat::M3u8));
        assert_eq!(OutputFormat::Txt.extension(), ".txt");
        assert!(OutputFormat::from_str("pls").is_err());
    }
}
