//! Best-effort extraction of a playlist's expiration date
//!
//! Providers leak the subscription end in several places: as a query
//! parameter on the playlist link, as `exp=` fragments or JSON fields inside
//! the body, or as a plain `dd.mm.yyyy` next to a keyword. The extractor tries
//! these in that order and gives up with [`ExpiryInfo::Unknown`].

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;
use tracing::debug;

use crate::models::ExpiryInfo;
use crate::utils::url::UrlUtils;

/// Query / field names that carry an expiry timestamp
pub const EXPIRY_KEYS: [&str; 5] = ["exp", "expires", "expire", "e", "expiry"];

/// Only this many leading bytes of a body are scanned
pub const CONTENT_SCAN_LIMIT: usize = 8 * 1024;

/// Timestamps above this are taken as milliseconds
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// 2024-01-01T00:00:00Z, inclusive
const WINDOW_START: i64 = 1_704_067_200;
/// 2030-01-01T00:00:00Z, exclusive
const WINDOW_END: i64 = 1_893_456_000;

/// Extract the expiry relative to the current time
pub fn extract_expiry(content: &str, source_url: &str) -> ExpiryInfo {
    extract_expiry_at(content, source_url, Utc::now())
}

/// Extract the expiry relative to `now`
pub fn extract_expiry_at(content: &str, source_url: &str, now: DateTime<Utc>) -> ExpiryInfo {
    let found = from_url(source_url)
        .or_else(|| from_content_timestamps(content))
        .or_else(|| from_content_dates(content));

    match found {
        Some(at) => {
            debug!(
                "Resolved expiry {} for {}",
                at,
                UrlUtils::obfuscate_credentials(source_url)
            );
            ExpiryInfo::at(at, now)
        }
        None => ExpiryInfo::Unknown,
    }
}

/// Interpret a raw numeric value as a Unix timestamp inside the accepted window
pub fn timestamp_in_window(raw: &str) -> Option<DateTime<Utc>> {
    let mut seconds: i64 = raw.trim().parse().ok()?;
    if seconds > MILLIS_THRESHOLD {
        seconds /= 1000;
    }
    if !(WINDOW_START..WINDOW_END).contains(&seconds) {
        return None;
    }
    Utc.timestamp_opt(seconds, 0).single()
}

/// First expiry-like query value that is a usable timestamp
fn from_url(source_url: &str) -> Option<DateTime<Utc>> {
    UrlUtils::find_query_params(source_url, &EXPIRY_KEYS)
        .iter()
        .find_map(|value| timestamp_in_window(value))
}

fn scan_prefix(content: &str) -> &str {
    if content.len() <= CONTENT_SCAN_LIMIT {
        return content;
    }
    let mut end = CONTENT_SCAN_LIMIT;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

fn from_content_timestamps(content: &str) -> Option<DateTime<Utc>> {
    let prefix = scan_prefix(content);
    [query_fragment_regex(), json_field_regex(), bare_timestamp_regex()]
        .into_iter()
        .flat_map(|re| re.captures_iter(prefix))
        .filter_map(|caps| caps.get(1))
        .find_map(|m| timestamp_in_window(m.as_str()))
}

fn from_content_dates(content: &str) -> Option<DateTime<Utc>> {
    let prefix = scan_prefix(content);
    keyword_date_regex().captures_iter(prefix).find_map(|caps| {
        let day: u32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
        let year: i32 = caps.get(3)?.as_str().parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let at = date.and_hms_opt(0, 0, 0)?.and_utc();
        timestamp_in_window(&at.timestamp().to_string())
    })
}

fn query_fragment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[?&](?:exp|expires|expire|e|expiry)=(\d{10,13})\b")
            .expect("query fragment pattern is valid")
    })
}

fn json_field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)["'](?:exp|expires|expire|e|expiry)["']\s*:\s*["']?(\d{10,13})\b"#)
            .expect("json field pattern is valid")
    })
}

fn bare_timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bexp[a-z_]*\D{0,20}?\b(\d{10,13})\b")
            .expect("bare timestamp pattern is valid")
    })
}

fn keyword_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:exp[a-z]*|valid[a-z]*|until|biti[sş][a-z]*|son\s+kullanma)\D{0,30}?\b(\d{1,2})[./-](\d{1,2})[./-](\d{4})\b",
        )
        .expect("keyword date pattern is valid")
    })
}
