//! M3U/M3U8 playlist parsing
//!
//! Parsing is lenient: unknown directives, blank lines and stray URLs are
//! skipped, and an `#EXTINF` line with no following URL is dropped. The
//! parser never fails; garbage input yields an empty playlist.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use super::classifier::CountryClassifier;
use super::dedupe::dedupe;
use super::expiry::extract_expiry;
use crate::models::{Channel, CountryCode, DEFAULT_GROUP, ExpiryInfo, Group};
use crate::utils::url::UrlUtils;

const EXTINF_PREFIX: &str = "#EXTINF:";

/// Result of parsing one playlist document
#[derive(Debug, Clone)]
pub struct ParsedPlaylist {
    pub channels: Vec<Arc<Channel>>,
    pub groups: Vec<Group>,
    pub expiry: ExpiryInfo,
}

impl ParsedPlaylist {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Look a group up by its exact label
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Drop repeated stream URLs, keeping group membership consistent
    ///
    /// Groups left without channels are removed. Returns the number of
    /// channels dropped.
    pub fn deduplicated(mut self) -> (Self, usize) {
        let (unique, removed) = dedupe(&self.channels);
        if removed == 0 {
            return (self, 0);
        }

        let kept: HashSet<*const Channel> = unique.iter().map(Arc::as_ptr).collect();
        for group in &mut self.groups {
            group.channels.retain(|c| kept.contains(&Arc::as_ptr(c)));
        }
        self.groups.retain(|g| !g.is_empty());
        self.channels = unique;
        (self, removed)
    }

    /// Channels whose group is classified as one of `countries`, in playlist order
    pub fn channels_for_countries(&self, countries: &HashSet<CountryCode>) -> Vec<Arc<Channel>> {
        let selected: HashSet<&str> = self
            .groups
            .iter()
            .filter(|g| countries.contains(&g.country))
            .map(|g| g.name.as_str())
            .collect();
        self.channels
            .iter()
            .filter(|c| selected.contains(c.group.as_str()))
            .cloned()
            .collect()
    }
}

/// Attributes of an `#EXTINF` line awaiting its URL
#[derive(Debug, Default)]
struct PendingEntry {
    name: String,
    group: String,
    logo: Option<String>,
    tvg_id: Option<String>,
    tvg_name: Option<String>,
}

impl PendingEntry {
    fn from_extinf(line: &str) -> Self {
        let body = &line[EXTINF_PREFIX.len()..];
        let group = attribute(body, "group-title")
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| DEFAULT_GROUP.to_string());

        Self {
            name: display_name(body),
            group,
            logo: attribute(body, "tvg-logo").filter(|v| !v.is_empty()),
            tvg_id: attribute(body, "tvg-id").filter(|v| !v.is_empty()),
            tvg_name: attribute(body, "tvg-name").filter(|v| !v.is_empty()),
        }
    }

    fn into_channel(self, url: &str) -> Channel {
        Channel {
            name: self.name,
            group: self.group,
            logo: self.logo,
            tvg_id: self.tvg_id,
            tvg_name: self.tvg_name,
            url: url.to_string(),
        }
    }
}

/// Read a quoted `key="value"` attribute
fn attribute(body: &str, key: &str) -> Option<String> {
    let needle = format!("{key}=\"");
    let start = body.find(&needle)? + needle.len();
    let end = body[start..].find('"')?;
    Some(body[start..start + end].trim().to_string())
}

/// The display name follows the last comma outside of quoted attribute values
fn display_name(body: &str) -> String {
    let mut in_quotes = false;
    let mut last_comma = None;
    for (i, c) in body.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => last_comma = Some(i),
            _ => {}
        }
    }
    match last_comma {
        Some(i) => body[i + 1..].trim().to_string(),
        None => String::new(),
    }
}

/// Parse a playlist, classifying groups with a fresh classifier
pub fn parse(text: &str, source_url: &str) -> ParsedPlaylist {
    parse_with(text, source_url, &CountryClassifier::new())
}

/// Parse a playlist, classifying groups with a shared classifier
pub fn parse_with(text: &str, source_url: &str, classifier: &CountryClassifier) -> ParsedPlaylist {
    let mut channels: Vec<Arc<Channel>> = Vec::new();
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut pending: Option<PendingEntry> = None;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }

        if line.starts_with(EXTINF_PREFIX) {
            pending = Some(PendingEntry::from_extinf(line));
        } else if UrlUtils::has_stream_scheme(line) {
            let Some(entry) = pending.take() else {
                continue;
            };
            let channel = Arc::new(entry.into_channel(line));

            let position = *index.entry(channel.group.clone()).or_insert_with(|| {
                groups.push(Group::new(channel.group.clone(), channel.logo.clone()));
                groups.len() - 1
            });
            groups[position].channels.push(Arc::clone(&channel));
            channels.push(channel);
        }
    }

    for group in &mut groups {
        group.country = classifier.classify(&group.name);
    }

    let expiry = extract_expiry(text, source_url);

    debug!(
        "Parsed {} channels in {} groups from {}",
        channels.len(),
        groups.len(),
        UrlUtils::obfuscate_credentials(source_url)
    );

    ParsedPlaylist {
        channels,
        groups,
        expiry,
    }
}
