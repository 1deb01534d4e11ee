//! Manual workflow: load one playlist, pick groups, export one file

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::batch::FileManifestEntry;
use super::output_sink::OutputSink;
use crate::database::PersistentStore;
use crate::errors::{AppError, AppResult};
use crate::models::{Channel, Group, OutputFormat, UsageDelta};
use crate::playlist::{CountryClassifier, ParsedPlaylist, output_filename, parse_with, render};
use crate::utils::http_client::HttpProbe;
use crate::utils::url::UrlUtils;

/// A loaded playlist and the groups picked for export
#[derive(Debug)]
pub struct ManualSession {
    source_url: String,
    playlist: ParsedPlaylist,
    selected: HashSet<String>,
    duplicates_removed: usize,
}

impl ManualSession {
    /// Fetch and parse `url` once
    pub async fn load(
        probe: &dyn HttpProbe,
        classifier: &CountryClassifier,
        url: &str,
        fetch_timeout: std::time::Duration,
        dedupe: bool,
    ) -> AppResult<Self> {
        UrlUtils::parse_link(url).map_err(AppError::validation)?;
        let body = probe.fetch_text(url, fetch_timeout).await?;
        Ok(Self::from_text(&body, url, classifier, dedupe))
    }

    /// Build a session from an already downloaded body
    pub fn from_text(body: &str, url: &str, classifier: &CountryClassifier, dedupe: bool) -> Self {
        let mut playlist = parse_with(body, url, classifier);
        let mut duplicates_removed = 0;
        if dedupe {
            let (unique, removed) = playlist.deduplicated();
            playlist = unique;
            duplicates_removed = removed;
        }
        info!(
            "Loaded {} channels in {} groups from {}",
            playlist.channel_count(),
            playlist.groups.len(),
            UrlUtils::obfuscate_credentials(url)
        );
        Self {
            source_url: url.to_string(),
            playlist,
            selected: HashSet::new(),
            duplicates_removed,
        }
    }

    pub fn playlist(&self) -> &ParsedPlaylist {
        &self.playlist
    }

    pub fn duplicates_removed(&self) -> usize {
        self.duplicates_removed
    }

    /// Groups ordered for display: featured countries first, then by
    /// country priority and label
    pub fn groups_sorted(&self) -> Vec<&Group> {
        let mut groups: Vec<&Group> = self.playlist.groups.iter().collect();
        groups.sort_by(|a, b| {
            a.country
                .priority()
                .cmp(&b.country.priority())
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        groups
    }

    /// Select a group by label; unknown labels are an error
    pub fn select(&mut self, group: &str) -> AppResult<()> {
        if self.playlist.group(group).is_none() {
            return Err(AppError::validation(format!("Unknown group: '{group}'")));
        }
        self.selected.insert(group.to_string());
        Ok(())
    }

    pub fn deselect(&mut self, group: &str) {
        self.selected.remove(group);
    }

    pub fn select_all(&mut self) {
        self.selected = self.playlist.groups.iter().map(|g| g.name.clone()).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, group: &str) -> bool {
        self.selected.contains(group)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Channels of the selected groups, group by group in first-seen order
    pub fn selected_channels(&self) -> Vec<Arc<Channel>> {
        self.playlist
            .groups
            .iter()
            .filter(|g| self.selected.contains(&g.name))
            .flat_map(|g| g.channels.iter().cloned())
            .collect()
    }

    /// Write the selected groups to a single file
    pub async fn export(
        &self,
        format: OutputFormat,
        sink: &dyn OutputSink,
        store: Option<&PersistentStore>,
    ) -> AppResult<FileManifestEntry> {
        if self.selected.is_empty() {
            return Err(AppError::validation("Select at least one group"));
        }

        let channels = self.selected_channels();
        let filename = output_filename(
            &self.playlist.expiry,
            &self.source_url,
            format,
            Utc::now().date_naive(),
        );
        let path = sink.write_file(&filename, &render(&channels, format)).await?;
        info!("Exported {} channels to {}", channels.len(), path.display());

        if let Some(store) = store
            && let Err(e) = store
                .record_usage(UsageDelta {
                    channels: channels.len() as i64,
                    files: 1,
                    ..Default::default()
                })
                .await
        {
            warn!("Failed to record usage statistics: {}", e);
        }

        Ok(FileManifestEntry {
            source_url: self.source_url.clone(),
            filename,
            path: Some(path),
            channels: channels.len(),
            expiry: self.playlist.expiry,
            error: None,
        })
    }
}
