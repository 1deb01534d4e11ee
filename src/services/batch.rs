//! Auto workflow: test many links, then export the selected countries of
//! every working one
//!
//! The orchestrator owns the workflow state and drives two phases:
//!
//! 1. **Testing** runs link tests on worker tasks with bounded concurrency.
//!    Results are reported in the order of the input list. A cancellation
//!    token is checked before each link starts; tests already running finish.
//! 2. **Processing** fetches and parses each working link, keeps the channels
//!    of groups classified as one of the selected countries and writes one
//!    file per link. It only starts when at least one link works, and the
//!    token is checked again before each fetch.
//!
//! Failures of individual links are logged and reported but never abort the
//! run.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::link_tester::LinkTester;
use super::output_sink::OutputSink;
use super::progress::{BatchState, ProgressEvent, ProgressReporter, percent};
use crate::config::PipelineOptions;
use crate::database::PersistentStore;
use crate::errors::{AppError, AppResult};
use crate::models::{CountryCode, ExpiryInfo, TestResult, UsageDelta};
use crate::playlist::{CountryClassifier, output_filename, parse_with, render};
use crate::utils::http_client::HttpProbe;
use crate::utils::url::UrlUtils;

/// Outcome of testing one link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTestOutcome {
    pub url: String,
    pub result: TestResult,
}

/// Result of the testing phase
#[derive(Debug, Clone, Default)]
pub struct TestPhaseReport {
    /// One entry per link that was started, in input order
    pub outcomes: Vec<LinkTestOutcome>,
    pub cancelled: bool,
}

impl TestPhaseReport {
    pub fn working_links(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.result.success)
            .map(|o| o.url.clone())
            .collect()
    }

    pub fn working_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.success).count()
    }
}

/// One generated file, or the attempt to write it
#[derive(Debug, Clone, PartialEq)]
pub struct FileManifestEntry {
    pub source_url: String,
    pub filename: String,
    pub path: Option<PathBuf>,
    pub channels: usize,
    pub expiry: ExpiryInfo,
    /// Set when writing the file failed
    pub error: Option<String>,
}

/// A working link that produced no file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLink {
    pub url: String,
    pub reason: String,
}

/// Final result of an auto workflow run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub tests: TestPhaseReport,
    pub files: Vec<FileManifestEntry>,
    pub skipped: Vec<SkippedLink>,
    pub channels_seen: usize,
    pub channels_written: usize,
    pub duplicates_removed: usize,
    /// Processing stopped early; files written before the stop are kept
    pub processing_cancelled: bool,
}

impl BatchReport {
    pub fn files_written(&self) -> usize {
        self.files.iter().filter(|f| f.error.is_none()).count()
    }

    pub fn cancelled(&self) -> bool {
        self.tests.cancelled || self.processing_cancelled
    }
}

pub struct BatchOrchestrator {
    probe: Arc<dyn HttpProbe>,
    tester: Arc<LinkTester>,
    classifier: Arc<CountryClassifier>,
    sink: Arc<dyn OutputSink>,
    store: Option<PersistentStore>,
    options: PipelineOptions,
    progress: ProgressReporter,
    state: BatchState,
}

impl BatchOrchestrator {
    pub fn new(
        probe: Arc<dyn HttpProbe>,
        tester: Arc<LinkTester>,
        sink: Arc<dyn OutputSink>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            probe,
            tester,
            classifier: Arc::new(CountryClassifier::new()),
            sink,
            store: None,
            options,
            progress: ProgressReporter::disabled(),
            state: BatchState::Idle,
        }
    }

    /// Record usage counters in `store`
    pub fn with_store(mut self, store: PersistentStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Share a classifier memo with other workflows
    pub fn with_classifier(mut self, classifier: Arc<CountryClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    fn transition(&mut self, state: BatchState) {
        debug!("Batch state {} -> {}", self.state, state);
        self.state = state;
        self.progress.phase(state);
    }

    /// Check that every link is an absolute URL with a supported scheme
    pub fn validate_links(links: &[String]) -> AppResult<Vec<String>> {
        if links.is_empty() {
            return Err(AppError::validation("At least one link is required"));
        }
        links
            .iter()
            .map(|link| {
                UrlUtils::parse_link(link)
                    .map(|_| link.trim().to_string())
                    .map_err(AppError::validation)
            })
            .collect()
    }

    /// Run the complete workflow: validate, test, then process working links
    pub async fn run(
        &mut self,
        links: &[String],
        countries: &HashSet<CountryCode>,
        cancel: &CancellationToken,
    ) -> AppResult<BatchReport> {
        if countries.is_empty() {
            return Err(AppError::validation("Select at least one country"));
        }
        let tests = self.run_tests(links, cancel).await?;
        if tests.cancelled {
            return Ok(BatchReport {
                tests,
                ..Default::default()
            });
        }
        let working = tests.working_links();
        if working.is_empty() {
            info!("No working links, nothing to process");
            self.progress.log("No working links found");
            return Ok(BatchReport {
                tests,
                ..Default::default()
            });
        }
        let mut report = self.process(&working, countries, cancel).await?;
        report.tests = tests;
        Ok(report)
    }

    /// Testing phase
    pub async fn run_tests(
        &mut self,
        links: &[String],
        cancel: &CancellationToken,
    ) -> AppResult<TestPhaseReport> {
        let links = Self::validate_links(links)?;
        let total = links.len();
        self.transition(BatchState::Testing);
        info!(
            "Testing {} links ({} mode, concurrency {})",
            total, self.options.test_mode, self.options.test_concurrency
        );

        let mode = self.options.test_mode;
        let timeout = self.options.test_timeout;
        let tester = Arc::clone(&self.tester);
        let mut results = stream::iter(links.into_iter().map(move |url| {
            let tester = Arc::clone(&tester);
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return None;
                }
                let task_url = url.clone();
                let result =
                    tokio::spawn(async move { tester.test(&task_url, mode, timeout).await })
                        .await
                        .unwrap_or_else(|e| TestResult::failed(format!("Test task failed: {e}")));
                Some(LinkTestOutcome { url, result })
            }
        }))
        .buffered(self.options.test_concurrency.max(1));

        let mut report = TestPhaseReport::default();
        let (mut working, mut failed) = (0, 0);
        while let Some(outcome) = results.next().await {
            let Some(outcome) = outcome else {
                report.cancelled = true;
                continue;
            };
            if outcome.result.success {
                working += 1;
            } else {
                failed += 1;
            }
            self.progress.emit(ProgressEvent::LinkTested {
                index: report.outcomes.len(),
                total,
                url: UrlUtils::obfuscate_credentials(&outcome.url),
                result: outcome.result.clone(),
                working,
                failed,
                percent: percent(report.outcomes.len() + 1, total),
            });
            report.outcomes.push(outcome);
        }
        drop(results);

        if report.cancelled || cancel.is_cancelled() {
            report.cancelled = true;
            info!(
                "Testing cancelled after {} of {} links",
                report.outcomes.len(),
                total
            );
            self.transition(BatchState::Cancelled);
        } else {
            info!("Testing finished: {} working, {} failed", working, failed);
            self.transition(BatchState::TestsComplete);
        }

        self.record(UsageDelta {
            tested: report.outcomes.len() as i64,
            working: working as i64,
            ..Default::default()
        })
        .await;

        Ok(report)
    }

    /// Processing phase over links already known to work
    ///
    /// The cancellation token is checked before each link is fetched.
    pub async fn process(
        &mut self,
        working_links: &[String],
        countries: &HashSet<CountryCode>,
        cancel: &CancellationToken,
    ) -> AppResult<BatchReport> {
        if countries.is_empty() {
            return Err(AppError::validation("Select at least one country"));
        }
        if working_links.is_empty() {
            return Err(AppError::validation("No working links to process"));
        }
        if self.state == BatchState::Cancelled {
            return Err(AppError::validation("Workflow was cancelled"));
        }

        self.transition(BatchState::Processing);
        let mut report = BatchReport::default();
        let total = working_links.len();
        let today = Utc::now().date_naive();

        for (index, url) in working_links.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Processing cancelled after {} of {} links", index, total);
                report.processing_cancelled = true;
                break;
            }
            let label = UrlUtils::obfuscate_credentials(url);
            self.progress.emit(ProgressEvent::Processing {
                index,
                total,
                label: label.clone(),
                percent: percent(index, total),
            });

            let body = match self.probe.fetch_text(url, self.options.fetch_timeout).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Skipping {}: {}", label, e);
                    self.progress.log(format!("Skipped {label}: {}", e.reason()));
                    report.skipped.push(SkippedLink {
                        url: url.clone(),
                        reason: e.reason(),
                    });
                    continue;
                }
            };

            let mut playlist = parse_with(&body, url, &self.classifier);
            report.channels_seen += playlist.channel_count();
            if self.options.dedupe {
                let (unique, removed) = playlist.deduplicated();
                playlist = unique;
                report.duplicates_removed += removed;
            }

            let selected = playlist.channels_for_countries(countries);
            if selected.is_empty() {
                debug!("No channels of the selected countries in {}", label);
                report.skipped.push(SkippedLink {
                    url: url.clone(),
                    reason: "No channels for the selected countries".to_string(),
                });
                continue;
            }

            let filename = output_filename(&playlist.expiry, url, self.options.format, today);
            let contents = render(&selected, self.options.format);
            let mut entry = FileManifestEntry {
                source_url: url.clone(),
                filename: filename.clone(),
                path: None,
                channels: selected.len(),
                expiry: playlist.expiry,
                error: None,
            };

            match self.sink.write_file(&filename, &contents).await {
                Ok(path) => {
                    info!("Wrote {} channels to {}", selected.len(), path.display());
                    report.channels_written += selected.len();
                    self.progress.emit(ProgressEvent::FileWritten {
                        filename: filename.clone(),
                        channels: selected.len(),
                    });
                    entry.path = Some(path);
                }
                Err(e) => {
                    warn!("Failed to write {}: {}", filename, e);
                    self.progress.log(format!("Failed to write {filename}: {e}"));
                    entry.error = Some(e.to_string());
                }
            }
            report.files.push(entry);
        }

        self.record(UsageDelta {
            channels: report.channels_written as i64,
            files: report.files_written() as i64,
            ..Default::default()
        })
        .await;

        if report.processing_cancelled {
            self.transition(BatchState::Cancelled);
            return Ok(report);
        }

        self.progress.emit(ProgressEvent::Completed {
            channels_seen: report.channels_seen,
            channels_written: report.channels_written,
            files_written: report.files_written(),
        });
        info!(
            "Processing finished: {} channels seen, {} written to {} files",
            report.channels_seen,
            report.channels_written,
            report.files_written()
        );
        self.transition(BatchState::Done);
        Ok(report)
    }

    async fn record(&self, delta: UsageDelta) {
        if let Some(store) = &self.store
            && let Err(e) = store.record_usage(delta).await
        {
            warn!("Failed to record usage statistics: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TesterConfig;
    use crate::errors::{SourceError, SourceResult};
    use crate::models::TestMode;
    use crate::services::output_sink::LocalOutputDirectory;
    use crate::utils::http_client::ProbeResponse;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeProbe {
        statuses: HashMap<String, u16>,
        bodies: HashMap<String, String>,
        /// HEAD latency per URL
        delays: HashMap<String, Duration>,
        /// Cancelled by the first `fetch_text`
        cancel_on_fetch: Option<CancellationToken>,
    }

    #[async_trait]
    impl HttpProbe for FakeProbe {
        async fn head_status(&self, url: &str, _: Duration, _: &str) -> SourceResult<u16> {
            if let Some(delay) = self.delays.get(url) {
                tokio::time::sleep(*delay).await;
            }
            Ok(*self.statuses.get(url).unwrap_or(&404))
        }

        async fn get_prefix(
            &self,
            url: &str,
            _: usize,
            _: Duration,
            _: &str,
        ) -> SourceResult<ProbeResponse> {
            Ok(ProbeResponse {
                status: *self.statuses.get(url).unwrap_or(&404),
                ..Default::default()
            })
        }

        async fn fetch_text(&self, url: &str, _: Duration) -> SourceResult<String> {
            if let Some(cancel) = &self.cancel_on_fetch {
                cancel.cancel();
            }
            self.bodies
                .get(url)
                .cloned()
                .ok_or(SourceError::Http { status: 404 })
        }
    }

    fn links(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    fn orchestrator(probe: FakeProbe, dir: &std::path::Path) -> BatchOrchestrator {
        let probe: Arc<dyn HttpProbe> = Arc::new(probe);
        let tester = Arc::new(LinkTester::new(
            probe.clone(),
            TesterConfig::default(),
            Duration::from_secs(1),
        ));
        let options = PipelineOptions {
            test_mode: TestMode::Quick,
            ..PipelineOptions::default()
        };
        BatchOrchestrator::new(
            probe,
            tester,
            Arc::new(LocalOutputDirectory::new(dir)),
            options,
        )
    }

    #[tokio::test]
    async fn test_rejects_invalid_input_before_work() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = orchestrator(FakeProbe::default(), dir.path());
        let cancel = CancellationToken::new();
        let turkey = HashSet::from([CountryCode::Turkey]);

        assert!(matches!(
            batch.run(&[], &turkey, &cancel).await,
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            batch
                .run(&["ftp://x/list".to_string()], &turkey, &cancel)
                .await,
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            batch
                .run(&["http://x/list".to_string()], &HashSet::new(), &cancel)
                .await,
            Err(AppError::Validation { .. })
        ));
        assert_eq!(batch.state(), BatchState::Idle);
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = FakeProbe::default();
        probe.statuses.insert("http://b/list".into(), 200);
        let mut batch = orchestrator(probe, dir.path());

        let links: Vec<String> = ["http://a/list", "http://b/list", "http://c/list"]
            .into_iter()
            .map(String::from)
            .collect();
        let report = batch
            .run_tests(&links, &CancellationToken::new())
            .await
            .unwrap();

        let urls: Vec<&str> = report.outcomes.iter().map(|o| o.url.as_str()).collect();
        assert_eq!(urls, vec!["http://a/list", "http://b/list", "http://c/list"]);
        assert_eq!(report.working_links(), vec!["http://b/list".to_string()]);
        assert_eq!(batch.state(), BatchState::TestsComplete);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = FakeProbe::default();
        probe.statuses.insert("http://a/list".into(), 200);
        let mut batch = orchestrator(probe, dir.path());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = batch
            .run(
                &["http://a/list".to_string()],
                &HashSet::from([CountryCode::Turkey]),
                &cancel,
            )
            .await
            .unwrap();

        assert!(report.cancelled());
        assert!(report.tests.outcomes.is_empty());
        assert!(report.files.is_empty());
        assert_eq!(batch.state(), BatchState::Cancelled);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_link_without_selected_channels_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = FakeProbe::default();
        probe.bodies.insert(
            "http://a/list".into(),
            "#EXTINF:-1 group-title=\"FR\",A\nhttp://a/1\n".into(),
        );
        let mut batch = orchestrator(probe, dir.path());

        let report = batch
            .process(
                &["http://a/list".to_string(), "http://gone/list".to_string()],
                &HashSet::from([CountryCode::Turkey]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.files_written(), 0);
        assert_eq!(report.channels_seen, 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[1].reason, "HTTP 404");
        assert_eq!(batch.state(), BatchState::Done);
    }

    #[tokio::test]
    async fn test_results_keep_input_order_when_tests_finish_out_of_order() {
        let dir = tempfile::tempdir().unwrap();
        let urls = ["http://a/list", "http://b/list", "http://c/list"];
        let mut probe = FakeProbe::default();
        for (url, delay_ms) in urls.iter().zip([200, 50, 0]) {
            probe.statuses.insert(url.to_string(), 200);
            probe
                .delays
                .insert(url.to_string(), Duration::from_millis(delay_ms));
        }
        let (progress, mut events) = ProgressReporter::channel();
        let mut batch = orchestrator(probe, dir.path()).with_progress(progress);
        batch.options.test_concurrency = 3;

        let report = batch
            .run_tests(&links(&urls), &CancellationToken::new())
            .await
            .unwrap();
        drop(batch);

        let tested: Vec<&str> = report.outcomes.iter().map(|o| o.url.as_str()).collect();
        assert_eq!(tested, urls);

        let mut reported = Vec::new();
        while let Some(event) = events.recv().await {
            if let ProgressEvent::LinkTested { index, url, .. } = event {
                reported.push((index, url));
            }
        }
        let expected: Vec<(usize, String)> = urls
            .iter()
            .enumerate()
            .map(|(i, u)| (i, u.to_string()))
            .collect();
        assert_eq!(reported, expected);
    }

    #[tokio::test]
    async fn test_no_working_links_skips_processing() {
        let dir = tempfile::tempdir().unwrap();
        let (progress, mut events) = ProgressReporter::channel();
        let mut batch = orchestrator(FakeProbe::default(), dir.path()).with_progress(progress);

        let report = batch
            .run(
                &links(&["http://dead/x"]),
                &HashSet::from([CountryCode::Turkey]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.tests.working_count(), 0);
        assert!(report.files.is_empty());
        assert!(!report.cancelled());
        assert_eq!(batch.state(), BatchState::TestsComplete);

        assert!(matches!(
            batch
                .process(
                    &[],
                    &HashSet::from([CountryCode::Turkey]),
                    &CancellationToken::new()
                )
                .await,
            Err(AppError::Validation { .. })
        ));

        drop(batch);
        while let Some(event) = events.recv().await {
            assert!(!matches!(
                event,
                ProgressEvent::Phase(BatchState::Processing) | ProgressEvent::Completed { .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_cancel_during_processing_stops_before_next_link() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let playlist = "#EXTINF:-1 group-title=\"TR\",A\nhttp://x/1\n";
        let mut probe = FakeProbe {
            cancel_on_fetch: Some(cancel.clone()),
            ..Default::default()
        };
        for url in ["http://a/list", "http://b/list"] {
            probe.statuses.insert(url.to_string(), 200);
            probe.bodies.insert(url.to_string(), playlist.to_string());
        }
        let mut batch = orchestrator(probe, dir.path());

        let report = batch
            .run(
                &links(&["http://a/list", "http://b/list"]),
                &HashSet::from([CountryCode::Turkey]),
                &cancel,
            )
            .await
            .unwrap();

        assert!(cancel.is_cancelled());
        assert!(report.processing_cancelled);
        assert!(report.cancelled());
        assert_eq!(report.tests.working_count(), 2);
        // The link already fetched is finished, the second one never starts
        assert_eq!(report.files_written(), 1);
        assert_eq!(report.files[0].source_url, "http://a/list");
        assert_eq!(batch.state(), BatchState::Cancelled);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
