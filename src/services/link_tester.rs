//! Liveness testing of playlist and stream links
//!
//! Quick tests only look at the status of a HEAD request. Deep tests read
//! the first kilobytes of the body: a playlist is parsed and a few of its
//! channels are probed, anything else must deliver enough bytes to count as
//! a running stream. Network failures never escape; they become failed
//! [`TestResult`]s.
//!
//! Results are cached per URL and mode, so repeated tests of the same link
//! within one process cost no network round trip.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use lru::LruCache;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::config::TesterConfig;
use crate::models::{TestMode, TestResult};
use crate::playlist::parse;
use crate::utils::http_client::{BROWSER_USER_AGENT, HttpProbe, MEDIA_PLAYER_USER_AGENT};
use crate::utils::url::UrlUtils;

/// Content types accepted as media in deep tests
pub const MEDIA_CONTENT_TYPES: [&str; 5] = [
    "video",
    "application/octet-stream",
    "application/vnd.apple.mpegurl",
    "audio/mpegurl",
    "application/x-mpegurl",
];

const PLAYLIST_MARKER: &str = "#EXTINF";

/// Cache key: first 16 hex characters of SHA-256(url) plus the mode
pub fn cache_key(url: &str, mode: TestMode) -> String {
    let digest = Sha256::digest(url.as_bytes());
    format!("{}:{}", hex::encode(&digest[..8]), mode)
}

fn is_media_type(content_type: &str) -> bool {
    MEDIA_CONTENT_TYPES
        .iter()
        .any(|known| content_type.contains(known))
}

pub struct LinkTester {
    probe: Arc<dyn HttpProbe>,
    config: TesterConfig,
    fetch_timeout: Duration,
    cache: Mutex<LruCache<String, TestResult>>,
}

impl LinkTester {
    /// `fetch_timeout` bounds the full download of a playlist found by a deep test
    pub fn new(probe: Arc<dyn HttpProbe>, config: TesterConfig, fetch_timeout: Duration) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            probe,
            config,
            fetch_timeout,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Test one link, answering from the cache when possible
    ///
    /// Deep tests extend `timeout` by the configured extra for their GET.
    pub async fn test(&self, url: &str, mode: TestMode, timeout: Duration) -> TestResult {
        let key = cache_key(url, mode);
        if let Some(hit) = self.cached(&key) {
            trace!("Test cache hit for {}", UrlUtils::obfuscate_credentials(url));
            return hit;
        }

        let result = match mode {
            TestMode::Quick => self.quick_test(url, timeout).await,
            TestMode::Deep => self.deep_test(url, timeout).await,
        };

        debug!(
            "{} test of {}: {} ({})",
            mode,
            UrlUtils::obfuscate_credentials(url),
            if result.success { "ok" } else { "failed" },
            result.detail
        );

        self.lock_cache().put(key, result.clone());
        result
    }

    /// Forget every cached result
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    pub fn cached_len(&self) -> usize {
        self.lock_cache().len()
    }

    fn cached(&self, key: &str) -> Option<TestResult> {
        self.lock_cache().get(key).cloned()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, LruCache<String, TestResult>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn quick_test(&self, url: &str, timeout: Duration) -> TestResult {
        match self.probe.head_status(url, timeout, BROWSER_USER_AGENT).await {
            Ok(200) => TestResult::ok("OK"),
            Ok(status) => TestResult::failed(format!("HTTP {status}")),
            Err(e) => TestResult::failed(e.reason()),
        }
    }

    async fn deep_test(&self, url: &str, timeout: Duration) -> TestResult {
        let response = match self
            .probe
            .get_prefix(
                url,
                self.config.max_probe_bytes,
                timeout + self.config.deep_timeout_extra,
                MEDIA_PLAYER_USER_AGENT,
            )
            .await
        {
            Ok(response) => response,
            Err(e) => return TestResult::failed(e.reason()),
        };

        if response.status != 200 {
            return TestResult::failed(format!("HTTP {}", response.status));
        }

        if response.body_text().contains(PLAYLIST_MARKER) {
            return self.deep_test_playlist(url, timeout).await;
        }

        let received = response.body.len();
        if received < self.config.min_stream_bytes {
            return TestResult::failed("Insufficient data");
        }

        match response.content_type.as_deref().filter(|ct| is_media_type(ct)) {
            Some(content_type) => {
                TestResult::ok(format!("Active stream ({received} bytes, {content_type})"))
            }
            None => TestResult::ok(format!("Active stream ({received} bytes)")),
        }
    }

    async fn deep_test_playlist(&self, url: &str, timeout: Duration) -> TestResult {
        let body = match self.probe.fetch_text(url, self.fetch_timeout).await {
            Ok(body) => body,
            Err(e) => return TestResult::failed(e.reason()),
        };

        let playlist = parse(&body, url);
        let total = playlist.channel_count();
        if total == 0 {
            return TestResult::failed("Playlist has no channels");
        }

        let sample = sample_indices(total, self.config.deep_sample_size);
        let probes = sample.iter().map(|&i| {
            let channel_url = playlist.channels[i].url.clone();
            async move {
                matches!(
                    self.probe
                        .head_status(&channel_url, timeout, BROWSER_USER_AGENT)
                        .await,
                    Ok(200)
                )
            }
        });
        let hits = join_all(probes).await.into_iter().filter(|ok| *ok).count();

        let detail = format!(
            "Playlist: {total} channels, {hits}/{} samples responding",
            sample.len()
        );
        if hits > 0 || total >= self.config.plausible_channel_count {
            TestResult::ok(detail)
        } else {
            TestResult::failed(detail)
        }
    }
}

/// Up to `wanted` indices spread evenly over `0..total`
fn sample_indices(total: usize, wanted: usize) -> Vec<usize> {
    let wanted = wanted.min(total);
    if wanted == 0 {
        return Vec::new();
    }
    (0..wanted).map(|i| i * total / wanted).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{SourceError, SourceResult};
    use crate::utils::http_client::ProbeResponse;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct ScriptedProbe {
        heads: HashMap<String, SourceResult<u16>>,
        gets: HashMap<String, ProbeResponse>,
        bodies: HashMap<String, String>,
        head_calls: AtomicUsize,
        get_calls: AtomicUsize,
        head_timeouts: std::sync::Mutex<Vec<Duration>>,
        get_timeouts: std::sync::Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl HttpProbe for ScriptedProbe {
        async fn head_status(&self, url: &str, timeout: Duration, _: &str) -> SourceResult<u16> {
            self.head_calls.fetch_add(1, Ordering::SeqCst);
            self.head_timeouts.lock().unwrap().push(timeout);
            self.heads.get(url).cloned().unwrap_or(Ok(404))
        }

        async fn get_prefix(
            &self,
            url: &str,
            max_bytes: usize,
            timeout: Duration,
            _: &str,
        ) -> SourceResult<ProbeResponse> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            self.get_timeouts.lock().unwrap().push(timeout);
            let mut response = self.gets.get(url).cloned().unwrap_or(ProbeResponse {
                status: 404,
                ..Default::default()
            });
            response.body.truncate(max_bytes);
            Ok(response)
        }

        async fn fetch_text(&self, url: &str, _: Duration) -> SourceResult<String> {
            self.bodies
                .get(url)
                .cloned()
                .ok_or(SourceError::Http { status: 404 })
        }
    }

    fn tester(probe: ScriptedProbe) -> (Arc<ScriptedProbe>, LinkTester) {
        let probe = Arc::new(probe);
        let tester = LinkTester::new(
            probe.clone(),
            TesterConfig::default(),
            Duration::from_secs(5),
        );
        (probe, tester)
    }

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_quick_404_is_cached() {
        let (probe, tester) = tester(ScriptedProbe::default());

        let first = tester.test("http://x/dead", TestMode::Quick, TIMEOUT).await;
        assert_eq!(first, TestResult::failed("HTTP 404"));

        let second = tester.test("http://x/dead", TestMode::Quick, TIMEOUT).await;
        assert_eq!(second, first);
        assert_eq!(probe.head_calls.load(Ordering::SeqCst), 1);

        tester.clear_cache();
        tester.test("http://x/dead", TestMode::Quick, TIMEOUT).await;
        assert_eq!(probe.head_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_quick_network_errors_become_reasons() {
        let mut probe = ScriptedProbe::default();
        probe.heads.insert("http://x/ok".into(), Ok(200));
        probe.heads.insert(
            "http://x/slow".into(),
            Err(SourceError::Timeout {
                url: "http://x/slow".into(),
            }),
        );
        probe.heads.insert(
            "http://x/down".into(),
            Err(SourceError::Connection {
                url: "http://x/down".into(),
            }),
        );
        let (_, tester) = tester(probe);

        assert!(tester.test("http://x/ok", TestMode::Quick, TIMEOUT).await.success);
        assert_eq!(
            tester.test("http://x/slow", TestMode::Quick, TIMEOUT).await,
            TestResult::failed("Timeout")
        );
        assert_eq!(
            tester.test("http://x/down", TestMode::Quick, TIMEOUT).await,
            TestResult::failed("Connection error")
        );
    }

    #[tokio::test]
    async fn test_modes_are_cached_separately() {
        let mut probe = ScriptedProbe::default();
        probe.heads.insert("http://x/a".into(), Ok(200));
        let (_, tester) = tester(probe);

        tester.test("http://x/a", TestMode::Quick, TIMEOUT).await;
        tester.test("http://x/a", TestMode::Deep, TIMEOUT).await;
        assert_eq!(tester.cached_len(), 2);
        assert_ne!(
            cache_key("http://x/a", TestMode::Quick),
            cache_key("http://x/a", TestMode::Deep)
        );
    }

    #[tokio::test]
    async fn test_deep_get_gets_a_longer_timeout_than_quick_probes() {
        let mut probe = ScriptedProbe::default();
        probe.heads.insert("http://x/a".into(), Ok(200));
        probe.gets.insert(
            "http://x/list".into(),
            ProbeResponse {
                status: 200,
                content_type: None,
                body: b"#EXTM3U\n#EXTINF:-1,A\nhttp://x/a\n".to_vec(),
            },
        );
        probe.bodies.insert(
            "http://x/list".into(),
            "#EXTM3U\n#EXTINF:-1,A\nhttp://x/a\n".into(),
        );
        let (probe, tester) = tester(probe);

        tester.test("http://x/list", TestMode::Deep, TIMEOUT).await;
        tester.test("http://x/a", TestMode::Quick, TIMEOUT).await;

        let extra = TesterConfig::default().deep_timeout_extra;
        assert_eq!(*probe.get_timeouts.lock().unwrap(), vec![TIMEOUT + extra]);
        // Sampled channels and quick tests use the plain per-link timeout
        assert_eq!(*probe.head_timeouts.lock().unwrap(), vec![TIMEOUT, TIMEOUT]);
    }

    #[tokio::test]
    async fn test_deep_raw_stream_thresholds() {
        let mut probe = ScriptedProbe::default();
        probe.gets.insert(
            "http://x/stream".into(),
            ProbeResponse {
                status: 200,
                content_type: Some("video/mp2t".into()),
                body: vec![0x47; 100 * 1024],
            },
        );
        probe.gets.insert(
            "http://x/tiny".into(),
            ProbeResponse {
                status: 200,
                content_type: None,
                body: vec![0x47; 512],
            },
        );
        let (_, tester) = tester(probe);

        let stream = tester.test("http://x/stream", TestMode::Deep, TIMEOUT).await;
        assert!(stream.success);
        assert_eq!(stream.detail, "Active stream (32768 bytes, video/mp2t)");

        assert_eq!(
            tester.test("http://x/tiny", TestMode::Deep, TIMEOUT).await,
            TestResult::failed("Insufficient data")
        );
        assert_eq!(
            tester.test("http://x/missing", TestMode::Deep, TIMEOUT).await,
            TestResult::failed("HTTP 404")
        );
    }

    #[tokio::test]
    async fn test_deep_playlist_samples_channels() {
        let playlist = "#EXTM3U\n#EXTINF:-1,A\nhttp://cdn/a\n#EXTINF:-1,B\nhttp://cdn/b\n";
        let mut probe = ScriptedProbe::default();
        probe.gets.insert(
            "http://x/list".into(),
            ProbeResponse {
                status: 200,
                content_type: Some("audio/mpegurl".into()),
                body: playlist.as_bytes().to_vec(),
            },
        );
        probe.bodies.insert("http://x/list".into(), playlist.into());
        probe.heads.insert("http://cdn/b".into(), Ok(200));
        let (probe, tester) = tester(probe);

        let result = tester.test("http://x/list", TestMode::Deep, TIMEOUT).await;
        assert!(result.success);
        assert_eq!(result.detail, "Playlist: 2 channels, 1/2 samples responding");
        assert_eq!(probe.head_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_deep_small_dead_playlist_fails() {
        let playlist = "#EXTM3U\n#EXTINF:-1,A\nhttp://cdn/a\n";
        let mut probe = ScriptedProbe::default();
        probe.gets.insert(
            "http://x/list".into(),
            ProbeResponse {
                status: 200,
                content_type: None,
                body: playlist.as_bytes().to_vec(),
            },
        );
        probe.bodies.insert("http://x/list".into(), playlist.into());
        let (_, tester) = tester(probe);

        let result = tester.test("http://x/list", TestMode::Deep, TIMEOUT).await;
        assert!(!result.success);
        assert_eq!(result.detail, "Playlist: 1 channels, 0/1 samples responding");
    }

    #[tokio::test]
    async fn test_deep_empty_playlist() {
        let body = "#EXTM3U\n#EXTINF:-1,A\n";
        let mut probe = ScriptedProbe::default();
        probe.gets.insert(
            "http://x/list".into(),
            ProbeResponse {
                status: 200,
                content_type: None,
                body: body.as_bytes().to_vec(),
            },
        );
        probe.bodies.insert("http://x/list".into(), body.into());
        let (_, tester) = tester(probe);

        assert_eq!(
            tester.test("http://x/list", TestMode::Deep, TIMEOUT).await,
            TestResult::failed("Playlist has no channels")
        );
    }

    #[test]
    fn test_cache_key_shape() {
        let key = cache_key("http://x/a", TestMode::Quick);
        let (hash, mode) = key.split_once(':').unwrap();
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(mode, "quick");
    }

    #[test]
    fn test_sample_indices() {
        assert_eq!(sample_indices(10, 3), vec![0, 3, 6]);
        assert_eq!(sample_indices(2, 3), vec![0, 1]);
        assert!(sample_indices(0, 3).is_empty());
    }
}
