use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, header};
use tracing::{debug, trace};

use crate::errors::{AppError, AppResult, SourceError, SourceResult};
use crate::utils::url::UrlUtils;

/// User-Agent sent with quick HEAD probes
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// User-Agent sent with deep probes; some panels only answer media players
pub const MEDIA_PLAYER_USER_AGENT: &str = "VLC/3.0.11 LibVLC/3.0.11";

/// Status, content type and leading bytes of a GET response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ProbeResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Network operations needed by the link tester and the workflows
#[async_trait]
pub trait HttpProbe: Send + Sync {
    /// HEAD the URL, following redirects, and return the final status
    async fn head_status(
        &self,
        url: &str,
        timeout: Duration,
        user_agent: &str,
    ) -> SourceResult<u16>;

    /// GET the URL and read at most `max_bytes` of the body
    ///
    /// Non-success statuses are returned, not raised, so callers can report them.
    async fn get_prefix(
        &self,
        url: &str,
        max_bytes: usize,
        timeout: Duration,
        user_agent: &str,
    ) -> SourceResult<ProbeResponse>;

    /// GET the whole body as text; non-success statuses are errors
    async fn fetch_text(&self, url: &str, timeout: Duration) -> SourceResult<String>;
}

/// Default implementation of [`HttpProbe`] using reqwest
#[derive(Debug, Clone)]
pub struct StandardHttpClient {
    client: Client,
}

impl StandardHttpClient {
    /// Create a client that follows up to `max_redirects` redirects
    ///
    /// Request timeouts are set per call; only the connect timeout is global.
    pub fn new(connect_timeout: Duration, max_redirects: usize) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpProbe for StandardHttpClient {
    async fn head_status(
        &self,
        url: &str,
        timeout: Duration,
        user_agent: &str,
    ) -> SourceResult<u16> {
        trace!("HEAD {}", UrlUtils::obfuscate_credentials(url));
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .header(header::USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(url, &e))?;
        Ok(response.status().as_u16())
    }

    async fn get_prefix(
        &self,
        url: &str,
        max_bytes: usize,
        timeout: Duration,
        user_agent: &str,
    ) -> SourceResult<ProbeResponse> {
        trace!("GET (prefix) {}", UrlUtils::obfuscate_credentials(url));
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .header(header::USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(url, &e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_lowercase());

        if !response.status().is_success() {
            return Ok(ProbeResponse {
                status,
                content_type,
                body: Vec::new(),
            });
        }

        let mut body = Vec::with_capacity(max_bytes.min(64 * 1024));
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SourceError::from_reqwest(url, &e))?;
            let remaining = max_bytes - body.len();
            body.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
            if body.len() >= max_bytes {
                break;
            }
        }

        debug!(
            "Read {} bytes from {}",
            body.len(),
            UrlUtils::obfuscate_credentials(url)
        );
        Ok(ProbeResponse {
            status,
            content_type,
            body,
        })
    }

    async fn fetch_text(&self, url: &str, timeout: Duration) -> SourceResult<String> {
        debug!(
            "Fetching text content from: {}",
            UrlUtils::obfuscate_credentials(url)
        );
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .header(header::USER_AGENT, MEDIA_PLAYER_USER_AGENT)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(url, &e))?;

        if !response.status().is_success() {
            return Err(SourceError::Http {
                status: response.status().as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::from_reqwest(url, &e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
