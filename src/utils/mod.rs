//! Utility modules shared across the pipeline

pub mod http_client;
pub mod url;

pub use http_client::{HttpProbe, ProbeResponse, StandardHttpClient};
pub use url::UrlUtils;
