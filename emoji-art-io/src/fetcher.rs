//! Background fetcher for `http(s)`, `file`, and `data` URLs.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use emoji_art_core::{AsyncFetcher, FetchError};
use reqwest::Client;
use url::Url;

use crate::error::{IoError, IoResult};

/// Environment variable overriding the fetch timeout, in seconds.
pub const TIMEOUT_ENV: &str = "EMOJI_ART_FETCH_TIMEOUT_SECS";

/// Environment variable capping the edge length of decoded backgrounds.
pub const MAX_DIMENSION_ENV: &str = "EMOJI_ART_MAX_IMAGE_DIMENSION";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for [`HttpFetcher`] and the decoder it feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Whole-request timeout for HTTP fetches.
    pub timeout: Duration,
    /// User agent sent with HTTP requests.
    pub user_agent: String,
    /// Backgrounds larger than this on either edge are downscaled to fit.
    pub max_image_dimension: Option<u32>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("emoji-art/{}", env!("CARGO_PKG_VERSION")),
            max_image_dimension: None,
        }
    }
}

impl FetchConfig {
    /// Defaults, overridden by [`TIMEOUT_ENV`] and [`MAX_DIMENSION_ENV`]
    /// when set.
    ///
    /// An unparsable value is logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = var(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(e) => tracing::warn!("Ignoring {TIMEOUT_ENV}={raw}: {e}"),
            }
        }
        if let Some(raw) = var(MAX_DIMENSION_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(max) => config.max_image_dimension = Some(max),
                Err(e) => tracing::warn!("Ignoring {MAX_DIMENSION_ENV}={raw}: {e}"),
            }
        }
        config
    }
}

/// [`AsyncFetcher`] backed by `reqwest` for remote URLs and `tokio::fs` for
/// local files.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// Build a fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidConfig`] for a zero timeout and
    /// [`IoError::Http`] if the HTTP client fails to build.
    pub fn new(config: &FetchConfig) -> IoResult<Self> {
        if config.timeout.is_zero() {
            return Err(IoError::InvalidConfig(
                "fetch timeout must be non-zero".to_string(),
            ));
        }

        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            // Ignore proxy environment so local URLs are reached directly
            .no_proxy()
            .build()?;

        Ok(Self { http })
    }

    async fn fetch_http(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AsyncFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        tracing::debug!("Fetching {url}");
        match url.scheme() {
            "http" | "https" => self.fetch_http(url).await,
            "file" => fetch_file(url).await,
            "data" => decode_data_url(url.as_str()),
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}

async fn fetch_file(url: &Url) -> Result<Vec<u8>, FetchError> {
    let path = url
        .to_file_path()
        .map_err(|()| FetchError::Io(format!("not a local path: {url}")))?;
    tokio::fs::read(&path)
        .await
        .map_err(|e| FetchError::Io(format!("{}: {e}", path.display())))
}

/// Decode the payload of a `data:` URL.
///
/// Supports `data:image/png;base64,iVBORw0KGgo...` and percent-encoded
/// payloads.
///
/// # Errors
///
/// Returns [`FetchError::InvalidDataUrl`] if the URL is malformed.
pub fn decode_data_url(uri: &str) -> Result<Vec<u8>, FetchError> {
    let uri_data = uri
        .strip_prefix("data:")
        .ok_or_else(|| FetchError::InvalidDataUrl("not a data URL".to_string()))?;

    let (metadata, encoded) = uri_data
        .split_once(',')
        .ok_or_else(|| FetchError::InvalidDataUrl("missing comma".to_string()))?;

    // Fragments are not part of the payload
    let encoded = encoded.split('#').next().unwrap_or_default();

    if metadata.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(percent_decode(encoded)?)
            .map_err(|e| FetchError::InvalidDataUrl(format!("bad base64: {e}")))
    } else {
        percent_decode(encoded)
    }
}

fn percent_decode(input: &str) -> Result<Vec<u8>, FetchError> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = input
                .get(i + 1..i + 3)
                .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| FetchError::InvalidDataUrl("bad percent escape".to_string()))?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }

    Ok(result)
}
