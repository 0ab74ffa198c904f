//! Background image resolution.
//!
//! Turning a [`Background`] into something displayable is the only part of
//! the document core that suspends. URL backgrounds are fetched on a spawned
//! task; the result comes back over a channel and is applied by the owner of
//! the [`DocumentController`](crate::DocumentController).
//!
//! ## State machine
//!
//! ```text
//! set_background(url)        -> Fetching -> Idle (image) | Failed(Some(url))
//! set_background(image data) -> Idle (image) | Failed(None)
//! set_background(blank)      -> Idle (no image)
//! ```
//!
//! Every `set_background` bumps a generation counter. A completion tagged with
//! an older generation is discarded, so the last background set always wins no
//! matter what order fetches finish in.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

use crate::error::{DecodeError, FetchError};
use crate::model::Background;

/// A decoded background image ready for display.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl DecodedImage {
    /// Wrap RGBA8 pixel data (4 bytes per pixel, row-major).
    #[must_use]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// RGBA8 pixel data.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Decodes raw image bytes.
pub trait ImageDecoder: Send + Sync {
    /// Decode `bytes` into a displayable image.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the bytes are not a supported image.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError>;
}

/// Fetches the bytes behind a URL.
#[async_trait]
pub trait AsyncFetcher: Send + Sync {
    /// Fetch the resource at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on any transport or protocol failure.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// State of background image resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchStatus {
    /// Nothing in progress; the published image (if any) is current.
    #[default]
    Idle,
    /// A URL background is being fetched.
    Fetching,
    /// Resolution failed. Carries the URL for URL backgrounds, `None` for
    /// inline image data.
    Failed(Option<Url>),
}

impl FetchStatus {
    /// Whether a fetch is in progress.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        matches!(self, Self::Fetching)
    }

    /// Whether the last resolution failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching => write!(f, "fetching"),
            Self::Failed(Some(url)) => write!(f, "failed({url})"),
            Self::Failed(None) => write!(f, "failed"),
        }
    }
}

/// Why a URL background could not be resolved.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The bytes could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The bytes were fetched but are not an image.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Result of a spawned fetch, tagged with the generation that started it.
#[derive(Debug)]
pub(crate) struct FetchCompletion {
    generation: u64,
    url: Url,
    result: Result<DecodedImage, ResolveError>,
}

/// Immediate outcome of starting resolution.
#[derive(Debug)]
pub(crate) enum Resolution {
    /// Resolved synchronously; `None` for a blank background.
    Ready(Option<DecodedImage>),
    /// A fetch has been spawned.
    Fetching,
    /// Resolution failed synchronously.
    Failed(Option<Url>),
}

/// Outcome of a completion that is still current.
#[derive(Debug)]
pub(crate) enum Completed {
    Image(DecodedImage),
    Failed(Url),
}

/// Owns the collaborators, generation counter, and completion channel.
pub(crate) struct BackgroundResolver {
    decoder: Arc<dyn ImageDecoder>,
    fetcher: Arc<dyn AsyncFetcher>,
    generation: u64,
    in_flight: usize,
    tx: mpsc::UnboundedSender<FetchCompletion>,
    rx: mpsc::UnboundedReceiver<FetchCompletion>,
}

impl BackgroundResolver {
    pub(crate) fn new(decoder: Arc<dyn ImageDecoder>, fetcher: Arc<dyn AsyncFetcher>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            decoder,
            fetcher,
            generation: 0,
            in_flight: 0,
            tx,
            rx,
        }
    }

    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) const fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Start resolving `background`, superseding anything in flight.
    pub(crate) fn resolve(&mut self, background: &Background) -> Resolution {
        self.generation += 1;
        match background {
            Background::Blank => Resolution::Ready(None),
            Background::ImageData(data) => match self.decoder.decode(data) {
                Ok(image) => Resolution::Ready(Some(image)),
                Err(e) => {
                    tracing::warn!("Background image data rejected: {e}");
                    Resolution::Failed(None)
                }
            },
            Background::Url(url) => self.spawn_fetch(url.clone()),
        }
    }

    fn spawn_fetch(&mut self, url: Url) -> Resolution {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("Cannot fetch {url}: {}", FetchError::NoRuntime);
            return Resolution::Failed(Some(url));
        };

        let generation = self.generation;
        let fetcher = Arc::clone(&self.fetcher);
        let decoder = Arc::clone(&self.decoder);
        let tx = self.tx.clone();
        self.in_flight += 1;
        tracing::debug!("Fetching background {url} (generation {generation})");

        let task_url = url.clone();
        let work = handle.spawn(async move {
            match fetcher.fetch(&task_url).await {
                Ok(bytes) => decoder.decode(&bytes).map_err(ResolveError::from),
                Err(e) => Err(ResolveError::from(e)),
            }
        });
        handle.spawn(async move {
            // A panicking fetcher or decoder still owes a completion.
            let result = work.await.unwrap_or_else(|e| {
                Err(ResolveError::Fetch(FetchError::Transport(format!(
                    "fetch task failed: {e}"
                ))))
            });
            // The receiver only goes away with the controller.
            let _ = tx.send(FetchCompletion {
                generation,
                url,
                result,
            });
        });
        Resolution::Fetching
    }

    /// Take a completion without waiting.
    pub(crate) fn try_next(&mut self) -> Option<FetchCompletion> {
        if self.in_flight == 0 {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Wait for the next completion; `None` when nothing is in flight.
    pub(crate) async fn next(&mut self) -> Option<FetchCompletion> {
        if self.in_flight == 0 {
            return None;
        }
        self.rx.recv().await
    }

    /// Account for a completion. Returns `None` if it has been superseded.
    pub(crate) fn accept(&mut self, completion: FetchCompletion) -> Option<Completed> {
        self.in_flight = self.in_flight.saturating_sub(1);
        if completion.generation != self.generation {
            tracing::debug!(
                "Discarding stale fetch of {} (generation {}, current {})",
                completion.url,
                completion.generation,
                self.generation
            );
            return None;
        }
        match completion.result {
            Ok(image) => Some(Completed::Image(image)),
            Err(e) => {
                tracing::warn!("Background fetch of {} failed: {e}", completion.url);
                Some(Completed::Failed(completion.url))
            }
        }
    }
}

impl fmt::Debug for BackgroundResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundResolver")
            .field("generation", &self.generation)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}
