//! # Emoji Art IO
//!
//! Concrete collaborators for the document core: an image decoder built on
//! the `image` crate and a background fetcher built on `reqwest`.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        DocumentController (core)            │
//! ├──────────────────────┬──────────────────────┤
//! │ ImageDecoder         │ AsyncFetcher         │
//! │  ImageCrateDecoder   │  HttpFetcher         │
//! │  (png, jpeg, webp)   │  (http, file, data)  │
//! └──────────────────────┴──────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod decoder;
pub mod error;
pub mod fetcher;
pub mod image_url;

use std::sync::Arc;

pub use decoder::{load_image_from_bytes, resize_to_fit, ImageCrateDecoder};
pub use error::{IoError, IoResult};
pub use fetcher::{decode_data_url, FetchConfig, HttpFetcher, MAX_DIMENSION_ENV, TIMEOUT_ENV};
pub use image_url::image_url;

use emoji_art_core::{AsyncFetcher, DocumentController, ImageDecoder};

/// Build a controller around an empty document, wired to an
/// [`ImageCrateDecoder`] and an [`HttpFetcher`] configured from `config`.
///
/// # Errors
///
/// Returns an error if the fetcher cannot be built.
pub fn new_controller(config: &FetchConfig) -> IoResult<DocumentController> {
    let (decoder, fetcher) = collaborators(config)?;
    Ok(DocumentController::new(decoder, fetcher))
}

/// The decoder and fetcher for `config` as trait objects.
///
/// # Errors
///
/// Returns an error if `config` is out of range or the fetcher cannot be
/// built.
pub fn collaborators(
    config: &FetchConfig,
) -> IoResult<(Arc<dyn ImageDecoder>, Arc<dyn AsyncFetcher>)> {
    Ok((
        Arc::new(ImageCrateDecoder::from_config(config)?),
        Arc::new(HttpFetcher::new(config)?),
    ))
}
