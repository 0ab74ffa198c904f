//! # Emoji Art Core
//!
//! Headless document logic for an emoji drawing board: emoji placed on a
//! background image, undoable edits, snapshot persistence, and palettes.
//! Rendering, gestures, and platform pickers belong to the host.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              emoji-art-core                 │
//! ├─────────────────────────────────────────────┤
//! │  DocumentModel     │  DocumentController    │
//! │  - Emoji + ids     │  - Undo registration   │
//! │  - Background      │  - Background fetch    │
//! │  - Snapshots       │  - Observers           │
//! ├─────────────────────────────────────────────┤
//! │  UndoHistory       │  Palettes / Store      │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod background;
pub mod controller;
pub mod emoji;
pub mod error;
pub mod model;
pub mod observer;
pub mod palette;
pub mod schema;
pub mod store;
pub mod undo;

pub use background::{AsyncFetcher, DecodedImage, FetchStatus, ImageDecoder, ResolveError};
pub use controller::{ChangeCallback, DocumentController, DocumentState};
pub use error::{CoreResult, DecodeError, EmojiArtError, FetchError};
pub use model::{Background, DocumentModel, Emoji, EmojiId};
pub use observer::ObserverId;
pub use palette::{Palette, PaletteStore};
pub use schema::{SnapshotDocument, MAX_EMOJI_ID, SNAPSHOT_VERSION};
pub use store::DocumentStore;
pub use undo::{undo_action, UndoAction, UndoHistory, UndoManager};

/// Emoji Art core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
