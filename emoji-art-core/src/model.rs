//! The emoji art document: a background and the emoji placed on top of it.
//!
//! Positions are integer offsets from the canvas centre, so a document is
//! independent of the size of whatever view ends up rendering it.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreResult, EmojiArtError};
use crate::schema::SnapshotDocument;

/// First id handed out by a fresh document.
const FIRST_EMOJI_ID: u64 = 1;

/// Unique identifier for an emoji within one document.
///
/// Ids are allocated by the document, strictly increasing, and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmojiId(u64);

impl EmojiId {
    /// Wrap a raw id, e.g. one parsed from user input.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EmojiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The single image underneath all emoji.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Background {
    /// No background image.
    #[default]
    Blank,
    /// A remote (or local `file://`) image reference.
    Url(Url),
    /// Inline, undecoded image bytes.
    ImageData(Vec<u8>),
}

impl Background {
    /// The referenced URL, if this is a URL background.
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::Url(url) => Some(url),
            _ => None,
        }
    }

    /// The inline bytes, if this is an image-data background.
    #[must_use]
    pub fn image_data(&self) -> Option<&[u8]> {
        match self {
            Self::ImageData(data) => Some(data),
            _ => None,
        }
    }

    /// Whether there is no background.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => write!(f, "blank"),
            Self::Url(url) => write!(f, "url({url})"),
            Self::ImageData(data) => write!(f, "image data ({} bytes)", data.len()),
        }
    }
}

/// One emoji placed on the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Emoji {
    id: EmojiId,
    text: String,
    x: i32,
    y: i32,
    size: u32,
}

impl Emoji {
    pub(crate) fn new(id: EmojiId, text: String, (x, y): (i32, i32), size: u32) -> Self {
        Self {
            id,
            text,
            x,
            y,
            size,
        }
    }

    /// Unique identifier within the owning document.
    #[must_use]
    pub const fn id(&self) -> EmojiId {
        self.id
    }

    /// The emoji grapheme itself.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Horizontal offset from the canvas centre.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical offset from the canvas centre.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// `(x, y)` offset from the canvas centre.
    #[must_use]
    pub const fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Font size in points.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }
}

/// A complete emoji art document.
///
/// Mutation of an emoji that no longer exists is a silent no-op; the
/// operations report whether they applied instead of failing.
#[derive(Debug, Clone)]
pub struct DocumentModel {
    background: Background,
    emojis: Vec<Emoji>,
    /// Next id to allocate. Only ever grows.
    next_id: u64,
}

impl DocumentModel {
    /// Create an empty document with a blank background.
    #[must_use]
    pub fn new() -> Self {
        Self {
            background: Background::Blank,
            emojis: Vec::new(),
            next_id: FIRST_EMOJI_ID,
        }
    }

    pub(crate) fn from_parts(background: Background, emojis: Vec<Emoji>, next_id: u64) -> Self {
        Self {
            background,
            emojis,
            next_id,
        }
    }

    /// The current background.
    #[must_use]
    pub fn background(&self) -> &Background {
        &self.background
    }

    /// All emoji in z-order (last one renders on top).
    #[must_use]
    pub fn emojis(&self) -> &[Emoji] {
        &self.emojis
    }

    /// Look up an emoji by id.
    #[must_use]
    pub fn emoji(&self, id: EmojiId) -> Option<&Emoji> {
        self.emojis.iter().find(|e| e.id == id)
    }

    /// Number of emoji in the document.
    #[must_use]
    pub fn len(&self) -> usize {
        self.emojis.len()
    }

    /// Whether the document holds no emoji.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emojis.is_empty()
    }

    /// The id the next [`add_emoji`](Self::add_emoji) call will allocate.
    #[must_use]
    pub const fn next_emoji_id(&self) -> EmojiId {
        EmojiId(self.next_id)
    }

    /// Place a new emoji on top of all others.
    ///
    /// `text` is trusted to be a single emoji grapheme; see
    /// [`crate::emoji::is_emoji`] for the check hosts run at the UI boundary.
    pub fn add_emoji(&mut self, text: impl Into<String>, at: (i32, i32), size: u32) -> Emoji {
        let id = EmojiId(self.next_id);
        self.next_id += 1;
        let emoji = Emoji::new(id, text.into(), at, size);
        self.emojis.push(emoji.clone());
        tracing::debug!("Added emoji {} as {id}", emoji.text);
        emoji
    }

    /// Replace the background wholesale.
    pub fn set_background(&mut self, background: Background) {
        tracing::debug!("Background set to {background}");
        self.background = background;
    }

    /// Move an emoji by `(dx, dy)`. Returns `false` if it does not exist.
    pub fn move_emoji(&mut self, id: EmojiId, (dx, dy): (i32, i32)) -> bool {
        let Some(emoji) = self.emoji_mut(id) else {
            tracing::debug!("Ignoring move of missing emoji {id}");
            return false;
        };
        // Wrapping keeps move-then-move-back exact even at the extremes.
        emoji.x = emoji.x.wrapping_add(dx);
        emoji.y = emoji.y.wrapping_add(dy);
        true
    }

    /// Set an emoji's size. Returns `false` if it does not exist.
    pub fn resize_emoji(&mut self, id: EmojiId, size: u32) -> bool {
        let Some(emoji) = self.emoji_mut(id) else {
            tracing::debug!("Ignoring resize of missing emoji {id}");
            return false;
        };
        emoji.size = size;
        true
    }

    /// Scale an emoji's size by `factor`, rounding and never going below 1.
    /// Returns `false` if it does not exist.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn scale_emoji(&mut self, id: EmojiId, factor: f64) -> bool {
        let Some(emoji) = self.emoji_mut(id) else {
            tracing::debug!("Ignoring scale of missing emoji {id}");
            return false;
        };
        let scaled = (f64::from(emoji.size) * factor).round();
        emoji.size = if scaled.is_finite() {
            scaled.clamp(1.0, f64::from(u32::MAX)) as u32
        } else {
            emoji.size
        };
        true
    }

    /// Remove an emoji, returning it if it existed.
    pub fn remove_emoji(&mut self, id: EmojiId) -> Option<Emoji> {
        let index = self.emojis.iter().position(|e| e.id == id)?;
        Some(self.emojis.remove(index))
    }

    /// Replace this document's content with `other`'s.
    ///
    /// The id allocator keeps the larger of the two high-water marks so ids
    /// handed out before the restore are never handed out again.
    pub(crate) fn restore_from(&mut self, other: Self) {
        let next_id = self.next_id.max(other.next_id);
        *self = other;
        self.next_id = next_id;
    }

    /// Serialize to snapshot bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn serialize(&self) -> CoreResult<Vec<u8>> {
        serde_json::to_vec(&SnapshotDocument::from_model(self)).map_err(EmojiArtError::from)
    }

    /// Serialize to human-readable snapshot bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn serialize_pretty(&self) -> CoreResult<Vec<u8>> {
        serde_json::to_vec_pretty(&SnapshotDocument::from_model(self)).map_err(EmojiArtError::from)
    }

    /// Rebuild a document from snapshot bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EmojiArtError::MalformedSnapshot`] if the bytes are not a
    /// valid snapshot.
    pub fn deserialize(bytes: &[u8]) -> CoreResult<Self> {
        let document: SnapshotDocument = serde_json::from_slice(bytes)
            .map_err(|e| EmojiArtError::MalformedSnapshot(e.to_string()))?;
        document.into_model()
    }

    fn emoji_mut(&mut self, id: EmojiId) -> Option<&mut Emoji> {
        self.emojis.iter_mut().find(|e| e.id == id)
    }
}

impl Default for DocumentModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Documents are equal when they render identically; the id allocator is
/// bookkeeping and does not take part.
impl PartialEq for DocumentModel {
    fn eq(&self, other: &Self) -> bool {
        self.background == other.background && self.emojis == other.emojis
    }
}

impl Eq for DocumentModel {}
