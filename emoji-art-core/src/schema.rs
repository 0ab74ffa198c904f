//! Canonical serialized representation of a document.
//!
//! Every persisted field is named here explicitly; the runtime model in
//! [`crate::model`] never derives serde itself. Decoding is tolerant: unknown
//! fields are ignored, a missing `version` means version 1, and newer
//! versions are read on a best-effort basis.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreResult, EmojiArtError};
use crate::model::{Background, DocumentModel, Emoji, EmojiId};

/// Snapshot schema version written by this crate.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Largest emoji id a snapshot may carry: the largest integer every JSON
/// reader represents exactly. Keeps the id allocator far from overflow.
pub const MAX_EMOJI_ID: u64 = (1 << 53) - 1;

/// Document-friendly background description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackgroundDocument {
    /// No background.
    #[default]
    Blank,
    /// Remote image reference.
    Url {
        /// Image location.
        url: Url,
    },
    /// Inline image bytes, base64 encoded.
    ImageData {
        /// Raw image bytes.
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
    /// A background kind written by a newer version; read back as blank.
    #[serde(other)]
    Unknown,
}

impl From<&Background> for BackgroundDocument {
    fn from(background: &Background) -> Self {
        match background {
            Background::Blank => Self::Blank,
            Background::Url(url) => Self::Url { url: url.clone() },
            Background::ImageData(data) => Self::ImageData { data: data.clone() },
        }
    }
}

impl From<BackgroundDocument> for Background {
    fn from(document: BackgroundDocument) -> Self {
        match document {
            BackgroundDocument::Blank => Self::Blank,
            BackgroundDocument::Url { url } => Self::Url(url),
            BackgroundDocument::ImageData { data } => Self::ImageData(data),
            BackgroundDocument::Unknown => {
                tracing::warn!("Unknown background kind in snapshot, using blank");
                Self::Blank
            }
        }
    }
}

/// Document-friendly emoji description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiDocument {
    /// The emoji grapheme.
    pub text: String,
    /// Horizontal offset from the canvas centre.
    pub x: i32,
    /// Vertical offset from the canvas centre.
    pub y: i32,
    /// Font size in points.
    pub size: u32,
    /// Identifier, unique within the document.
    pub id: u64,
}

impl From<&Emoji> for EmojiDocument {
    fn from(emoji: &Emoji) -> Self {
        Self {
            text: emoji.text().to_string(),
            x: emoji.x(),
            y: emoji.y(),
            size: emoji.size(),
            id: emoji.id().get(),
        }
    }
}

/// Serialized document snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    /// Schema version.
    #[serde(default = "SnapshotDocument::default_version")]
    pub version: u32,
    /// Background reference.
    #[serde(default)]
    pub background: BackgroundDocument,
    /// Emoji in z-order.
    #[serde(default)]
    pub emojis: Vec<EmojiDocument>,
    /// Next id the document will allocate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_emoji_id: Option<u64>,
}

impl SnapshotDocument {
    const fn default_version() -> u32 {
        SNAPSHOT_VERSION
    }

    /// Build the snapshot of a runtime document.
    #[must_use]
    pub fn from_model(model: &DocumentModel) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            background: model.background().into(),
            emojis: model.emojis().iter().map(EmojiDocument::from).collect(),
            next_emoji_id: Some(model.next_emoji_id().get()),
        }
    }

    /// Validate and convert into a runtime document.
    ///
    /// # Errors
    ///
    /// Returns [`EmojiArtError::MalformedSnapshot`] on duplicate, zero or
    /// out-of-range ids and on empty emoji text.
    pub fn into_model(self) -> CoreResult<DocumentModel> {
        if self.version > SNAPSHOT_VERSION {
            tracing::warn!(
                "Snapshot version {} is newer than supported version {SNAPSHOT_VERSION}, reading best-effort",
                self.version
            );
        }

        let mut seen = HashSet::with_capacity(self.emojis.len());
        let mut emojis = Vec::with_capacity(self.emojis.len());
        for doc in self.emojis {
            if doc.id == 0 {
                return Err(EmojiArtError::MalformedSnapshot(
                    "emoji id 0 is reserved".to_string(),
                ));
            }
            if doc.id > MAX_EMOJI_ID {
                return Err(EmojiArtError::MalformedSnapshot(format!(
                    "emoji id {} out of range",
                    doc.id
                )));
            }
            if !seen.insert(doc.id) {
                return Err(EmojiArtError::MalformedSnapshot(format!(
                    "duplicate emoji id {}",
                    doc.id
                )));
            }
            if doc.text.is_empty() {
                return Err(EmojiArtError::MalformedSnapshot(format!(
                    "emoji {} has empty text",
                    doc.id
                )));
            }
            emojis.push(Emoji::new(
                EmojiId::new(doc.id),
                doc.text,
                (doc.x, doc.y),
                doc.size,
            ));
        }

        let floor = match seen.iter().max() {
            None => 1,
            Some(max) => max.checked_add(1).ok_or_else(|| {
                EmojiArtError::MalformedSnapshot("emoji id out of range".to_string())
            })?,
        };
        let next_id = self.next_emoji_id.map_or(floor, |next| next.max(floor));
        if next_id > MAX_EMOJI_ID + 1 {
            return Err(EmojiArtError::MalformedSnapshot(format!(
                "next emoji id {next_id} out of range"
            )));
        }

        Ok(DocumentModel::from_parts(
            self.background.into(),
            emojis,
            next_id,
        ))
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
