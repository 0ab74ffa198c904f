//! Filesystem persistence for documents and palette stores.
//!
//! Each document is one snapshot file, `<name>.emojiart`, in the data
//! directory. Palette stores live next to them as `palettes-<name>.json`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{CoreResult, EmojiArtError};
use crate::model::DocumentModel;
use crate::palette::PaletteStore;

/// File extension of document snapshots.
pub const SNAPSHOT_EXTENSION: &str = "emojiart";

/// Prefix of palette store files.
const PALETTE_FILE_PREFIX: &str = "palettes-";

/// Directory-backed store of document snapshots.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    data_dir: PathBuf,
}

impl DocumentStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`EmojiArtError::Io`] if the directory cannot be created.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> CoreResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    /// The directory documents are stored in.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the snapshot file for `name`.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{SNAPSHOT_EXTENSION}", sanitize_filename(name)))
    }

    /// Write a document snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, name: &str, model: &DocumentModel) -> CoreResult<PathBuf> {
        let path = self.path_for(name);
        std::fs::write(&path, model.serialize_pretty()?)?;
        tracing::info!("Saved document {name} to {}", path.display());
        Ok(path)
    }

    /// Save without failing; errors are logged.
    pub fn autosave(&self, name: &str, model: &DocumentModel) {
        if let Err(e) = self.save(name, model) {
            tracing::warn!("Autosave of {name} failed: {e}");
        }
    }

    /// Read a document snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`EmojiArtError::NotFound`] if there is no such document, and
    /// [`EmojiArtError::MalformedSnapshot`] if the file cannot be decoded.
    pub fn load(&self, name: &str) -> CoreResult<DocumentModel> {
        let path = self.path_for(name);
        let bytes = std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => EmojiArtError::NotFound(name.to_string()),
            _ => EmojiArtError::Io(e),
        })?;
        DocumentModel::deserialize(&bytes)
    }

    /// Names of all stored documents, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be read.
    pub fn document_names(&self) -> CoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == SNAPSHOT_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete a stored document. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn delete(&self, name: &str) -> CoreResult<bool> {
        match std::fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a palette store under its name.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_palettes(&self, store: &PaletteStore) -> CoreResult<()> {
        std::fs::write(self.palette_path(store.name()), store.to_json()?)?;
        Ok(())
    }

    /// Load a palette store, or a freshly seeded one if none was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_palettes(&self, name: &str) -> CoreResult<PaletteStore> {
        match std::fs::read_to_string(self.palette_path(name)) {
            Ok(json) => PaletteStore::from_json(name, &json),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(PaletteStore::new(name)),
            Err(e) => Err(e.into()),
        }
    }

    fn palette_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!(
            "{PALETTE_FILE_PREFIX}{}.json",
            sanitize_filename(name)
        ))
    }
}

/// Replace any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
