//! One open document and the commands run against it.

use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{bail, Context};
use emoji_art_core::emoji::{graphemes, is_emoji};
use emoji_art_core::{
    Background, DocumentController, DocumentModel, DocumentStore, EmojiArtError, EmojiId,
    UndoHistory, UndoManager,
};
use emoji_art_io::{collaborators, image_url, new_controller};
use serde_json::{json, Value};

use crate::{BackgroundSource, CliConfig, Command, DocumentLocation, PALETTE_STORE_NAME};

/// An opened document with its backing store.
#[derive(Debug)]
pub struct Session {
    config: CliConfig,
    store: DocumentStore,
    controller: DocumentController,
}

impl Session {
    /// Open the configured document, or start an empty one if it does not
    /// exist yet. Must be called from within a tokio runtime so a URL
    /// background can start resolving.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or the
    /// document exists but cannot be read.
    pub fn open(config: CliConfig) -> anyhow::Result<Self> {
        let store = DocumentStore::with_data_dir(&config.data_dir).with_context(|| {
            format!("failed to open data directory {}", config.data_dir.display())
        })?;

        let model = match &config.location {
            DocumentLocation::File(path) => match std::fs::read(path) {
                Ok(bytes) => DocumentModel::deserialize(&bytes)
                    .with_context(|| format!("failed to open {}", path.display()))?,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::info!("{} does not exist yet, starting empty", path.display());
                    DocumentModel::new()
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to read {}", path.display()))
                }
            },
            DocumentLocation::Named(name) => match store.load(name) {
                Ok(model) => model,
                Err(EmojiArtError::NotFound(_)) => {
                    tracing::info!("Document {name} does not exist yet, starting empty");
                    DocumentModel::new()
                }
                Err(e) => return Err(e).with_context(|| format!("failed to open {name}")),
            },
        };

        let (decoder, fetcher) = collaborators(&config.fetch)?;
        let controller = DocumentController::from_model(model, decoder, fetcher);
        Ok(Self {
            config,
            store,
            controller,
        })
    }

    /// The document controller.
    #[must_use]
    pub fn controller(&self) -> &DocumentController {
        &self.controller
    }

    /// Run `command` and return its JSON output.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid input, such as text that is not a single
    /// emoji or an unreadable background file.
    pub async fn execute(&mut self, command: &Command) -> anyhow::Result<Value> {
        let output = match command {
            Command::Show => document_summary(&self.controller),
            Command::Add { emoji, x, y, size } => {
                if !is_single_emoji(emoji) {
                    bail!("{emoji:?} is not a single emoji");
                }
                let added = self.controller.add_emoji(emoji, (*x, *y), *size, None);
                json!({ "added": added.id().get(), "document": self.settled_summary().await })
            }
            Command::Move { id, dx, dy } => {
                let changed = self
                    .controller
                    .move_emoji(EmojiId::new(*id), (*dx, *dy), None);
                self.changed(changed).await
            }
            Command::Resize { id, size } => {
                let changed = self.controller.resize_emoji(EmojiId::new(*id), *size, None);
                self.changed(changed).await
            }
            Command::Remove { id } => {
                let changed = self.controller.remove_emoji(EmojiId::new(*id), None).is_some();
                self.changed(changed).await
            }
            Command::Background { source } => {
                let background = load_background(source).await?;
                self.controller.set_background(background, None);
                self.settled_summary().await
            }
            Command::Palettes => self.palettes()?,
            Command::DemoUndo => self.demo_undo()?,
        };
        Ok(output)
    }

    /// Write the document back to where it was opened from.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let model = self.controller.current_document();
        match &self.config.location {
            DocumentLocation::File(path) => {
                std::fs::write(path, model.serialize_pretty()?)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                tracing::info!("Saved document to {}", path.display());
                Ok(path.clone())
            }
            DocumentLocation::Named(name) => Ok(self.store.save(name, model)?),
        }
    }

    async fn settled_summary(&mut self) -> Value {
        self.controller.settle().await;
        document_summary(&self.controller)
    }

    async fn changed(&mut self, changed: bool) -> Value {
        if !changed {
            tracing::warn!("No emoji with that id; nothing changed");
        }
        json!({ "changed": changed, "document": self.settled_summary().await })
    }

    fn palettes(&self) -> anyhow::Result<Value> {
        let palettes = self.store.load_palettes(PALETTE_STORE_NAME)?;
        self.store.save_palettes(&palettes)?;
        let list: Vec<Value> = palettes
            .palettes()
            .iter()
            .map(|p| json!({ "id": p.id(), "name": p.name(), "emojis": p.emojis() }))
            .collect();
        Ok(Value::Array(list))
    }

    fn demo_undo(&self) -> anyhow::Result<Value> {
        let mut controller = new_controller(&self.config.fetch)?;
        let mut history: UndoHistory<DocumentController> = UndoHistory::new();
        let mut steps = Vec::new();

        let dog = controller.add_emoji("🐶", (-40, 0), 40, Some(&mut history));
        steps.push(demo_step("add 🐶", &controller, &history));
        controller.add_emoji("🐱", (40, 0), 40, Some(&mut history));
        steps.push(demo_step("add 🐱", &controller, &history));
        controller.remove_emoji(dog.id(), Some(&mut history));
        steps.push(demo_step("remove 🐶", &controller, &history));
        history.undo(&mut controller);
        steps.push(demo_step("undo", &controller, &history));
        history.redo(&mut controller);
        steps.push(demo_step("redo", &controller, &history));

        Ok(Value::Array(steps))
    }
}

/// JSON summary of the controller's current state.
#[must_use]
pub fn document_summary(controller: &DocumentController) -> Value {
    let document = controller.current_document();
    let emojis: Vec<Value> = document
        .emojis()
        .iter()
        .map(|e| {
            json!({
                "id": e.id().get(),
                "text": e.text(),
                "x": e.x(),
                "y": e.y(),
                "size": e.size(),
            })
        })
        .collect();

    json!({
        "background": document.background().to_string(),
        "fetch_status": controller.current_fetch_status().to_string(),
        "background_image": controller
            .background_image()
            .map(|image| json!({ "width": image.width(), "height": image.height() })),
        "emojis": emojis,
        "next_emoji_id": document.next_emoji_id().get(),
    })
}

fn demo_step(
    action: &str,
    controller: &DocumentController,
    history: &UndoHistory<DocumentController>,
) -> Value {
    let texts: Vec<&str> = controller
        .current_document()
        .emojis()
        .iter()
        .map(|e| e.text())
        .collect();
    json!({
        "action": action,
        "emojis": texts.concat(),
        "undo": history.undo_action_name(),
        "redo": history.redo_action_name(),
    })
}

fn is_single_emoji(text: &str) -> bool {
    matches!(graphemes(text).as_slice(), [cluster] if is_emoji(cluster))
}

async fn load_background(source: &BackgroundSource) -> anyhow::Result<Background> {
    Ok(match source {
        BackgroundSource::Blank => Background::Blank,
        BackgroundSource::Url { url } => {
            let target = image_url(url);
            if &target != url {
                tracing::info!("Using image URL {target}");
            }
            Background::Url(target)
        }
        BackgroundSource::File { path } => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            Background::ImageData(bytes)
        }
    })
}
