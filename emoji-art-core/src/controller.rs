//! The document controller: undoable mutation, background resolution, and
//! change notification around one [`DocumentModel`].
//!
//! ## Control flow
//!
//! ```text
//! host ── mutation ──► DocumentController ──► DocumentModel
//!                         │  snapshot before/after → UndoManager
//!                         │  background changed?  → BackgroundResolver ─► fetch task
//!                         ▼                                                  │
//!                      observers ◄── apply_fetch_completions / settle ◄─────┘
//! ```
//!
//! Everything runs on the owner's task. Fetch tasks never touch the
//! controller; their results are applied when the owner drains them.

use std::sync::Arc;

use tokio::sync::watch;

use crate::background::{
    AsyncFetcher, BackgroundResolver, Completed, DecodedImage, FetchCompletion, FetchStatus,
    ImageDecoder, Resolution,
};
use crate::error::{CoreResult, EmojiArtError};
use crate::model::{Background, DocumentModel, Emoji, EmojiId};
use crate::observer::{ObserverId, Observers};
use crate::undo::{undo_action, UndoManager};

/// Callback invoked after every change.
pub type ChangeCallback = dyn FnMut(&DocumentModel, &FetchStatus);

/// Everything a renderer needs, as published through [`DocumentController::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentState {
    /// The current document.
    pub document: DocumentModel,
    /// Background resolution status.
    pub fetch_status: FetchStatus,
    /// The resolved background image, if any.
    pub background_image: Option<DecodedImage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolve {
    IfChanged,
    Always,
}

/// Owns one document and applies mutations to it.
pub struct DocumentController {
    model: DocumentModel,
    background_image: Option<DecodedImage>,
    fetch_status: FetchStatus,
    resolver: BackgroundResolver,
    observers: Observers<ChangeCallback>,
    state_tx: watch::Sender<DocumentState>,
}

impl DocumentController {
    /// Create a controller around an empty document.
    #[must_use]
    pub fn new(decoder: Arc<dyn ImageDecoder>, fetcher: Arc<dyn AsyncFetcher>) -> Self {
        Self::from_model(DocumentModel::new(), decoder, fetcher)
    }

    /// Create a controller around an existing document and start resolving
    /// its background.
    #[must_use]
    pub fn from_model(
        model: DocumentModel,
        decoder: Arc<dyn ImageDecoder>,
        fetcher: Arc<dyn AsyncFetcher>,
    ) -> Self {
        let (state_tx, _) = watch::channel(DocumentState::default());
        let mut controller = Self {
            model,
            background_image: None,
            fetch_status: FetchStatus::Idle,
            resolver: BackgroundResolver::new(decoder, fetcher),
            observers: Observers::new(),
            state_tx,
        };
        controller.resolve_background();
        controller.publish();
        controller
    }

    /// Create a controller from snapshot bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EmojiArtError::MalformedSnapshot`] if the bytes are invalid.
    pub fn from_snapshot(
        bytes: &[u8],
        decoder: Arc<dyn ImageDecoder>,
        fetcher: Arc<dyn AsyncFetcher>,
    ) -> CoreResult<Self> {
        let model = DocumentModel::deserialize(bytes)?;
        Ok(Self::from_model(model, decoder, fetcher))
    }

    /// Initial load: open snapshot bytes, falling back to an empty document.
    ///
    /// The load error, if any, is handed back so the host can report it.
    #[must_use]
    pub fn open_or_empty(
        bytes: &[u8],
        decoder: Arc<dyn ImageDecoder>,
        fetcher: Arc<dyn AsyncFetcher>,
    ) -> (Self, Option<EmojiArtError>) {
        match DocumentModel::deserialize(bytes) {
            Ok(model) => (Self::from_model(model, decoder, fetcher), None),
            Err(e) => {
                tracing::warn!("Failed to open document, starting empty: {e}");
                (Self::new(decoder, fetcher), Some(e))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    /// The current document, for rendering.
    #[must_use]
    pub fn current_document(&self) -> &DocumentModel {
        &self.model
    }

    /// The current background resolution status.
    #[must_use]
    pub fn current_fetch_status(&self) -> &FetchStatus {
        &self.fetch_status
    }

    /// The resolved background image, if any.
    #[must_use]
    pub fn background_image(&self) -> Option<&DecodedImage> {
        self.background_image.as_ref()
    }

    /// The background generation; bumped by every background change.
    #[must_use]
    pub fn background_generation(&self) -> u64 {
        self.resolver.generation()
    }

    /// Number of background fetches that have not been applied yet,
    /// superseded ones included.
    #[must_use]
    pub fn fetches_in_flight(&self) -> usize {
        self.resolver.in_flight()
    }

    /// Serialize the current document.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn snapshot(&self) -> CoreResult<Vec<u8>> {
        self.model.serialize()
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// Call `callback` after every mutation and every fetch-status change.
    pub fn on_change<F>(&mut self, callback: F) -> ObserverId
    where
        F: FnMut(&DocumentModel, &FetchStatus) + 'static,
    {
        self.observers.add(Box::new(callback))
    }

    /// Stop calling a callback registered with [`on_change`](Self::on_change).
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    /// Watch the published state from async code.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DocumentState> {
        self.state_tx.subscribe()
    }

    // -----------------------------------------------------------------------
    // Undoable mutations
    // -----------------------------------------------------------------------

    /// Place a new emoji. Undo removes it.
    pub fn add_emoji(
        &mut self,
        text: &str,
        at: (i32, i32),
        size: u32,
        undo: Option<&mut dyn UndoManager<Self>>,
    ) -> Emoji {
        self.undoably_perform(&format!("Add {text}"), undo, Resolve::IfChanged, |model| {
            model.add_emoji(text, at, size)
        })
    }

    /// Move an emoji by `by`. Returns `false` (and records nothing) if it
    /// no longer exists.
    pub fn move_emoji(
        &mut self,
        id: EmojiId,
        by: (i32, i32),
        undo: Option<&mut dyn UndoManager<Self>>,
    ) -> bool {
        self.undoably_perform("Move", undo, Resolve::IfChanged, |model| {
            model.move_emoji(id, by)
        })
    }

    /// Set an emoji's size. Returns `false` if it no longer exists.
    pub fn resize_emoji(
        &mut self,
        id: EmojiId,
        size: u32,
        undo: Option<&mut dyn UndoManager<Self>>,
    ) -> bool {
        self.undoably_perform("Resize", undo, Resolve::IfChanged, |model| {
            model.resize_emoji(id, size)
        })
    }

    /// Scale an emoji's size. Returns `false` if it no longer exists.
    pub fn scale_emoji(
        &mut self,
        id: EmojiId,
        factor: f64,
        undo: Option<&mut dyn UndoManager<Self>>,
    ) -> bool {
        self.undoably_perform("Scale", undo, Resolve::IfChanged, |model| {
            model.scale_emoji(id, factor)
        })
    }

    /// Remove an emoji. Undo puts it back with its id and stacking order.
    pub fn remove_emoji(
        &mut self,
        id: EmojiId,
        undo: Option<&mut dyn UndoManager<Self>>,
    ) -> Option<Emoji> {
        self.undoably_perform("Remove", undo, Resolve::IfChanged, |model| {
            model.remove_emoji(id)
        })
    }

    /// Replace the background and start resolving it.
    ///
    /// Setting the same background again still starts a fresh resolution
    /// that supersedes any fetch in flight.
    pub fn set_background(
        &mut self,
        background: Background,
        undo: Option<&mut dyn UndoManager<Self>>,
    ) {
        self.undoably_perform("Set Background", undo, Resolve::Always, |model| {
            model.set_background(background);
        });
    }

    /// Replace the whole document with a loaded snapshot. Not undoable.
    ///
    /// # Errors
    ///
    /// Returns [`EmojiArtError::MalformedSnapshot`] and leaves the current
    /// document untouched if the bytes are invalid.
    pub fn load_snapshot(&mut self, bytes: &[u8]) -> CoreResult<()> {
        let model = DocumentModel::deserialize(bytes)?;
        tracing::info!("Loaded document with {} emoji", model.len());
        self.model = model;
        self.resolve_background();
        self.publish();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Fetch completion delivery
    // -----------------------------------------------------------------------

    /// Apply every fetch completion that has already arrived. Returns how
    /// many were taken off the channel, stale ones included.
    pub fn apply_fetch_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Some(completion) = self.resolver.try_next() {
            self.apply_completion(completion);
            applied += 1;
        }
        applied
    }

    /// Wait for one fetch completion and apply it. Returns `false` at once
    /// when nothing is in flight.
    pub async fn next_fetch_completion(&mut self) -> bool {
        match self.resolver.next().await {
            Some(completion) => {
                self.apply_completion(completion);
                true
            }
            None => false,
        }
    }

    /// Apply fetch completions until nothing is in flight.
    pub async fn settle(&mut self) {
        while self.next_fetch_completion().await {}
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn undoably_perform<R>(
        &mut self,
        name: &str,
        undo: Option<&mut dyn UndoManager<Self>>,
        resolve: Resolve,
        operation: impl FnOnce(&mut DocumentModel) -> R,
    ) -> R {
        let previous = self.model.clone();
        let result = operation(&mut self.model);
        let background_changed = self.model.background() != previous.background();

        if let Some(undo) = undo {
            if self.model != previous {
                Self::register_restore(undo, name.to_string(), previous);
            }
        }

        if background_changed || resolve == Resolve::Always {
            self.resolve_background();
        }
        self.publish();
        result
    }

    fn register_restore(undo: &mut dyn UndoManager<Self>, name: String, snapshot: DocumentModel) {
        let action_name = name.clone();
        undo.register_undo(
            &action_name,
            undo_action::<Self, _>(move |controller, undo| {
                controller.restore_snapshot(name, snapshot, undo);
            }),
        );
    }

    fn restore_snapshot(
        &mut self,
        name: String,
        snapshot: DocumentModel,
        undo: &mut dyn UndoManager<Self>,
    ) {
        let current = self.model.clone();
        let background_changed = current.background() != snapshot.background();
        self.model.restore_from(snapshot);
        Self::register_restore(undo, name, current);

        if background_changed {
            self.resolve_background();
        }
        self.publish();
    }

    fn resolve_background(&mut self) {
        match self.resolver.resolve(self.model.background()) {
            Resolution::Ready(image) => {
                self.background_image = image;
                self.fetch_status = FetchStatus::Idle;
            }
            Resolution::Fetching => {
                self.background_image = None;
                self.fetch_status = FetchStatus::Fetching;
            }
            Resolution::Failed(reference) => {
                self.background_image = None;
                self.fetch_status = FetchStatus::Failed(reference);
            }
        }
    }

    fn apply_completion(&mut self, completion: FetchCompletion) {
        let Some(completed) = self.resolver.accept(completion) else {
            return;
        };
        match completed {
            Completed::Image(image) => {
                tracing::debug!("Background resolved: {image:?}");
                self.background_image = Some(image);
                self.fetch_status = FetchStatus::Idle;
            }
            Completed::Failed(url) => {
                self.background_image = None;
                self.fetch_status = FetchStatus::Failed(Some(url));
            }
        }
        self.publish();
    }

    fn publish(&mut self) {
        for callback in self.observers.iter_mut() {
            callback(&self.model, &self.fetch_status);
        }
        self.state_tx.send_replace(DocumentState {
            document: self.model.clone(),
            fetch_status: self.fetch_status.clone(),
            background_image: self.background_image.clone(),
        });
    }
}

impl std::fmt::Debug for DocumentController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentController")
            .field("model", &self.model)
            .field("fetch_status", &self.fetch_status)
            .field("background_image", &self.background_image)
            .field("resolver", &self.resolver)
            .field("observers", &self.observers)
            .finish()
    }
}
