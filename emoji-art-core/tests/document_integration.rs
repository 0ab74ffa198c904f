//! Document Controller Integration Tests
//!
//! Tests the controller end to end:
//! - Id allocation and removal scenarios
//! - Undo/redo of every mutating operation
//! - Background resolution, including superseded fetches
//! - Snapshot save/load through the controller

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use emoji_art_core::{
    AsyncFetcher, Background, DecodeError, DecodedImage, DocumentController, DocumentModel,
    EmojiId, FetchError, FetchStatus, ImageDecoder, UndoHistory, UndoManager,
};
use tokio::sync::oneshot;
use url::Url;

const PNG_SIGNATURE: [u8; 4] = [0x89, b'P', b'N', b'G'];

type FetchResult = Result<Vec<u8>, FetchError>;

/// Decodes anything carrying the PNG signature; the pixels are the payload
/// after the signature so tests can tell images apart.
struct TaggedDecoder;

impl ImageDecoder for TaggedDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        match bytes.strip_prefix(&PNG_SIGNATURE) {
            Some(payload) => Ok(DecodedImage::new(1, 1, payload.to_vec())),
            None => Err(DecodeError("missing PNG signature".to_string())),
        }
    }
}

/// Fetcher whose responses are released by the test, one gate per request.
#[derive(Default)]
struct GatedFetcher {
    gates: Mutex<HashMap<String, VecDeque<oneshot::Receiver<FetchResult>>>>,
}

impl GatedFetcher {
    fn gate(&self, url: &Url) -> oneshot::Sender<FetchResult> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .expect("gates lock")
            .entry(url.to_string())
            .or_default()
            .push_back(rx);
        tx
    }
}

#[async_trait]
impl AsyncFetcher for GatedFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let gate = self
            .gates
            .lock()
            .expect("gates lock")
            .get_mut(url.as_str())
            .and_then(VecDeque::pop_front);
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(FetchError::Transport("gate dropped".to_string()))),
            None => Err(FetchError::Status(404)),
        }
    }
}

fn png(tag: &str) -> Vec<u8> {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend_from_slice(tag.as_bytes());
    bytes
}

fn url(path: &str) -> Url {
    Url::parse(&format!("https://images.example.com/{path}")).expect("valid url")
}

fn controller_with(fetcher: Arc<GatedFetcher>) -> DocumentController {
    DocumentController::new(Arc::new(TaggedDecoder), fetcher)
}

fn image_tag(controller: &DocumentController) -> Option<String> {
    controller
        .background_image()
        .map(|image| String::from_utf8_lossy(image.pixels()).into_owned())
}

fn record_statuses(controller: &mut DocumentController) -> Rc<RefCell<Vec<FetchStatus>>> {
    let statuses = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&statuses);
    controller.on_change(move |_, status| seen.borrow_mut().push(status.clone()));
    statuses
}

// ============================================================================
// Ids and removal
// ============================================================================

#[test]
fn test_add_add_remove_scenario() {
    let mut controller = controller_with(Arc::default());

    let first = controller.add_emoji("😀", (0, 0), 30, None);
    let second = controller.add_emoji("🎉", (10, 10), 20, None);
    assert_eq!(first.id(), EmojiId::new(1));
    assert_eq!(second.id(), EmojiId::new(2));

    controller.remove_emoji(first.id(), None);
    let emojis = controller.current_document().emojis();
    assert_eq!(emojis.len(), 1);
    assert_eq!(emojis[0].id(), EmojiId::new(2));
    assert_eq!(emojis[0].position(), (10, 10));
    assert_eq!(emojis[0].size(), 20);
}

#[test]
fn test_ids_strictly_increase_across_undo_and_removal() {
    let mut controller = controller_with(Arc::default());
    let mut history: UndoHistory<DocumentController> = UndoHistory::new();
    let mut ids = Vec::new();

    for round in 0..6 {
        let emoji = controller.add_emoji("⭐", (round, round), 12, Some(&mut history));
        ids.push(emoji.id());
        match round % 3 {
            0 => {
                controller.remove_emoji(emoji.id(), Some(&mut history));
            }
            1 => {
                history.undo(&mut controller);
            }
            _ => {}
        }
    }

    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}

// ============================================================================
// Undo / redo
// ============================================================================

type Operation = Box<dyn Fn(&mut DocumentController, &mut dyn UndoManager<DocumentController>)>;

fn op(
    f: impl Fn(&mut DocumentController, &mut dyn UndoManager<DocumentController>) + 'static,
) -> Operation {
    Box::new(f)
}

/// Every mutating operation, applied to a controller with one emoji (id 1).
fn operations() -> Vec<(&'static str, Operation)> {
    vec![
        (
            "add",
            op(|c, u| {
                c.add_emoji("🐶", (5, 5), 40, Some(u));
            }),
        ),
        (
            "move",
            op(|c, u| {
                c.move_emoji(EmojiId::new(1), (7, -3), Some(u));
            }),
        ),
        (
            "resize",
            op(|c, u| {
                c.resize_emoji(EmojiId::new(1), 64, Some(u));
            }),
        ),
        (
            "scale",
            op(|c, u| {
                c.scale_emoji(EmojiId::new(1), 1.5, Some(u));
            }),
        ),
        (
            "remove",
            op(|c, u| {
                c.remove_emoji(EmojiId::new(1), Some(u));
            }),
        ),
        (
            "background",
            op(|c, u| c.set_background(Background::ImageData(png("bg")), Some(u))),
        ),
    ]
}

#[test]
fn test_undo_and_redo_restore_exact_snapshots() {
    for (name, operation) in operations() {
        let mut controller = controller_with(Arc::default());
        let mut history: UndoHistory<DocumentController> = UndoHistory::new();
        controller.add_emoji("😀", (0, 0), 30, None);
        controller.add_emoji("🎉", (1, 1), 30, None);

        let before = controller.current_document().clone();
        operation(&mut controller, &mut history);
        let after = controller.current_document().clone();
        assert_ne!(before, after, "{name} should change the document");

        assert!(history.undo(&mut controller), "{name} should be undoable");
        assert_eq!(controller.current_document(), &before, "undo {name}");

        assert!(history.redo(&mut controller), "{name} should be redoable");
        assert_eq!(controller.current_document(), &after, "redo {name}");
    }
}

#[test]
fn test_multi_step_undo_walks_back_in_order() {
    let mut controller = controller_with(Arc::default());
    let mut history: UndoHistory<DocumentController> = UndoHistory::new();

    let mut states = vec![controller.current_document().clone()];
    let id = controller.add_emoji("😀", (0, 0), 30, Some(&mut history)).id();
    states.push(controller.current_document().clone());
    controller.move_emoji(id, (10, 0), Some(&mut history));
    states.push(controller.current_document().clone());
    controller.resize_emoji(id, 50, Some(&mut history));
    states.push(controller.current_document().clone());
    assert_eq!(history.undo_action_name(), Some("Resize"));

    for expected in states.iter().rev().skip(1) {
        assert!(history.undo(&mut controller));
        assert_eq!(controller.current_document(), expected);
    }
    assert!(!history.can_undo());

    while history.redo(&mut controller) {}
    assert_eq!(controller.current_document(), &states[3]);
}

#[test]
fn test_undo_of_remove_then_move_of_restored_emoji() {
    let mut controller = controller_with(Arc::default());
    let mut history: UndoHistory<DocumentController> = UndoHistory::new();
    let id = controller.add_emoji("😀", (0, 0), 30, None).id();

    controller.remove_emoji(id, Some(&mut history));
    assert!(!controller.move_emoji(id, (1, 1), None));

    history.undo(&mut controller);
    assert!(controller.move_emoji(id, (1, 1), None));
    assert_eq!(
        controller.current_document().emoji(id).map(|e| e.position()),
        Some((1, 1))
    );
}

// ============================================================================
// Background resolution
// ============================================================================

#[tokio::test]
async fn test_url_background_fetches_then_idles() {
    let fetcher = Arc::new(GatedFetcher::default());
    let a = url("a.png");
    let gate = fetcher.gate(&a);
    let mut controller = controller_with(Arc::clone(&fetcher));
    let statuses = record_statuses(&mut controller);

    controller.set_background(Background::Url(a), None);
    assert_eq!(controller.current_fetch_status(), &FetchStatus::Fetching);
    assert!(controller.background_image().is_none());

    gate.send(Ok(png("A"))).expect("send");
    controller.settle().await;

    assert_eq!(image_tag(&controller).as_deref(), Some("A"));
    assert_eq!(
        *statuses.borrow(),
        vec![FetchStatus::Fetching, FetchStatus::Idle]
    );
}

#[tokio::test]
async fn test_superseded_fetch_success_is_discarded() {
    let fetcher = Arc::new(GatedFetcher::default());
    let (a, b) = (url("a.png"), url("b.png"));
    let gate_a = fetcher.gate(&a);
    let gate_b = fetcher.gate(&b);
    let mut controller = controller_with(Arc::clone(&fetcher));

    controller.set_background(Background::Url(a), None);
    controller.set_background(Background::Url(b.clone()), None);

    gate_b.send(Ok(png("B"))).expect("send");
    assert!(controller.next_fetch_completion().await);
    assert_eq!(image_tag(&controller).as_deref(), Some("B"));

    let statuses = record_statuses(&mut controller);
    gate_a.send(Ok(png("A"))).expect("send");
    controller.settle().await;

    assert_eq!(image_tag(&controller).as_deref(), Some("B"));
    assert_eq!(controller.current_fetch_status(), &FetchStatus::Idle);
    assert_eq!(controller.current_document().background(), &Background::Url(b));
    assert!(statuses.borrow().is_empty());
}

#[tokio::test]
async fn test_superseded_fetch_failure_is_discarded() {
    let fetcher = Arc::new(GatedFetcher::default());
    let (a, b) = (url("a.png"), url("b.png"));
    let gate_a = fetcher.gate(&a);
    let gate_b = fetcher.gate(&b);
    let mut controller = controller_with(Arc::clone(&fetcher));

    controller.set_background(Background::Url(a), None);
    controller.set_background(Background::Url(b), None);

    gate_a
        .send(Err(FetchError::Transport("connection reset".to_string())))
        .expect("send");
    assert!(controller.next_fetch_completion().await);
    assert_eq!(controller.current_fetch_status(), &FetchStatus::Fetching);

    gate_b.send(Ok(png("B"))).expect("send");
    controller.settle().await;
    assert_eq!(controller.current_fetch_status(), &FetchStatus::Idle);
    assert_eq!(image_tag(&controller).as_deref(), Some("B"));
}

#[tokio::test]
async fn test_same_url_twice_is_independently_superseded() {
    let fetcher = Arc::new(GatedFetcher::default());
    let a = url("a.png");
    let first = fetcher.gate(&a);
    let second = fetcher.gate(&a);
    let mut controller = controller_with(Arc::clone(&fetcher));

    controller.set_background(Background::Url(a.clone()), None);
    // Let the first fetch claim its gate before the second one starts.
    tokio::task::yield_now().await;
    controller.set_background(Background::Url(a), None);
    assert_eq!(controller.fetches_in_flight(), 2);

    second.send(Ok(png("second"))).expect("send");
    assert!(controller.next_fetch_completion().await);
    first.send(Ok(b"not an image".to_vec())).expect("send");
    controller.settle().await;

    assert_eq!(controller.current_fetch_status(), &FetchStatus::Idle);
    assert_eq!(image_tag(&controller).as_deref(), Some("second"));
    assert_eq!(controller.fetches_in_flight(), 0);
}

#[tokio::test]
async fn test_fetch_and_decode_failures_report_url() {
    let fetcher = Arc::new(GatedFetcher::default());
    let missing = url("missing.png");
    let garbage = url("garbage.png");
    let gate = fetcher.gate(&garbage);
    let mut controller = controller_with(Arc::clone(&fetcher));

    controller.set_background(Background::Url(missing.clone()), None);
    controller.settle().await;
    assert_eq!(
        controller.current_fetch_status(),
        &FetchStatus::Failed(Some(missing))
    );

    controller.set_background(Background::Url(garbage.clone()), None);
    gate.send(Ok(b"<html>".to_vec())).expect("send");
    controller.settle().await;
    assert_eq!(
        controller.current_fetch_status(),
        &FetchStatus::Failed(Some(garbage))
    );
    assert!(controller.background_image().is_none());
}

/// Decoder that panics on every input.
struct PanickingDecoder;

impl ImageDecoder for PanickingDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        panic!("decoder blew up");
    }
}

#[tokio::test]
async fn test_panicking_decoder_reports_failure() {
    let fetcher = Arc::new(GatedFetcher::default());
    let a = url("a.png");
    let gate = fetcher.gate(&a);
    let mut controller = DocumentController::new(Arc::new(PanickingDecoder), fetcher);

    controller.set_background(Background::Url(a.clone()), None);
    gate.send(Ok(png("A"))).expect("send");
    tokio::time::timeout(std::time::Duration::from_secs(2), controller.settle())
        .await
        .expect("settles before timeout");

    assert_eq!(controller.current_fetch_status(), &FetchStatus::Failed(Some(a)));
    assert_eq!(controller.fetches_in_flight(), 0);
}

#[tokio::test]
async fn test_blank_background_cancels_fetch() {
    let fetcher = Arc::new(GatedFetcher::default());
    let a = url("a.png");
    let gate = fetcher.gate(&a);
    let mut controller = controller_with(Arc::clone(&fetcher));

    controller.set_background(Background::Url(a), None);
    controller.set_background(Background::Blank, None);
    assert_eq!(controller.current_fetch_status(), &FetchStatus::Idle);

    gate.send(Ok(png("A"))).expect("send");
    controller.settle().await;
    assert!(controller.background_image().is_none());
    assert_eq!(controller.current_fetch_status(), &FetchStatus::Idle);
}

#[tokio::test]
async fn test_image_data_never_enters_fetching() {
    let mut controller = controller_with(Arc::default());
    let statuses = record_statuses(&mut controller);

    controller.set_background(Background::ImageData(png("inline")), None);
    assert_eq!(image_tag(&controller).as_deref(), Some("inline"));

    controller.set_background(Background::ImageData(b"garbage".to_vec()), None);
    assert_eq!(
        *statuses.borrow(),
        vec![FetchStatus::Idle, FetchStatus::Failed(None)]
    );
    assert_eq!(controller.fetches_in_flight(), 0);
}

#[tokio::test]
async fn test_subscriber_is_woken_by_fetch_completion() {
    let fetcher = Arc::new(GatedFetcher::default());
    let a = url("a.png");
    let gate = fetcher.gate(&a);
    let mut controller = controller_with(Arc::clone(&fetcher));
    let mut rx = controller.subscribe();

    controller.set_background(Background::Url(a), None);
    rx.borrow_and_update();
    gate.send(Ok(png("A"))).expect("send");
    controller.settle().await;

    assert!(rx.has_changed().expect("sender alive"));
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.fetch_status, FetchStatus::Idle);
    assert!(state.background_image.is_some());
}

// ============================================================================
// Snapshots
// ============================================================================

#[tokio::test]
async fn test_snapshot_reload_resolves_background() {
    let fetcher = Arc::new(GatedFetcher::default());
    let a = url("a.png");
    let mut source = controller_with(Arc::default());
    source.add_emoji("😀", (3, 4), 30, None);
    source.set_background(Background::Url(a.clone()), None);
    let bytes = source.snapshot().expect("snapshot");

    let gate = fetcher.gate(&a);
    let mut reopened = DocumentController::from_snapshot(&bytes, Arc::new(TaggedDecoder), fetcher)
        .expect("reopen");
    assert_eq!(reopened.current_document(), source.current_document());
    assert_eq!(reopened.current_fetch_status(), &FetchStatus::Fetching);

    gate.send(Ok(png("A"))).expect("send");
    reopened.settle().await;
    assert_eq!(image_tag(&reopened).as_deref(), Some("A"));
}

#[test]
fn test_load_snapshot_replaces_document() {
    let mut source = DocumentModel::new();
    source.add_emoji("🐶", (1, 1), 20);
    source.add_emoji("🐱", (2, 2), 20);
    let bytes = source.serialize().expect("serialize");

    let mut controller = controller_with(Arc::default());
    controller.add_emoji("😀", (0, 0), 30, None);
    controller.load_snapshot(&bytes).expect("load");
    assert_eq!(controller.current_document(), &source);
    assert_eq!(controller.add_emoji("🐭", (0, 0), 20, None).id(), EmojiId::new(3));
}
