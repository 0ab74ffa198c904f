//! Undo/redo integration.
//!
//! [`UndoManager`] is the collaborator contract mutating operations record
//! their inverses with. Hosts may bring their own; [`UndoHistory`] is the
//! in-process implementation with two bounded stacks.
//!
//! An [`UndoAction`] receives the manager that is running it, and is expected
//! to register its own inverse there. While undoing, registrations land on
//! the redo stack; while redoing, on the undo stack.

use std::collections::VecDeque;
use std::fmt;

/// Maximum number of entries kept on each stack; the oldest are dropped.
pub const MAX_UNDO_HISTORY_LEN: usize = 100;

/// A recorded inverse operation on a target of type `T`.
pub type UndoAction<T> = Box<dyn FnOnce(&mut T, &mut dyn UndoManager<T>)>;

/// Box a closure as an [`UndoAction`], pinning down its argument types.
pub fn undo_action<T, F>(action: F) -> UndoAction<T>
where
    F: FnOnce(&mut T, &mut dyn UndoManager<T>) + 'static,
{
    Box::new(action)
}

/// Records inverse actions and replays them on request.
pub trait UndoManager<T> {
    /// Record an action that reverses the operation just performed.
    fn register_undo(&mut self, name: &str, action: UndoAction<T>);

    /// Run the most recent undo action against `target`.
    /// Returns `false` when there was nothing to undo.
    fn undo(&mut self, target: &mut T) -> bool;

    /// Run the most recent redo action against `target`.
    /// Returns `false` when there was nothing to redo.
    fn redo(&mut self, target: &mut T) -> bool;

    /// Whether [`undo`](Self::undo) would do anything.
    fn can_undo(&self) -> bool;

    /// Whether [`redo`](Self::redo) would do anything.
    fn can_redo(&self) -> bool;

    /// Name of the action [`undo`](Self::undo) would run.
    fn undo_action_name(&self) -> Option<&str>;

    /// Name of the action [`redo`](Self::redo) would run.
    fn redo_action_name(&self) -> Option<&str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Undoing,
    Redoing,
}

struct Entry<T> {
    name: String,
    action: UndoAction<T>,
}

/// Two-stack undo history.
pub struct UndoHistory<T> {
    undo_stack: VecDeque<Entry<T>>,
    redo_stack: VecDeque<Entry<T>>,
    mode: Mode,
    max_len: usize,
}

impl<T> UndoHistory<T> {
    /// Create an empty history holding up to [`MAX_UNDO_HISTORY_LEN`] entries per stack.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_len(MAX_UNDO_HISTORY_LEN)
    }

    /// Create an empty history with a custom bound.
    #[must_use]
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            mode: Mode::Idle,
            max_len: max_len.max(1),
        }
    }

    /// Number of undoable entries.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of redoable entries.
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn push_bounded(stack: &mut VecDeque<Entry<T>>, entry: Entry<T>, max_len: usize) {
        stack.push_back(entry);
        if stack.len() > max_len {
            stack.pop_front();
        }
    }
}

impl<T: 'static> UndoManager<T> for UndoHistory<T> {
    fn register_undo(&mut self, name: &str, action: UndoAction<T>) {
        let entry = Entry {
            name: name.to_string(),
            action,
        };
        match self.mode {
            Mode::Idle => {
                self.redo_stack.clear();
                Self::push_bounded(&mut self.undo_stack, entry, self.max_len);
            }
            Mode::Undoing => Self::push_bounded(&mut self.redo_stack, entry, self.max_len),
            Mode::Redoing => Self::push_bounded(&mut self.undo_stack, entry, self.max_len),
        }
    }

    fn undo(&mut self, target: &mut T) -> bool {
        let Some(entry) = self.undo_stack.pop_back() else {
            return false;
        };
        tracing::debug!("Undo {}", entry.name);
        self.mode = Mode::Undoing;
        (entry.action)(target, self);
        self.mode = Mode::Idle;
        true
    }

    fn redo(&mut self, target: &mut T) -> bool {
        let Some(entry) = self.redo_stack.pop_back() else {
            return false;
        };
        tracing::debug!("Redo {}", entry.name);
        self.mode = Mode::Redoing;
        (entry.action)(target, self);
        self.mode = Mode::Idle;
        true
    }

    fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn undo_action_name(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.name.as_str())
    }

    fn redo_action_name(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.name.as_str())
    }
}

impl<T> Default for UndoHistory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for UndoHistory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoHistory")
            .field(
                "undo",
                &self.undo_stack.iter().map(|e| &e.name).collect::<Vec<_>>(),
            )
            .field(
                "redo",
                &self.redo_stack.iter().map(|e| &e.name).collect::<Vec<_>>(),
            )
            .field("max_len", &self.max_len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Set the counter to `value`, recording how to get back.
    fn set_undoably(counter: &mut i32, value: i32, undo: &mut dyn UndoManager<i32>) {
        let previous = *counter;
        *counter = value;
        undo.register_undo(
            "Set",
            undo_action(move |counter: &mut i32, undo| set_undoably(counter, previous, undo)),
        );
    }

    #[test]
    fn test_undo_redo_cycle() {
        let mut history: UndoHistory<i32> = UndoHistory::new();
        let mut counter = 0;

        set_undoably(&mut counter, 5, &mut history);
        set_undoably(&mut counter, 9, &mut history);
        assert!(history.can_undo());
        assert!(!history.can_redo());

        assert!(history.undo(&mut counter));
        assert_eq!(counter, 5);
        assert!(history.can_redo());

        assert!(history.undo(&mut counter));
        assert_eq!(counter, 0);
        assert!(!history.undo(&mut counter));

        assert!(history.redo(&mut counter));
        assert_eq!(counter, 5);
        assert!(history.redo(&mut counter));
        assert_eq!(counter, 9);
        assert!(!history.redo(&mut counter));
        assert_eq!(history.undo_len(), 2);
    }

    #[test]
    fn test_new_action_clears_redo() {
        let mut history: UndoHistory<i32> = UndoHistory::new();
        let mut counter = 0;

        set_undoably(&mut counter, 1, &mut history);
        history.undo(&mut counter);
        assert!(history.can_redo());

        set_undoably(&mut counter, 2, &mut history);
        assert!(!history.can_redo());
        assert_eq!(history.undo_action_name(), Some("Set"));
    }

    #[test]
    fn test_bounded_history_drops_oldest() {
        let mut history: UndoHistory<i32> = UndoHistory::with_max_len(3);
        let mut counter = 0;
        for value in 1..=5 {
            set_undoably(&mut counter, value, &mut history);
        }
        assert_eq!(history.undo_len(), 3);

        while history.undo(&mut counter) {}
        assert_eq!(counter, 2);
    }

    #[test]
    fn test_clear() {
        let mut history: UndoHistory<i32> = UndoHistory::new();
        let mut counter = 0;
        set_undoably(&mut counter, 1, &mut history);
        history.clear();
        assert!(!history.can_undo());
        assert!(history.undo_action_name().is_none());
    }
}
