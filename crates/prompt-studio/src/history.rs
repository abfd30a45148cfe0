//! Generic undo/redo state container with branch truncation.
//!
//! [`HistoryState`] tracks an append-only sequence of value snapshots plus a
//! current index. Writes are equality-gated: committing a value equal to the
//! current one is a no-op, which is the sole guard against unbounded history
//! growth from repeated identical writes (e.g. a derived update re-writing
//! the same value). Writing after an undo discards the redo branch — the
//! design favors linear history over branching history.
//!
//! Equality is canonical-serialization equality: two values are equal iff
//! their `serde_json` string forms are identical. That is order-sensitive
//! for sequences and stable for derive-generated structs (field order is
//! fixed at compile time), but it is not a general-purpose equality
//! primitive — types with map fields or non-deterministic key order could
//! compare unequal despite being semantically identical.

use serde::Serialize;

/// Undo/redo container for snapshots of a serializable value.
///
/// Invariants: the history is never empty and `0 <= current < len` at all
/// times. The initial value occupies index 0 and can never be undone past.
#[derive(Debug, Clone)]
pub struct HistoryState<T: Serialize> {
    history: Vec<T>,
    current: usize,
}

/// Canonical-serialization equality. Serialization failure is treated as
/// "not equal" so a broken value can never silently swallow a write.
fn deep_equals<T: Serialize>(a: &T, b: &T) -> bool {
    match (serde_json::to_string(a), serde_json::to_string(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl<T: Serialize> HistoryState<T> {
    /// Create a container holding a single initial snapshot.
    pub fn new(initial: T) -> Self {
        Self {
            history: vec![initial],
            current: 0,
        }
    }

    /// The current snapshot.
    pub fn state(&self) -> &T {
        &self.history[self.current]
    }

    /// Commit a new snapshot.
    ///
    /// No-op returning `false` when `next` is value-equal to the current
    /// snapshot. Otherwise any redo branch beyond the current index is
    /// truncated, `next` is appended, and the index moves to it.
    pub fn set_state(&mut self, next: T) -> bool {
        if deep_equals(&next, self.state()) {
            return false;
        }
        self.history.truncate(self.current + 1);
        self.history.push(next);
        self.current = self.history.len() - 1;
        true
    }

    /// Commit a snapshot computed from the current one.
    pub fn set_with(&mut self, f: impl FnOnce(&T) -> T) -> bool {
        let next = f(self.state());
        self.set_state(next)
    }

    /// Step back one snapshot. No-op returning `false` at index 0.
    pub fn undo(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Step forward one snapshot. No-op returning `false` at the tail.
    pub fn redo(&mut self) -> bool {
        if self.current + 1 >= self.history.len() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Replace the entire history with a single snapshot.
    ///
    /// No-op returning `false` when the history already holds exactly one
    /// entry value-equal to `next`, so re-loading an identical state does not
    /// signal a transition.
    pub fn reset(&mut self, next: T) -> bool {
        if self.history.len() == 1 && deep_equals(&next, &self.history[0]) {
            return false;
        }
        self.history = vec![next];
        self.current = 0;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.history.len()
    }

    /// Number of snapshots currently held.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Always `false`: the history vector is never empty by construction.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
