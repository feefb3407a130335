//! Rolling record of the latest note decisions, newest first.
//!
//! Detection never reads it back; it is there for callers that want to
//! debounce the display.

use std::collections::VecDeque;

/// Default number of remembered notes.
pub const DEFAULT_CAPACITY: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct NoteHistory {
    slots: VecDeque<Option<String>>,
}

impl Default for NoteHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NoteHistory {
    /// Creates a history of `capacity` empty slots (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: std::iter::repeat_n(None, capacity).collect(),
        }
    }

    /// Puts `note` in front and drops the oldest entry.
    pub fn record(&mut self, note: impl Into<String>) {
        self.slots.pop_back();
        self.slots.push_front(Some(note.into()));
    }

    /// Most-recent-first view of the slots; `None` marks a slot not filled yet.
    pub fn notes(&self) -> impl Iterator<Item = Option<&str>> {
        self.slots.iter().map(|slot| slot.as_deref())
    }

    pub fn latest(&self) -> Option<&str> {
        self.slots.front().and_then(|slot| slot.as_deref())
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The note held by more than half of the slots, if there is one.
    ///
    /// With the default capacity of two this means "the last two decisions agree".
    pub fn majority(&self) -> Option<&str> {
        let needed = self.slots.len() / 2 + 1;
        self.slots.iter().flatten().find_map(|candidate| {
            let votes = self
                .slots
                .iter()
                .filter(|slot| slot.as_ref() == Some(candidate))
                .count();
            (votes >= needed).then_some(candidate.as_str())
        })
    }
}
