//! Command history buffer with cursor-based recall.
//!
//! Stores previously submitted text commands in insertion order with a
//! movable cursor for arrow-key style recall. Uses a fixed-capacity ring
//! buffer to prevent unbounded growth.

use std::collections::VecDeque;

/// Insertion-ordered buffer of submitted commands with a recall cursor.
///
/// The cursor lives in `[0, len]`; `len` means "no historical item selected,
/// input is free-typed". Recall never mutates stored entries.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    /// Commands in submission order (oldest first).
    entries: VecDeque<String>,
    /// Recall cursor, `entries.len()` when past-the-end.
    cursor: usize,
    /// Maximum number of commands to retain.
    max_entries: usize,
}

impl HistoryBuffer {
    /// Create a buffer retaining at most `max_entries` commands.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(64)),
            cursor: 0,
            max_entries: max_entries.max(1),
        }
    }

    /// Record a submitted command and reset the cursor past-the-end.
    ///
    /// Empty commands and commands equal to the immediately preceding entry
    /// are not re-appended (consecutive-duplicate suppression); the cursor is
    /// reset either way.
    pub fn submit(&mut self, text: &str) {
        if !text.is_empty() && self.entries.back().map(String::as_str) != Some(text) {
            if self.entries.len() >= self.max_entries {
                self.entries.pop_front();
            }
            self.entries.push_back(text.to_owned());
        }
        self.cursor = self.entries.len();
    }

    /// Move the cursor one step toward the oldest entry and return it.
    ///
    /// Returns `None` when the buffer is empty. At the floor the cursor stays
    /// put and the oldest entry is returned again.
    pub fn recall_previous(&mut self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        if self.cursor > 0 {
            self.cursor -= 1;
        }
        self.entries.get(self.cursor).cloned()
    }

    /// Move the cursor one step toward the newest entry and return it.
    ///
    /// From the last real entry this advances past-the-end and returns an
    /// empty string (clears the input). Past the end it is a no-op returning
    /// `None`.
    pub fn recall_next(&mut self) -> Option<String> {
        if self.cursor + 1 < self.entries.len() {
            self.cursor += 1;
            self.entries.get(self.cursor).cloned()
        } else if self.cursor < self.entries.len() {
            self.cursor = self.entries.len();
            Some(String::new())
        } else {
            None
        }
    }

    /// Number of stored commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the buffer holds no commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(500)
    }
}
