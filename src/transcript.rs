//! Append-only conversation transcript.
//!
//! Entries are immutable once appended except for [`RenderState`], which only
//! the media resolver advances. The log grows monotonically for the session
//! lifetime; nothing is ever removed or deduplicated.

use chrono::{DateTime, Utc};

/// Speaker role of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Local user input (typed, spoken, or an image preview).
    User,
    /// Assistant output.
    Sami,
    /// Client-side notices and error reports.
    System,
}

impl Role {
    /// Display label used when rendering the entry.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Sami => "SAMi",
            Self::System => "System",
        }
    }
}

/// Media rendering state of an entry carrying an image reference.
///
/// `Direct -> Failed` is never a legal transition; a failed direct load must
/// pass through `RetryingProxy` first (exactly one proxy retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// No image on this entry.
    None,
    /// Direct load of the original reference in progress.
    Direct,
    /// Direct load failed; one-shot proxy retry in progress.
    RetryingProxy,
    /// Proxy retry also failed; image permanently hidden.
    Failed,
}

/// Inline marker shown when both load attempts fail.
pub const FAILURE_MARKER: &str = "[Image Failed to Load]";

/// One unit of the conversation transcript.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub role: Role,
    pub text: String,
    /// Original image reference, if the entry carries media.
    pub image_ref: Option<String>,
    /// Advanced only by the media resolver.
    pub render_state: RenderState,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Render the entry for display, including the failure marker when the
    /// terminal media state has been reached. The marker is derived from
    /// state, so it can never appear twice.
    #[must_use]
    pub fn display_text(&self) -> String {
        let line = format!("{}: {}", self.role.label(), self.text);
        if self.render_state == RenderState::Failed {
            format!("{line}\n{FAILURE_MARKER}")
        } else {
            line
        }
    }
}

/// Identifier of a transcript entry (its position in the log).
pub type EntryId = usize;

/// Ordered, append-only sequence of [`LogEntry`].
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<LogEntry>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the tail and return its id.
    ///
    /// Entries with an image reference start in [`RenderState::Direct`]
    /// (the load attempt begins immediately).
    pub fn append(&mut self, role: Role, text: impl Into<String>, image_ref: Option<String>) -> EntryId {
        let render_state = if image_ref.is_some() {
            RenderState::Direct
        } else {
            RenderState::None
        };
        self.entries.push(LogEntry {
            role,
            text: text.into(),
            image_ref,
            render_state,
            timestamp: Utc::now(),
        });
        self.entries.len() - 1
    }

    /// Record that the direct load failed and the proxy retry is starting.
    ///
    /// Returns the original image reference to re-fetch via proxy, or `None`
    /// if the entry is not in the `Direct` state.
    pub fn begin_proxy_retry(&mut self, id: EntryId) -> Option<String> {
        let entry = self.entries.get_mut(id)?;
        if entry.render_state != RenderState::Direct {
            return None;
        }
        entry.render_state = RenderState::RetryingProxy;
        entry.image_ref.clone()
    }

    /// Record that the proxy retry also failed (terminal).
    ///
    /// Only legal from `RetryingProxy`; repeated calls are no-ops, keeping
    /// the terminal state idempotent.
    pub fn mark_failed(&mut self, id: EntryId) {
        if let Some(entry) = self.entries.get_mut(id)
            && entry.render_state == RenderState::RetryingProxy
        {
            entry.render_state = RenderState::Failed;
        }
    }

    /// Get an entry by id.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> Option<&LogEntry> {
        self.entries.get(id)
    }

    /// All entries in append order.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// The most recently appended entry.
    ///
    /// A view honoring the auto-scroll invariant always keeps this visible.
    #[must_use]
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// The newest `n` entries in append order (for a scrolled-to-end view).
    #[must_use]
    pub fn tail(&self, n: usize) -> &[LogEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the transcript is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
