//! Per-event result list.

use std::fmt;

use tracing::{debug, info, warn};

/// One line of what a handler did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A remote mutation was made.
    Applied(String),
    /// State already matched; nothing to do.
    Unchanged(String),
    /// An independent sub-task failed while its siblings carried on.
    Failed(String),
}

impl Entry {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Applied(m) | Self::Unchanged(m) | Self::Failed(m) => m,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Ordered entries produced by one handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    entries: Vec<Entry>,
}

impl Outcome {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn applied(message: impl Into<String>) -> Self {
        Self::from(Entry::Applied(message.into()))
    }

    #[must_use]
    pub fn unchanged(message: impl Into<String>) -> Self {
        Self::from(Entry::Unchanged(message.into()))
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Messages of every `Applied` entry.
    #[must_use]
    pub fn applied_messages(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| matches!(e, Entry::Applied(_)))
            .map(Entry::message)
            .collect()
    }

    /// Messages of every `Failed` entry.
    #[must_use]
    pub fn failures(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| matches!(e, Entry::Failed(_)))
            .map(Entry::message)
            .collect()
    }

    /// True when nothing was changed and nothing failed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.entries.iter().all(|e| matches!(e, Entry::Unchanged(_)))
    }

    /// Emit every entry at its level.
    pub fn log(&self) {
        for entry in &self.entries {
            match entry {
                Entry::Applied(m) => info!("{m}"),
                Entry::Unchanged(m) => debug!("{m}"),
                Entry::Failed(m) => warn!("{m}"),
            }
        }
    }
}

impl From<Entry> for Outcome {
    fn from(entry: Entry) -> Self {
        Self {
            entries: vec![entry],
        }
    }
}

impl FromIterator<Entry> for Outcome {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
