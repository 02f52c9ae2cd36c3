use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
    System,
}

/// One line of the session transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only transcript for the live session.
///
/// Entries keep strict append order; nothing reorders or deduplicates them.
/// The log is the single source of truth shared between the event loop and
/// the control surface.
#[derive(Default)]
pub struct TranscriptLog {
    entries: Mutex<Vec<TranscriptEntry>>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, role: Role, text: impl Into<String>) {
        let entry = TranscriptEntry::new(role, text);
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    /// Current entries, in append order.
    pub fn snapshot(&self) -> Vec<TranscriptEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Drain the log, returning everything appended so far.
    pub fn take(&self) -> Vec<TranscriptEntry> {
        match self.entries.lock() {
            Ok(mut entries) => std::mem::take(&mut *entries),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trim system markers before persistence; only user/ai lines are stored.
pub fn without_system(entries: &[TranscriptEntry]) -> Vec<TranscriptEntry> {
    entries
        .iter()
        .filter(|entry| entry.role != Role::System)
        .cloned()
        .collect()
}
