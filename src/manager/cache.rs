//! Single-slot TTL cache cells for authentication results.

use crate::io::SourceToken;
use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock};

struct Entry<T> {
    key: SourceToken,
    value: T,
    deadline: DateTime<Utc>,
}

/// One atomically replaceable cache slot keyed by source identity.
///
/// An entry is fresh while `now < deadline`; an obsolete entry is
/// semantically empty and lookups miss it. Entries are only ever replaced
/// wholesale, so readers see the old or the new entry, never a partial one.
/// With a zero cache period the deadline equals the insertion time and the
/// entry is obsolete at birth: caching is effectively disabled.
pub(crate) struct CacheCell<T> {
    cell: RwLock<Option<Entry<T>>>,
}

impl<T: Clone> CacheCell<T> {
    pub(crate) fn new() -> Self {
        Self {
            cell: RwLock::new(None),
        }
    }

    /// Returns the cached value if the entry matches `key` and is fresh.
    pub(crate) fn lookup(&self, key: &SourceToken, now: DateTime<Utc>) -> Option<T> {
        self.cell
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|entry| entry.key == *key && now < entry.deadline)
            .map(|entry| entry.value.clone())
    }

    /// Replaces the slot with a new entry.
    pub(crate) fn insert(&self, key: SourceToken, value: T, deadline: DateTime<Utc>) {
        *self.cell.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Entry { key, value, deadline });
    }

    /// Re-associates the current entry, if any, with a new key. Value and
    /// deadline carry over.
    pub(crate) fn rekey(&self, key: SourceToken) {
        if let Some(entry) = self
            .cell
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            entry.key = key;
        }
    }

    /// Empties the slot.
    pub(crate) fn clear(&self) {
        *self.cell.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
