use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use crate::dynamic::MessageHandle;

const MIN_PURGE_LEN: usize = 16;

/// Maps block addresses to the live handle wrapping them.
///
/// Entries are weak so the cache never keeps a handle alive. Dead entries are removed lazily when
/// the table has doubled in size since the last purge.
#[derive(Default)]
pub(super) struct IdentityCache {
    entries: HashMap<usize, Weak<MessageHandle>>,
    next_purge: usize,
}

impl IdentityCache {
    pub(super) fn get(&self, key: usize) -> Option<Arc<MessageHandle>> {
        self.entries.get(&key).and_then(Weak::upgrade)
    }

    pub(super) fn insert(&mut self, key: usize, handle: &Arc<MessageHandle>) {
        if self.entries.len() >= self.next_purge {
            self.purge();
        }
        self.entries.insert(key, Arc::downgrade(handle));
    }

    /// Moves every live entry of `other` into this cache.
    pub(super) fn absorb(&mut self, other: IdentityCache) {
        self.entries.extend(
            other
                .entries
                .into_iter()
                .filter(|(_, handle)| handle.strong_count() > 0),
        );
    }

    fn purge(&mut self) {
        self.entries.retain(|_, handle| handle.strong_count() > 0);
        self.next_purge = (self.entries.len() * 2).max(MIN_PURGE_LEN);
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }
}
