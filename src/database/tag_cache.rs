use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use crate::database::models::Tag;
use crate::error::{StoreError, StoreResult};

/// Point lookup of a tag row by primary key.
pub trait TagSource {
    fn fetch_tag(&self, id: i64) -> StoreResult<Option<Tag>>;
}

/// Memoizes tag rows by id for decoding tag lists.
///
/// Entries are never evicted. The tag table is small next to the post table,
/// so the whole of it fitting in memory is assumed. The lock is held across
/// the storage lookup so a miss is fetched exactly once even when several
/// threads ask for the same id.
#[derive(Debug, Default)]
pub struct TagCache {
    entries: Mutex<HashMap<i64, Arc<Tag>>>,
}

impl TagCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn get(&self, id: i64, source: &dyn TagSource) -> StoreResult<Arc<Tag>> {
        let mut entries = self.lock();
        if let Some(tag) = entries.get(&id) {
            return Ok(Arc::clone(tag));
        }
        trace!(id, "tag cache miss");
        let tag = Arc::new(source.fetch_tag(id)?.ok_or(StoreError::TagNotFound(id))?);
        entries.insert(id, Arc::clone(&tag));
        Ok(tag)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock cannot leave a half-written entry, so
    // poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Arc<Tag>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
