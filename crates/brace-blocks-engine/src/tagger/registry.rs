use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::text::{BufferId, TextBuffer};

use super::block_tagger::BlockTagger;

/// One shared tagger per buffer.
///
/// The registry only holds weak references: a tagger lives as long as some
/// [`TaggerHandle`] does.
#[derive(Default)]
pub struct TaggerRegistry {
    taggers: Mutex<HashMap<BufferId, Weak<BlockTagger>>>,
}

impl TaggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to the tagger for `buffer`, creating it on first use.
    pub fn attach(&self, buffer: &TextBuffer) -> TaggerHandle {
        let tagger = {
            let mut taggers = self.taggers.lock();
            taggers.retain(|_, tagger| tagger.strong_count() > 0);
            match taggers.get(&buffer.id()).and_then(Weak::upgrade) {
                Some(tagger) => tagger,
                None => {
                    tracing::debug!(buffer = ?buffer.id(), "creating tagger");
                    let tagger = Arc::new(BlockTagger::new(buffer.clone()));
                    taggers.insert(buffer.id(), Arc::downgrade(&tagger));
                    tagger
                }
            }
        };
        tagger.attach();
        TaggerHandle { tagger }
    }

    /// The live tagger for `buffer`, if any handle still holds it.
    pub fn get(&self, buffer: BufferId) -> Option<Arc<BlockTagger>> {
        self.taggers.lock().get(&buffer).and_then(Weak::upgrade)
    }

    /// Number of buffers with a live tagger.
    pub fn len(&self) -> usize {
        self.taggers
            .lock()
            .values()
            .filter(|tagger| tagger.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A counted attachment to a [`BlockTagger`]. Dropping it detaches.
pub struct TaggerHandle {
    tagger: Arc<BlockTagger>,
}

impl TaggerHandle {
    pub fn tagger(&self) -> &Arc<BlockTagger> {
        &self.tagger
    }
}

impl Clone for TaggerHandle {
    fn clone(&self) -> Self {
        self.tagger.attach();
        Self {
            tagger: Arc::clone(&self.tagger),
        }
    }
}

impl Deref for TaggerHandle {
    type Target = BlockTagger;

    fn deref(&self) -> &BlockTagger {
        &self.tagger
    }
}

impl Drop for TaggerHandle {
    fn drop(&mut self) {
        self.tagger.detach();
    }
}

impl std::fmt::Debug for TaggerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TaggerHandle").field(&self.tagger).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn handles_share_one_tagger_per_buffer() {
        let registry = TaggerRegistry::new();
        let buffer = TextBuffer::new("a { }");
        let first = registry.attach(&buffer);
        let second = registry.attach(&buffer);
        assert!(Arc::ptr_eq(first.tagger(), second.tagger()));
        assert_eq!(first.ref_count(), 2);
        assert_eq!(buffer.subscriber_count(), 1);

        let other = registry.attach(&TextBuffer::new("b { }"));
        assert!(!Arc::ptr_eq(first.tagger(), other.tagger()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn dropping_the_last_handle_releases_the_tagger() {
        let registry = TaggerRegistry::new();
        let buffer = TextBuffer::new("a { }");
        let handle = registry.attach(&buffer);
        let copy = handle.clone();
        assert_eq!(handle.ref_count(), 2);

        drop(handle);
        assert_eq!(copy.ref_count(), 1);
        assert_eq!(buffer.subscriber_count(), 1);

        drop(copy);
        assert!(registry.get(buffer.id()).is_none());
        assert!(registry.is_empty());
        assert_eq!(buffer.subscriber_count(), 0);
    }

    #[test]
    fn reattaching_after_release_starts_fresh() {
        let registry = TaggerRegistry::new();
        let buffer = TextBuffer::new("a { }");
        drop(registry.attach(&buffer));
        let handle = registry.attach(&buffer);
        assert_eq!(handle.ref_count(), 1);
        assert!(handle.wait_for_scan(std::time::Duration::from_secs(5)));
    }
}
