//! Reference-counted resource pool keyed by generational handles.

use slotmap::{Key, SlotMap};

struct Entry<T> {
    value: T,
    refs: u32,
}

/// A pool of shared resources.
///
/// Entries start unreferenced. Nodes [`acquire`](Self::acquire) the entries
/// they point at and [`release`](Self::release) them when disposed; the last
/// release frees the entry. Entries that were inserted but never acquired are
/// dropped by [`purge_unreferenced`](Self::purge_unreferenced).
pub struct RefPool<K: Key, T> {
    entries: SlotMap<K, Entry<T>>,
}

impl<K: Key, T> Default for RefPool<K, T> {
    fn default() -> Self {
        Self {
            entries: SlotMap::with_key(),
        }
    }
}

impl<K: Key, T> RefPool<K, T> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value with no references.
    pub fn insert(&mut self, value: T) -> K {
        self.entries.insert(Entry { value, refs: 0 })
    }

    /// Borrow a live entry.
    pub fn get(&self, key: K) -> Option<&T> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// Whether the handle still points at a live entry.
    pub fn contains(&self, key: K) -> bool {
        self.entries.contains_key(key)
    }

    /// Current reference count, or `None` for a stale handle.
    pub fn ref_count(&self, key: K) -> Option<u32> {
        self.entries.get(key).map(|e| e.refs)
    }

    /// Add a reference. Returns `false` for a stale handle.
    pub fn acquire(&mut self, key: K) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drop a reference, freeing the entry when none remain.
    ///
    /// Returns `true` if the entry was freed.
    pub fn release(&mut self, key: K) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs == 0 {
            self.entries.remove(key);
            true
        } else {
            false
        }
    }

    /// Free every entry nothing references. Returns how many were freed.
    pub fn purge_unreferenced(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.refs > 0);
        before - self.entries.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::GeometryHandle;

    #[test]
    fn test_last_release_frees_entry() {
        let mut pool: RefPool<GeometryHandle, &str> = RefPool::new();
        let key = pool.insert("cube");
        assert!(pool.acquire(key));
        assert!(pool.acquire(key));

        assert!(!pool.release(key));
        assert_eq!(pool.ref_count(key), Some(1));
        assert!(pool.release(key));
        assert!(!pool.contains(key));
    }

    #[test]
    fn test_stale_handle_is_rejected() {
        let mut pool: RefPool<GeometryHandle, u32> = RefPool::new();
        let key = pool.insert(7);
        pool.acquire(key);
        pool.release(key);

        let reused = pool.insert(8);
        assert_ne!(key, reused);
        assert!(pool.get(key).is_none());
        assert!(!pool.acquire(key));
        assert_eq!(pool.get(reused), Some(&8));
    }

    #[test]
    fn test_purge_drops_only_unreferenced() {
        let mut pool: RefPool<GeometryHandle, u32> = RefPool::new();
        let used = pool.insert(1);
        let _unused = pool.insert(2);
        pool.acquire(used);

        assert_eq!(pool.purge_unreferenced(), 1);
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(used));
    }
}
