//! Reference counted string interning.
//!
//! A [`StringPool`] deduplicates text by content. Every live [`PooledStr`] handle
//! counts as one reference on its pool entry: cloning a handle acquires, dropping
//! (or [`StringPool::release`]) releases, and the entry is removed once the last
//! handle is gone.
//!
//! Two pools exist at runtime: one per sync cycle (owned by the sync context and
//! discarded with it) and one for the lifetime of the [`crate::ConfigCache`].

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::Weak;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

#[derive(Debug)]
struct PoolInner {
    name: &'static str,
    entries: DashMap<Arc<str>, u32>,
}

/// Content addressed, reference counted string storage.
#[derive(Clone, Debug)]
pub struct StringPool {
    inner: Arc<PoolInner>,
}

impl StringPool {
    pub fn new(name: &'static str) -> Self {
        Self::with_capacity(name, 0)
    }

    pub fn with_capacity(
        name: &'static str,
        capacity: usize,
    ) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                name,
                entries: DashMap::with_capacity(capacity),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Returns the shared storage for `text`, creating it with a count of 1 on miss.
    pub fn acquire(
        &self,
        text: &str,
    ) -> PooledStr {
        if let Some(mut count) = self.inner.entries.get_mut(text) {
            *count += 1;
            return PooledStr {
                text: count.key().clone(),
                pool: Arc::downgrade(&self.inner),
            };
        }

        let text = match self.inner.entries.entry(Arc::from(text)) {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() += 1;
                entry.key().clone()
            }
            Entry::Vacant(entry) => {
                let key = entry.key().clone();
                entry.insert(1);
                trace!("[{}] interned {:?}", self.inner.name, key);
                key
            }
        };

        PooledStr {
            text,
            pool: Arc::downgrade(&self.inner),
        }
    }

    /// Gives a handle back to the pool. Equivalent to dropping it.
    pub fn release(
        &self,
        handle: PooledStr,
    ) {
        drop(handle);
    }

    /// Current reference count of `text`, `None` when not interned.
    pub fn refcount(
        &self,
        text: &str,
    ) -> Option<u32> {
        self.inner.entries.get(text).map(|count| *count)
    }

    /// Number of distinct strings held.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

/// Handle to interned text. Compares, hashes and orders by content.
pub struct PooledStr {
    text: Arc<str>,
    pool: Weak<PoolInner>,
}

impl PooledStr {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// True when both handles point at the same pool storage.
    pub fn ptr_eq(
        &self,
        other: &PooledStr,
    ) -> bool {
        Arc::ptr_eq(&self.text, &other.text)
    }

    /// Interns the same content into `pool`, reusing `self` when it already lives there.
    pub fn rehome(
        &self,
        pool: &StringPool,
    ) -> PooledStr {
        match self.pool.upgrade() {
            Some(inner) if Arc::ptr_eq(&inner, &pool.inner) => self.clone(),
            _ => pool.acquire(&self.text),
        }
    }
}

impl Clone for PooledStr {
    fn clone(&self) -> Self {
        if let Some(inner) = self.pool.upgrade() {
            if let Some(mut count) = inner.entries.get_mut(&*self.text) {
                *count += 1;
            }
        }
        Self {
            text: self.text.clone(),
            pool: self.pool.clone(),
        }
    }
}

impl Drop for PooledStr {
    fn drop(&mut self) {
        // The pool may already be gone; the text itself stays valid through the Arc.
        if let Some(inner) = self.pool.upgrade() {
            let removed = inner.entries.remove_if_mut(&*self.text, |_, count| {
                *count = count.saturating_sub(1);
                *count == 0
            });
            if removed.is_some() {
                trace!("[{}] released {:?}", inner.name, self.text);
            }
        }
    }
}

impl Deref for PooledStr {
    type Target = str;

    fn deref(&self) -> &str {
        &self.text
    }
}

impl AsRef<str> for PooledStr {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl Borrow<str> for PooledStr {
    fn borrow(&self) -> &str {
        &self.text
    }
}

impl PartialEq for PooledStr {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.ptr_eq(other) || self.text == other.text
    }
}

impl Eq for PooledStr {}

impl PartialEq<str> for PooledStr {
    fn eq(
        &self,
        other: &str,
    ) -> bool {
        &*self.text == other
    }
}

impl PartialEq<&str> for PooledStr {
    fn eq(
        &self,
        other: &&str,
    ) -> bool {
        &*self.text == *other
    }
}

impl PartialOrd for PooledStr {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PooledStr {
    fn cmp(
        &self,
        other: &Self,
    ) -> std::cmp::Ordering {
        self.text.cmp(&other.text)
    }
}

impl Hash for PooledStr {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.text.hash(state)
    }
}

impl fmt::Debug for PooledStr {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        fmt::Debug::fmt(&*self.text, f)
    }
}

impl fmt::Display for PooledStr {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        fmt::Display::fmt(&*self.text, f)
    }
}
