use parking_lot::RwLock;
use tracing::debug;

use crate::string_pool::StringPool;
use crate::CacheConfig;
use crate::ConfigStore;
use crate::MacroCacheHandle;

/// Process-wide configuration cache shared by the sync driver and readers.
///
/// Configuration maps sit behind one reader-writer lock; the macro cache is
/// published separately and read without locking.
pub struct ConfigCache {
    strings: StringPool,
    store: RwLock<ConfigStore>,
    macros: MacroCacheHandle,
}

impl ConfigCache {
    pub fn new(config: &CacheConfig) -> Self {
        debug!("creating config cache: {:?}", config);
        let strings = StringPool::with_capacity("config-cache", config.string_pool_capacity);
        Self {
            macros: MacroCacheHandle::new(strings.clone()),
            store: RwLock::new(ConfigStore::default()),
            strings,
        }
    }

    /// Pool holding every string the caches keep.
    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    /// Provides read access to the configuration maps
    pub fn blocking_read<R>(
        &self,
        f: impl FnOnce(&ConfigStore) -> R,
    ) -> R {
        let guard = self.store.read();
        f(&guard)
    }

    /// Provides write access to the configuration maps
    pub(crate) fn blocking_write<R>(
        &self,
        f: impl FnOnce(&mut ConfigStore) -> R,
    ) -> R {
        let mut guard = self.store.write();
        f(&mut guard)
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self) -> bool {
        self.store.is_locked()
    }

    pub fn macros(&self) -> &MacroCacheHandle {
        &self.macros
    }

    /// Value of user macro `name` under `context`, seen from `hostids` (nearest first).
    pub fn resolve_macro(
        &self,
        hostids: &[u64],
        name: &str,
        context: Option<&str>,
    ) -> Option<String> {
        self.macros.resolve_macro(hostids, name, context)
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
