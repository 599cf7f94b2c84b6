use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use crate::macros::macro_name;
use crate::macros::parse_user_macro;
use crate::metrics::MACRO_CACHE_REVISION;
use crate::string_pool::StringPool;
use crate::Changeset;
use crate::LinkRecord;
use crate::MacroCache;
use crate::MacroRecord;
use crate::MacroSyncStats;
use crate::MacroSyntaxError;
use crate::SyncError;

/// Publishes [`MacroCache`] snapshots to readers.
///
/// Readers never lock: they load the current `Arc` and keep it for as long as
/// they need a consistent view. Only the sync driver calls [`Self::sync`].
pub struct MacroCacheHandle {
    current: ArcSwap<MacroCache>,
    strings: StringPool,
}

impl MacroCacheHandle {
    /// Empty cache interning macro text into `strings`.
    pub fn new(strings: StringPool) -> Self {
        Self {
            current: ArcSwap::from_pointee(MacroCache::default()),
            strings,
        }
    }

    pub fn snapshot(&self) -> Arc<MacroCache> {
        self.current.load_full()
    }

    pub fn revision(&self) -> u64 {
        self.current.load().revision()
    }

    /// Applies the changesets and publishes the result when it differs.
    pub fn sync(
        &self,
        global: Changeset<'_, MacroRecord>,
        host: Changeset<'_, MacroRecord>,
        templates: Changeset<'_, LinkRecord>,
    ) -> Result<(Arc<MacroCache>, MacroSyncStats), SyncError> {
        let current = self.snapshot();
        let before = current.revision();

        let (next, stats) = current.sync_with_stats(&self.strings, global, host, templates)?;
        if next.revision() != before {
            info!(
                "macro cache revision {} -> {} ({} hosts, {} macros)",
                before,
                next.revision(),
                next.host_count(),
                next.macro_count()
            );
            MACRO_CACHE_REVISION.set(next.revision() as i64);
            self.current.store(next.clone());
        }
        Ok((next, stats))
    }

    /// Value of `name` (`NAME` or `{$NAME}`) under `context`, seen from `hostids`.
    pub fn resolve_macro(
        &self,
        hostids: &[u64],
        name: &str,
        context: Option<&str>,
    ) -> Option<String> {
        self.current
            .load()
            .resolve(hostids, macro_name(name), context)
            .map(|m| m.value.to_string())
    }

    /// Resolves a full `{$NAME:context}` token.
    pub fn resolve_token(
        &self,
        hostids: &[u64],
        token: &str,
    ) -> Result<Option<String>, MacroSyntaxError> {
        let token = parse_user_macro(token)?;
        Ok(self.resolve_macro(hostids, &token.name, token.context.as_deref()))
    }
}
