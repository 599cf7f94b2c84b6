use std::cmp::Ordering;
use std::sync::Arc;

use regex::Regex;
use tracing::warn;

use crate::string_pool::PooledStr;
use crate::string_pool::StringPool;
use crate::MacroRecord;

/// Owner id used for global macros.
pub const GLOBAL_HOSTID: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ContextOp {
    #[default]
    Equal,
    Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MacroValueType {
    #[default]
    Text,
    Secret,
    Vault,
}

impl MacroValueType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(MacroValueType::Text),
            1 => Some(MacroValueType::Secret),
            2 => Some(MacroValueType::Vault),
            _ => None,
        }
    }
}

/// Global and host macros come from different tables with independent id spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MacroSource {
    Global,
    Host,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacroKey {
    pub source: MacroSource,
    pub macroid: u64,
}

impl MacroKey {
    pub fn global(macroid: u64) -> Self {
        Self {
            source: MacroSource::Global,
            macroid,
        }
    }

    pub fn host(macroid: u64) -> Self {
        Self {
            source: MacroSource::Host,
            macroid,
        }
    }
}

/// One macro definition as held by the caches. Text lives in the shared pool.
#[derive(Debug, Clone)]
pub struct UserMacro {
    pub key: MacroKey,
    pub hostid: u64,
    pub name: PooledStr,
    pub context: Option<PooledStr>,
    pub op: ContextOp,
    pub value: PooledStr,
    pub value_type: MacroValueType,
    context_regex: Option<Regex>,
}

impl UserMacro {
    pub fn from_record(
        key: MacroKey,
        record: &MacroRecord,
        pool: &StringPool,
    ) -> Self {
        let context_regex = match (&record.context, record.op) {
            (Some(pattern), ContextOp::Regex) => match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!(
                        "macro {:?} has invalid regex context {:?}: {}; it will never match",
                        key, pattern, e
                    );
                    None
                }
            },
            _ => None,
        };

        Self {
            key,
            hostid: record.hostid,
            name: record.name.rehome(pool),
            context: record.context.as_ref().map(|c| c.rehome(pool)),
            op: record.op,
            value: record.value.rehome(pool),
            value_type: record.value_type,
            context_regex,
        }
    }

    /// Whether this definition answers a lookup with `context`.
    ///
    /// A context-less definition only matches a context-less lookup; it still
    /// serves as the default for any context (see the caches' resolve).
    pub fn matches_context(
        &self,
        context: Option<&str>,
    ) -> bool {
        match (&self.context, context) {
            (None, None) => true,
            (Some(own), Some(wanted)) => match self.op {
                ContextOp::Equal => own.as_str() == wanted,
                ContextOp::Regex => self.context_regex.as_ref().is_some_and(|re| re.is_match(wanted)),
            },
            _ => false,
        }
    }

    pub fn is_default(&self) -> bool {
        self.context.is_none()
    }

    /// Sort order inside a host's macro list.
    pub fn order(
        &self,
        other: &UserMacro,
    ) -> Ordering {
        compare_name_context(
            &self.name,
            self.context.as_deref(),
            &other.name,
            other.context.as_deref(),
        )
    }
}

/// Orders by name, then context with the context-less definition first.
pub(crate) fn compare_name_context(
    name: &str,
    context: Option<&str>,
    other_name: &str,
    other_context: Option<&str>,
) -> Ordering {
    name.cmp(other_name).then_with(|| context.cmp(&other_context))
}

/// First of `variants` answering `context`, and the context-less default.
///
/// `variants` all share one name and are sorted with the default first.
pub(crate) fn pick_variant<'a>(
    variants: &'a [Arc<UserMacro>],
    context: Option<&str>,
) -> (Option<&'a UserMacro>, Option<&'a UserMacro>) {
    let default = variants.first().filter(|m| m.is_default()).map(Arc::as_ref);
    let matched = variants.iter().find(|m| m.matches_context(context)).map(Arc::as_ref);
    (matched, default)
}
