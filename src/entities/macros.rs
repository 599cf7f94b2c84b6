use std::sync::Arc;

use crate::macros::parse_user_macro;
use crate::storage::schema::GLOBAL_MACRO_COLUMNS;
use crate::storage::schema::GLOBAL_MACRO_TABLE;
use crate::storage::schema::HOST_MACRO_COLUMNS;
use crate::storage::schema::HOST_MACRO_TABLE;
use crate::string_pool::PooledStr;
use crate::ContextOp;
use crate::DecodeError;
use crate::EntitySync;
use crate::MacroValueType;
use crate::Query;
use crate::RowError;
use crate::RowReader;
use crate::SyncContext;
use crate::UserMacro;
use crate::GLOBAL_HOSTID;

/// A `globalmacro` or `hostmacro` row with its `macro` column split into name and context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroRecord {
    pub macroid: u64,
    pub hostid: u64,
    pub name: PooledStr,
    pub context: Option<PooledStr>,
    pub op: ContextOp,
    pub value: PooledStr,
    pub value_type: MacroValueType,
}

pub struct GlobalMacroSync;

pub struct HostMacroSync;

impl EntitySync for GlobalMacroSync {
    type Record = MacroRecord;
    type Cached = Arc<UserMacro>;

    fn query(&self) -> Query {
        Query::new(GLOBAL_MACRO_TABLE, GLOBAL_MACRO_COLUMNS)
    }

    fn rowid(
        &self,
        row: &RowReader<'_>,
    ) -> Result<u64, DecodeError> {
        row.id("globalmacroid")
    }

    fn decode(
        &self,
        row: &RowReader<'_>,
        ctx: &SyncContext,
    ) -> Result<MacroRecord, RowError> {
        decode_macro(row, row.id("globalmacroid")?, GLOBAL_HOSTID, ctx)
    }

    fn matches(
        &self,
        cached: &Arc<UserMacro>,
        record: &MacroRecord,
        _ctx: &SyncContext,
    ) -> bool {
        same_definition(cached, record)
    }
}

impl EntitySync for HostMacroSync {
    type Record = MacroRecord;
    type Cached = Arc<UserMacro>;

    fn query(&self) -> Query {
        Query::new(HOST_MACRO_TABLE, HOST_MACRO_COLUMNS)
    }

    fn rowid(
        &self,
        row: &RowReader<'_>,
    ) -> Result<u64, DecodeError> {
        row.id("hostmacroid")
    }

    fn decode(
        &self,
        row: &RowReader<'_>,
        ctx: &SyncContext,
    ) -> Result<MacroRecord, RowError> {
        decode_macro(row, row.id("hostmacroid")?, row.id("hostid")?, ctx)
    }

    fn matches(
        &self,
        cached: &Arc<UserMacro>,
        record: &MacroRecord,
        _ctx: &SyncContext,
    ) -> bool {
        same_definition(cached, record)
    }
}

fn decode_macro(
    row: &RowReader<'_>,
    macroid: u64,
    hostid: u64,
    ctx: &SyncContext,
) -> Result<MacroRecord, RowError> {
    let pool = ctx.pool();
    let text = row.raw("macro")?.ok_or(DecodeError::NullValue("macro"))?;
    let token = parse_user_macro(text)?;

    let code = row.number::<u8>("type")?;
    let value_type = MacroValueType::from_code(code).ok_or_else(|| RowError::InvalidValue {
        column: "type",
        value: code.to_string(),
    })?;

    Ok(MacroRecord {
        macroid,
        hostid,
        name: pool.acquire(&token.name),
        context: token.context.as_deref().map(|c| pool.acquire(c)),
        op: token.op,
        value: row.text("value", pool)?,
        value_type,
    })
}

fn same_definition(
    cached: &UserMacro,
    record: &MacroRecord,
) -> bool {
    cached.hostid == record.hostid
        && cached.name == record.name
        && cached.context == record.context
        && cached.op == record.op
        && cached.value == record.value
        && cached.value_type == record.value_type
}
