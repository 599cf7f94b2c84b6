use crate::expression::encode_postfix;
use crate::expression::parse_expression;
use crate::storage::schema::TRIGGERS_COLUMNS;
use crate::storage::schema::TRIGGERS_TABLE;
use crate::string_pool::PooledStr;
use crate::DecodeError;
use crate::EntitySync;
use crate::Filter;
use crate::Query;
use crate::Rehome;
use crate::RowError;
use crate::RowReader;
use crate::StringPool;
use crate::SyncContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub triggerid: u64,
    pub hostid: u64,
    pub description: PooledStr,
    /// Expression as configured.
    pub expression: PooledStr,
    /// Base64 of the serialized postfix form, macros expanded.
    pub expression_bin: PooledStr,
    pub priority: u8,
    pub status: u8,
}

impl Rehome for Trigger {
    fn rehome(
        &self,
        pool: &StringPool,
    ) -> Self {
        Self {
            description: self.description.rehome(pool),
            expression: self.expression.rehome(pool),
            expression_bin: self.expression_bin.rehome(pool),
            ..self.clone()
        }
    }
}

pub struct TriggerSync;

impl EntitySync for TriggerSync {
    type Record = Trigger;
    type Cached = Trigger;

    fn query(&self) -> Query {
        Query::new(TRIGGERS_TABLE, TRIGGERS_COLUMNS).with_filter(Filter::NotEq("flags", "2".into()))
    }

    fn rowid(
        &self,
        row: &RowReader<'_>,
    ) -> Result<u64, DecodeError> {
        row.id("triggerid")
    }

    fn decode(
        &self,
        row: &RowReader<'_>,
        ctx: &SyncContext,
    ) -> Result<Trigger, RowError> {
        let pool = ctx.pool();
        Ok(Trigger {
            triggerid: row.id("triggerid")?,
            hostid: row.id("hostid")?,
            description: row.text("description", pool)?,
            expression: row.text("expression", pool)?,
            expression_bin: pool.acquire(""),
            priority: row.number("priority")?,
            status: row.number("status")?,
        })
    }

    fn prepare(
        &self,
        mut trigger: Trigger,
        ctx: &SyncContext,
    ) -> Result<Trigger, RowError> {
        let expanded = ctx.expand_macros(trigger.hostid, &trigger.expression)?;
        let postfix = parse_expression(&expanded)?;
        trigger.expression_bin = ctx.pool().acquire(&encode_postfix(&postfix)?);
        Ok(trigger)
    }

    /// The raw expression is not compared: only a change in its parsed form matters.
    fn matches(
        &self,
        cached: &Trigger,
        record: &Trigger,
        _ctx: &SyncContext,
    ) -> bool {
        cached.hostid == record.hostid
            && cached.description == record.description
            && cached.expression_bin == record.expression_bin
            && cached.priority == record.priority
            && cached.status == record.status
    }
}
