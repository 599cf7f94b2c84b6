use crate::storage::schema::ITEMS_COLUMNS;
use crate::storage::schema::ITEMS_TABLE;
use crate::string_pool::PooledStr;
use crate::utils::time::parse_time_suffix;
use crate::DecodeError;
use crate::EntitySync;
use crate::Filter;
use crate::Query;
use crate::Rehome;
use crate::RowError;
use crate::RowReader;
use crate::StringPool;
use crate::SyncContext;

/// Item definition with its update interval and retention periods resolved to seconds.
///
/// `delay`, `history` and `trends` keep the configured text (macros included);
/// the `*_sec` fields are derived in [`ItemSync::prepare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub itemid: u64,
    pub hostid: u64,
    pub key: PooledStr,
    pub item_type: u8,
    pub value_type: u8,
    pub delay: PooledStr,
    pub delay_sec: u32,
    pub history: PooledStr,
    pub history_sec: u32,
    pub trends: PooledStr,
    pub trends_sec: u32,
    pub status: u8,
}

impl Rehome for Item {
    fn rehome(
        &self,
        pool: &StringPool,
    ) -> Self {
        Self {
            key: self.key.rehome(pool),
            delay: self.delay.rehome(pool),
            history: self.history.rehome(pool),
            trends: self.trends.rehome(pool),
            ..self.clone()
        }
    }
}

/// Items of every host, discovered prototypes excluded.
pub struct ItemSync;

impl EntitySync for ItemSync {
    type Record = Item;
    type Cached = Item;

    fn query(&self) -> Query {
        Query::new(ITEMS_TABLE, ITEMS_COLUMNS).with_filter(Filter::NotEq("flags", "2".into()))
    }

    fn rowid(
        &self,
        row: &RowReader<'_>,
    ) -> Result<u64, DecodeError> {
        row.id("itemid")
    }

    fn decode(
        &self,
        row: &RowReader<'_>,
        ctx: &SyncContext,
    ) -> Result<Item, RowError> {
        let pool = ctx.pool();
        Ok(Item {
            itemid: row.id("itemid")?,
            hostid: row.id("hostid")?,
            key: row.text("key_", pool)?,
            item_type: row.number("type")?,
            value_type: row.number("value_type")?,
            delay: row.text("delay", pool)?,
            delay_sec: 0,
            history: row.text("history", pool)?,
            history_sec: 0,
            trends: row.text("trends", pool)?,
            trends_sec: 0,
            status: row.number("status")?,
        })
    }

    fn prepare(
        &self,
        mut item: Item,
        ctx: &SyncContext,
    ) -> Result<Item, RowError> {
        let settings = ctx.settings();

        // flexible and scheduling intervals follow the first ';'
        let delay = ctx.expand_macros(item.hostid, &item.delay)?;
        let update_interval = delay.split(';').next().unwrap_or_default();
        item.delay_sec = period("delay", update_interval)?;

        item.history_sec = if settings.hk_history_global {
            settings.hk_history
        } else {
            period("history", &ctx.expand_macros(item.hostid, &item.history)?)?
        };
        item.trends_sec = if settings.hk_trends_global {
            settings.hk_trends
        } else {
            period("trends", &ctx.expand_macros(item.hostid, &item.trends)?)?
        };

        Ok(item)
    }

    fn matches(
        &self,
        cached: &Item,
        record: &Item,
        ctx: &SyncContext,
    ) -> bool {
        !ctx.items_need_refresh(record.hostid) && cached == record
    }
}

fn period(
    column: &'static str,
    value: &str,
) -> Result<u32, RowError> {
    parse_time_suffix(value.trim()).ok_or_else(|| RowError::InvalidValue {
        column,
        value: value.to_string(),
    })
}
