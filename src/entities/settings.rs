use crate::storage::schema::CONFIG_COLUMNS;
use crate::storage::schema::CONFIG_TABLE;
use crate::utils::time::parse_time_suffix;
use crate::DecodeError;
use crate::EntitySync;
use crate::Query;
use crate::Rehome;
use crate::RowError;
use crate::RowReader;
use crate::StringPool;
use crate::SyncContext;

const DEFAULT_HK_HISTORY: u32 = 90 * 86_400;
const DEFAULT_HK_TRENDS: u32 = 365 * 86_400;

/// Housekeeping settings from the single-row `config` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalSettings {
    pub configid: u64,
    /// When set, `hk_history` overrides every item's own history period.
    pub hk_history_global: bool,
    pub hk_history: u32,
    /// When set, `hk_trends` overrides every item's own trends period.
    pub hk_trends_global: bool,
    pub hk_trends: u32,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            configid: 0,
            hk_history_global: false,
            hk_history: DEFAULT_HK_HISTORY,
            hk_trends_global: false,
            hk_trends: DEFAULT_HK_TRENDS,
        }
    }
}

impl Rehome for GlobalSettings {
    fn rehome(
        &self,
        _pool: &StringPool,
    ) -> Self {
        *self
    }
}

pub struct SettingsSync;

impl EntitySync for SettingsSync {
    type Record = GlobalSettings;
    type Cached = GlobalSettings;

    fn query(&self) -> Query {
        Query::new(CONFIG_TABLE, CONFIG_COLUMNS)
    }

    fn rowid(
        &self,
        row: &RowReader<'_>,
    ) -> Result<u64, DecodeError> {
        row.id("configid")
    }

    fn decode(
        &self,
        row: &RowReader<'_>,
        _ctx: &SyncContext,
    ) -> Result<GlobalSettings, RowError> {
        Ok(GlobalSettings {
            configid: row.id("configid")?,
            hk_history_global: row.number::<u8>("hk_history_global")? != 0,
            hk_history: period(row, "hk_history")?,
            hk_trends_global: row.number::<u8>("hk_trends_global")? != 0,
            hk_trends: period(row, "hk_trends")?,
        })
    }

    fn matches(
        &self,
        cached: &GlobalSettings,
        record: &GlobalSettings,
        _ctx: &SyncContext,
    ) -> bool {
        cached == record
    }
}

fn period(
    row: &RowReader<'_>,
    column: &'static str,
) -> Result<u32, RowError> {
    let value = row.raw(column)?.ok_or(DecodeError::NullValue(column))?;
    parse_time_suffix(value).ok_or_else(|| RowError::InvalidValue {
        column,
        value: value.to_string(),
    })
}
