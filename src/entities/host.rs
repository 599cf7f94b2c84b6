use crate::storage::schema::HOSTS_COLUMNS;
use crate::storage::schema::HOSTS_TABLE;
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    Monitored,
    NotMonitored,
}

impl HostStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(HostStatus::Monitored),
            1 => Some(HostStatus::NotMonitored),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub hostid: u64,
    /// 0 when monitored by the server directly.
    pub proxy_hostid: u64,
    pub host: PooledStr,
    pub name: PooledStr,
    pub status: HostStatus,
}

impl Rehome for Host {
    fn rehome(
        &self,
        pool: &StringPool,
    ) -> Self {
        Self {
            host: self.host.rehome(pool),
            name: self.name.rehome(pool),
            ..self.clone()
        }
    }
}

/// Monitored and unmonitored hosts; templates and host prototypes are not cached here.
pub struct HostSync;

impl EntitySync for HostSync {
    type Record = Host;
    type Cached = Host;

    fn query(&self) -> Query {
        Query::new(HOSTS_TABLE, HOSTS_COLUMNS).with_filter(Filter::And(vec![
            Filter::In("status", vec!["0".into(), "1".into()]),
            Filter::NotEq("flags", "2".into()),
        ]))
    }

    fn rowid(
        &self,
        row: &RowReader<'_>,
    ) -> Result<u64, DecodeError> {
        row.id("hostid")
    }

    fn decode(
        &self,
        row: &RowReader<'_>,
        ctx: &SyncContext,
    ) -> Result<Host, RowError> {
        let code = row.number::<u8>("status")?;
        let status = HostStatus::from_code(code).ok_or_else(|| RowError::InvalidValue {
            column: "status",
            value: code.to_string(),
        })?;

        Ok(Host {
            hostid: row.id("hostid")?,
            proxy_hostid: row.opt_id("proxy_hostid")?,
            host: row.text("host", ctx.pool())?,
            name: row.text("name", ctx.pool())?,
            status,
        })
    }

    fn matches(
        &self,
        cached: &Host,
        record: &Host,
        ctx: &SyncContext,
    ) -> bool {
        let relocated = cached.proxy_hostid != record.proxy_hostid || cached.status != record.status;
        if relocated {
            ctx.mark_items_refresh(record.hostid);
        }

        !relocated && cached.host == record.host && cached.name == record.name
    }
}
