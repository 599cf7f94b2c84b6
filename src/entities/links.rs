use crate::storage::schema::HOSTS_GROUPS_COLUMNS;
use crate::storage::schema::HOSTS_GROUPS_TABLE;
use crate::storage::schema::HOSTS_TEMPLATES_COLUMNS;
use crate::storage::schema::HOSTS_TEMPLATES_TABLE;
use crate::storage::schema::MAINTENANCES_GROUPS_COLUMNS;
use crate::storage::schema::MAINTENANCES_GROUPS_TABLE;
use crate::storage::schema::MAINTENANCES_HOSTS_COLUMNS;
use crate::storage::schema::MAINTENANCES_HOSTS_TABLE;
use crate::DecodeError;
use crate::Query;
use crate::RowReader;

/// One row of a many-to-many relation, identified by the pair itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkRecord {
    pub left: u64,
    pub right: u64,
}

impl LinkRecord {
    pub fn new(
        left: u64,
        right: u64,
    ) -> Self {
        Self { left, right }
    }
}

/// A relation table keyed by two id columns.
#[derive(Debug, Clone, Copy)]
pub struct LinkTable {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub left: &'static str,
    pub right: &'static str,
}

/// host → linked template
pub const HOST_TEMPLATES: LinkTable = LinkTable {
    table: HOSTS_TEMPLATES_TABLE,
    columns: HOSTS_TEMPLATES_COLUMNS,
    left: "hostid",
    right: "templateid",
};

/// host → host group
pub const HOST_GROUPS: LinkTable = LinkTable {
    table: HOSTS_GROUPS_TABLE,
    columns: HOSTS_GROUPS_COLUMNS,
    left: "hostid",
    right: "groupid",
};

/// maintenance → host
pub const MAINTENANCE_HOSTS: LinkTable = LinkTable {
    table: MAINTENANCES_HOSTS_TABLE,
    columns: MAINTENANCES_HOSTS_COLUMNS,
    left: "maintenanceid",
    right: "hostid",
};

/// maintenance → host group
pub const MAINTENANCE_GROUPS: LinkTable = LinkTable {
    table: MAINTENANCES_GROUPS_TABLE,
    columns: MAINTENANCES_GROUPS_COLUMNS,
    left: "maintenanceid",
    right: "groupid",
};

impl LinkTable {
    pub fn query(&self) -> Query {
        Query::new(self.table, self.columns)
    }

    pub fn decode(
        &self,
        row: &RowReader<'_>,
    ) -> Result<LinkRecord, DecodeError> {
        Ok(LinkRecord {
            left: row.id(self.left)?,
            right: row.id(self.right)?,
        })
    }
}
