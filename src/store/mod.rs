pub mod memory;

pub use memory::MemoryStore;

use crate::client::ClientConfig;
use crate::core::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

/// Column name → raw column value.
pub type ColumnMap = BTreeMap<String, Vec<u8>>;

// BTreeMap::range panics on inverted bounds and on `(x, x)` excluded twice.
pub(crate) fn is_valid_range<T: Ord>(lower: &Bound<T>, upper: &Bound<T>) -> bool {
    match (lower, upper) {
        (Bound::Included(l), Bound::Included(u)) => l <= u,
        (Bound::Included(l) | Bound::Excluded(l), Bound::Included(u) | Bound::Excluded(u)) => l < u,
        _ => true,
    }
}

/// The store's native unit: a row key plus its columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: String,
    pub columns: ColumnMap,
}

impl Row {
    pub fn new(id: impl Into<String>, columns: ColumnMap) -> Self {
        Self {
            id: id.into(),
            columns,
        }
    }
}

/// A column family inside a keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Family {
    pub keyspace: String,
    pub name: String,
}

impl Family {
    pub fn new(keyspace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.keyspace, self.name)
    }
}

/// Which kind of backend a store talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Cassandra,
    HBase,
    InMemory,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Cassandra => write!(f, "CASSANDRA"),
            StoreKind::HBase => write!(f, "HBASE"),
            StoreKind::InMemory => write!(f, "IN_MEMORY"),
        }
    }
}

/// Row-level access to a column-family store.
///
/// Writes are per-column upserts; there is no atomicity across rows.
/// Failures reaching the backend surface as `DbError::StoreUnavailable`
/// and are never retried here.
#[async_trait]
pub trait ColumnStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    async fn connect(&self, config: &ClientConfig) -> Result<()>;

    async fn shutdown(&self) -> Result<()>;

    /// Merges `columns` into the row, creating it if needed. Columns not
    /// named in `columns` are left untouched.
    async fn put_row(&self, family: &Family, row_id: &str, columns: ColumnMap) -> Result<()>;

    async fn get_row(&self, family: &Family, row_id: &str) -> Result<Option<Row>>;

    /// Rows for the keys that exist; missing keys are absent from the map.
    async fn get_rows(&self, family: &Family, row_ids: &[String]) -> Result<BTreeMap<String, ColumnMap>>;

    /// Rows with keys inside the bounds, in key order.
    fn scan_range<'a>(
        &'a self,
        family: &'a Family,
        start: Bound<String>,
        end: Bound<String>,
    ) -> BoxStream<'a, Result<Row>>;

    async fn delete_row(&self, family: &Family, row_id: &str) -> Result<()>;

    async fn remove_columns(&self, family: &Family, row_id: &str, columns: &[String]) -> Result<()>;
}
