use super::{ColumnMap, ColumnStore, Family, Row, StoreKind, is_valid_range};
use crate::client::ClientConfig;
use crate::core::{DbError, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

const PAGE_SIZE: usize = 64;

/// In-process column store.
///
/// Families are created on first write. Range scans are served page by page,
/// each page under its own short read lock, so a long scan never blocks
/// writers for its whole duration.
pub struct MemoryStore {
    families: RwLock<HashMap<Family, BTreeMap<String, ColumnMap>>>,
    connected: AtomicBool,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            families: RwLock::new(HashMap::new()),
            connected: AtomicBool::new(false),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates the backend going away (`false`) or coming back (`true`).
    /// While unavailable every operation fails with `StoreUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of rows currently held in a family.
    pub async fn row_count(&self, family: &Family) -> usize {
        self.families
            .read()
            .await
            .get(family)
            .map_or(0, BTreeMap::len)
    }

    fn ensure_ready(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(DbError::StoreUnavailable("store is not connected".into()));
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(DbError::StoreUnavailable("store is unreachable".into()));
        }
        Ok(())
    }

    async fn page(&self, family: &Family, lower: Bound<String>, upper: &Bound<String>) -> Result<Vec<Row>> {
        self.ensure_ready()?;
        if !is_valid_range(&lower, upper) {
            return Ok(Vec::new());
        }
        let families = self.families.read().await;
        let Some(rows) = families.get(family) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .range::<String, _>((lower, upper.clone()))
            .take(PAGE_SIZE)
            .map(|(id, columns)| Row::new(id.clone(), columns.clone()))
            .collect())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ColumnStore for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::InMemory
    }

    async fn connect(&self, config: &ClientConfig) -> Result<()> {
        debug!("in-memory store attached for keyspace '{}'", config.keyspace);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn put_row(&self, family: &Family, row_id: &str, columns: ColumnMap) -> Result<()> {
        self.ensure_ready()?;
        let mut families = self.families.write().await;
        families
            .entry(family.clone())
            .or_default()
            .entry(row_id.to_string())
            .or_default()
            .extend(columns);
        Ok(())
    }

    async fn get_row(&self, family: &Family, row_id: &str) -> Result<Option<Row>> {
        self.ensure_ready()?;
        let families = self.families.read().await;
        Ok(families
            .get(family)
            .and_then(|rows| rows.get(row_id))
            .map(|columns| Row::new(row_id, columns.clone())))
    }

    async fn get_rows(&self, family: &Family, row_ids: &[String]) -> Result<BTreeMap<String, ColumnMap>> {
        self.ensure_ready()?;
        let families = self.families.read().await;
        let Some(rows) = families.get(family) else {
            return Ok(BTreeMap::new());
        };
        Ok(row_ids
            .iter()
            .filter_map(|id| rows.get(id).map(|columns| (id.clone(), columns.clone())))
            .collect())
    }

    fn scan_range<'a>(
        &'a self,
        family: &'a Family,
        start: Bound<String>,
        end: Bound<String>,
    ) -> BoxStream<'a, Result<Row>> {
        stream::unfold(Some(start), move |cursor| {
            let end = end.clone();
            async move {
                let lower = cursor?;
                let page = match self.page(family, lower, &end).await {
                    Ok(page) => page,
                    Err(err) => return Some((vec![Err(err)], None)),
                };
                if page.is_empty() {
                    return None;
                }
                let next = if page.len() < PAGE_SIZE {
                    None
                } else {
                    page.last().map(|row| Bound::Excluded(row.id.clone()))
                };
                Some((page.into_iter().map(Ok).collect::<Vec<_>>(), next))
            }
        })
        .flat_map(stream::iter)
        .boxed()
    }

    async fn delete_row(&self, family: &Family, row_id: &str) -> Result<()> {
        self.ensure_ready()?;
        let mut families = self.families.write().await;
        if let Some(rows) = families.get_mut(family) {
            rows.remove(row_id);
        }
        Ok(())
    }

    async fn remove_columns(&self, family: &Family, row_id: &str, columns: &[String]) -> Result<()> {
        self.ensure_ready()?;
        let mut families = self.families.write().await;
        if let Some(row) = families.get_mut(family).and_then(|rows| rows.get_mut(row_id)) {
            for column in columns {
                row.remove(column);
            }
        }
        Ok(())
    }
}
