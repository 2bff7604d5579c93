use super::Indexer;
use crate::core::Result;
use crate::store::{Family, is_valid_range};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use tokio::sync::RwLock;

type Postings = BTreeMap<Vec<u8>, BTreeSet<String>>;

/// Index entries held in process memory, one ordered map per
/// (family, attribute).
#[derive(Default)]
pub struct MemoryIndexer {
    entries: RwLock<HashMap<(Family, String), Postings>>,
}

impl MemoryIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct values indexed for an attribute.
    pub async fn value_count(&self, family: &Family, attribute: &str) -> usize {
        self.entries
            .read()
            .await
            .get(&(family.clone(), attribute.to_string()))
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl Indexer for MemoryIndexer {
    async fn insert(&self, family: &Family, attribute: &str, value: &[u8], row_id: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries
            .entry((family.clone(), attribute.to_string()))
            .or_default()
            .entry(value.to_vec())
            .or_default()
            .insert(row_id.to_string());
        Ok(())
    }

    async fn remove(&self, family: &Family, attribute: &str, value: &[u8], row_id: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        let key = (family.clone(), attribute.to_string());
        let Some(postings) = entries.get_mut(&key) else {
            return Ok(());
        };
        if let Some(ids) = postings.get_mut(value) {
            ids.remove(row_id);
            if ids.is_empty() {
                postings.remove(value);
            }
        }
        if postings.is_empty() {
            entries.remove(&key);
        }
        Ok(())
    }

    async fn lookup(&self, family: &Family, attribute: &str, value: &[u8]) -> Result<BTreeSet<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&(family.clone(), attribute.to_string()))
            .and_then(|postings| postings.get(value))
            .cloned()
            .unwrap_or_default())
    }

    async fn lookup_range(
        &self,
        family: &Family,
        attribute: &str,
        lower: Bound<Vec<u8>>,
        upper: Bound<Vec<u8>>,
    ) -> Result<Vec<String>> {
        if !is_valid_range(&lower, &upper) {
            return Ok(Vec::new());
        }
        let entries = self.entries.read().await;
        let Some(postings) = entries.get(&(family.clone(), attribute.to_string())) else {
            return Ok(Vec::new());
        };
        Ok(postings
            .range::<Vec<u8>, _>((lower, upper))
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect())
    }
}
