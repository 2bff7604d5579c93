use super::Indexer;
use crate::codec::key::decode_hex;
use crate::core::Result;
use crate::store::{ColumnMap, ColumnStore, Family};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::collections::BTreeSet;
use std::ops::Bound;
use std::sync::Arc;

const INDEX_FAMILY_SEPARATOR: &str = "__idx__";

/// Keeps index entries as rows of the store itself.
///
/// Entries for `family.attribute` live in the family
/// `<family>__idx__<attribute>`: the row key is the hex form of the encoded
/// value and each indexed row id is an empty-valued column. Hex keeps the
/// store's key order equal to value order, so range lookups become key-range
/// scans.
///
/// Removing the last row id leaves an empty index row behind, which reads as
/// an empty set. Deleting it would race with a concurrent insert of the same
/// value.
pub struct ColumnFamilyIndexer {
    store: Arc<dyn ColumnStore>,
}

impl ColumnFamilyIndexer {
    pub fn new(store: Arc<dyn ColumnStore>) -> Self {
        Self { store }
    }

    pub fn index_family(family: &Family, attribute: &str) -> Family {
        Family::new(
            family.keyspace.clone(),
            format!("{}{}{}", family.name, INDEX_FAMILY_SEPARATOR, attribute),
        )
    }

    /// Inverse of the row-key encoding, for tooling that walks index rows.
    pub fn decode_index_key(row_key: &str) -> Result<Vec<u8>> {
        decode_hex(row_key)
    }
}

fn hex_bound(bound: Bound<Vec<u8>>) -> Bound<String> {
    match bound {
        Bound::Included(value) => Bound::Included(hex::encode(value)),
        Bound::Excluded(value) => Bound::Excluded(hex::encode(value)),
        Bound::Unbounded => Bound::Unbounded,
    }
}

#[async_trait]
impl Indexer for ColumnFamilyIndexer {
    async fn insert(&self, family: &Family, attribute: &str, value: &[u8], row_id: &str) -> Result<()> {
        let mut columns = ColumnMap::new();
        columns.insert(row_id.to_string(), Vec::new());
        self.store
            .put_row(&Self::index_family(family, attribute), &hex::encode(value), columns)
            .await
    }

    async fn remove(&self, family: &Family, attribute: &str, value: &[u8], row_id: &str) -> Result<()> {
        self.store
            .remove_columns(
                &Self::index_family(family, attribute),
                &hex::encode(value),
                &[row_id.to_string()],
            )
            .await
    }

    async fn lookup(&self, family: &Family, attribute: &str, value: &[u8]) -> Result<BTreeSet<String>> {
        let row = self
            .store
            .get_row(&Self::index_family(family, attribute), &hex::encode(value))
            .await?;
        Ok(row
            .map(|row| row.columns.into_keys().collect())
            .unwrap_or_default())
    }

    async fn lookup_range(
        &self,
        family: &Family,
        attribute: &str,
        lower: Bound<Vec<u8>>,
        upper: Bound<Vec<u8>>,
    ) -> Result<Vec<String>> {
        let index_family = Self::index_family(family, attribute);
        let rows: Vec<_> = self
            .store
            .scan_range(&index_family, hex_bound(lower), hex_bound(upper))
            .try_collect()
            .await?;
        Ok(rows
            .into_iter()
            .flat_map(|row| row.columns.into_keys())
            .collect())
    }
}
