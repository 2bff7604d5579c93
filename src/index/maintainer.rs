use super::Indexer;
use crate::codec;
use crate::core::{Result, Value};
use crate::metadata::AttributeMetadata;
use crate::store::Family;
use std::collections::BTreeSet;
use std::ops::Bound;
use std::sync::Arc;

/// Keeps index entries in step with primary-row mutations.
///
/// Values are typed here and encoded with the columnar codec before they
/// reach the `Indexer`. `Value::Null` stands for "attribute absent" and never
/// owns an entry.
#[derive(Clone)]
pub struct IndexMaintainer {
    indexer: Arc<dyn Indexer>,
}

impl IndexMaintainer {
    pub fn new(indexer: Arc<dyn Indexer>) -> Self {
        Self { indexer }
    }

    pub fn indexer(&self) -> Arc<dyn Indexer> {
        self.indexer.clone()
    }

    pub async fn on_write(
        &self,
        family: &Family,
        row_id: &str,
        attribute: &AttributeMetadata,
        old: &Value,
        new: &Value,
    ) -> Result<()> {
        // Compared as encoded bytes: values that are equal as `Value`s
        // (0.0 and -0.0) can still live under different index keys.
        let old = encode_present(old, attribute)?;
        let new = encode_present(new, attribute)?;
        if old == new {
            return Ok(());
        }
        if let Some(bytes) = old {
            self.indexer.remove(family, &attribute.name, &bytes, row_id).await?;
        }
        if let Some(bytes) = new {
            self.indexer.insert(family, &attribute.name, &bytes, row_id).await?;
        }
        Ok(())
    }

    pub async fn on_delete(
        &self,
        family: &Family,
        row_id: &str,
        attribute: &AttributeMetadata,
        current: &Value,
    ) -> Result<()> {
        if current.is_null() {
            return Ok(());
        }
        let bytes = codec::encode(current, &attribute.semantic_type)?;
        self.indexer.remove(family, &attribute.name, &bytes, row_id).await
    }

    pub async fn lookup(
        &self,
        family: &Family,
        attribute: &AttributeMetadata,
        value: &Value,
    ) -> Result<BTreeSet<String>> {
        let value = attribute.semantic_type.coerce(value.clone())?;
        if value.is_null() {
            return Ok(BTreeSet::new());
        }
        let bytes = codec::encode(&value, &attribute.semantic_type)?;
        self.indexer.lookup(family, &attribute.name, &bytes).await
    }

    /// Row ids in index order (value, then row id).
    pub async fn lookup_range(
        &self,
        family: &Family,
        attribute: &AttributeMetadata,
        lower: &Bound<Value>,
        upper: &Bound<Value>,
    ) -> Result<Vec<String>> {
        let lower = encode_bound(lower, attribute)?;
        let upper = encode_bound(upper, attribute)?;
        self.indexer
            .lookup_range(family, &attribute.name, lower, upper)
            .await
    }
}

fn encode_present(value: &Value, attribute: &AttributeMetadata) -> Result<Option<Vec<u8>>> {
    if value.is_null() {
        return Ok(None);
    }
    codec::encode(value, &attribute.semantic_type).map(Some)
}

fn encode_bound(bound: &Bound<Value>, attribute: &AttributeMetadata) -> Result<Bound<Vec<u8>>> {
    let encode = |value: &Value| -> Result<Option<Vec<u8>>> {
        let value = attribute.semantic_type.coerce(value.clone())?;
        if value.is_null() {
            return Ok(None);
        }
        codec::encode(&value, &attribute.semantic_type).map(Some)
    };
    Ok(match bound {
        Bound::Included(value) => encode(value)?.map_or(Bound::Unbounded, Bound::Included),
        Bound::Excluded(value) => encode(value)?.map_or(Bound::Unbounded, Bound::Excluded),
        Bound::Unbounded => Bound::Unbounded,
    })
}
