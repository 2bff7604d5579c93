pub mod column_family;
pub mod maintainer;
pub mod memory;

pub use column_family::ColumnFamilyIndexer;
pub use maintainer::IndexMaintainer;
pub use memory::MemoryIndexer;

use crate::core::Result;
use crate::store::Family;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::ops::Bound;

/// Persistence strategy for secondary-index entries.
///
/// An entry is the triple (attribute, encoded value, row id) scoped to one
/// column family. Values arrive already encoded by the columnar codec, so
/// byte order equals value order.
#[async_trait]
pub trait Indexer: Send + Sync {
    async fn insert(&self, family: &Family, attribute: &str, value: &[u8], row_id: &str) -> Result<()>;

    /// Removing an absent entry is not an error.
    async fn remove(&self, family: &Family, attribute: &str, value: &[u8], row_id: &str) -> Result<()>;

    async fn lookup(&self, family: &Family, attribute: &str, value: &[u8]) -> Result<BTreeSet<String>>;

    /// Row ids whose value lies within the bounds, ordered by value and then
    /// by row id.
    async fn lookup_range(
        &self,
        family: &Family,
        attribute: &str,
        lower: Bound<Vec<u8>>,
        upper: Bound<Vec<u8>>,
    ) -> Result<Vec<String>>;
}
