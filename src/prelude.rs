//! Entrypoints grouped by abstraction level.
//!
//! Application code usually needs only the top-level re-exports;
//! `advanced` names the seams for plugging in another store or index.

pub use crate::{
    Client, ClientConfig, DbError, EnhancedEntity, Entity, Predicate, Result, Value, column_entity,
};

pub mod advanced {
    //! Store and index seams, raw rows and routing plans.
    pub use crate::codec::{decode, encode};
    pub use crate::index::{ColumnFamilyIndexer, IndexMaintainer, Indexer, MemoryIndexer};
    pub use crate::query::{Access, QueryPlan, translate};
    pub use crate::store::{ColumnMap, ColumnStore, Family, MemoryStore, Row, StoreKind};
}
