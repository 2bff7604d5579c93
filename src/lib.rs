// ============================================================================
// colmapper: entity persistence over column-family stores
// ============================================================================

pub mod client;
pub mod codec;
pub mod core;
pub mod entity;
pub mod index;
pub mod metadata;
pub mod prelude;
pub mod query;
pub mod store;

// Re-export main types for convenience
pub use client::{Client, ClientConfig, DeleteOutcome, IndexInconsistency, NativeQuery, WriteOutcome};
pub use core::{DbError, Result, SemanticType, Value};
pub use entity::{ColumnValue, EnhancedEntity, Entity};
pub use metadata::{AttributeDescriptor, EntityDescriptor, EntityMetadata, RelationKind};
pub use query::{Operator, Predicate};
pub use store::{ColumnStore, Family, MemoryStore, Row, StoreKind};
