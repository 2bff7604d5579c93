pub mod enhanced;
mod column_value;
mod macros;

pub use enhanced::EnhancedEntity;

use crate::core::{Result, SemanticType, Value};
use crate::metadata::{EntityDescriptor, MetadataSlot};

/// An application type that maps onto rows of one column family.
///
/// Implementations expose attributes by name; the crate never reflects over
/// the struct itself. `column_entity!` generates an implementation for
/// plain structs.
pub trait Entity: Default + Send + Sync + 'static {
    /// Declared shape of the type. Called once per process; the validated
    /// result is cached by `metadata::resolve`.
    fn descriptor() -> EntityDescriptor;

    /// Per-type cell holding the resolved metadata. Implementations return
    /// a `static` declared in the impl; `column_entity!` does this.
    fn metadata_slot() -> &'static MetadataSlot;

    /// Current value of an attribute, `None` if the type has no such attribute.
    fn attribute(&self, name: &str) -> Option<Value>;

    fn set_attribute(&mut self, name: &str, value: Value) -> Result<()>;
}

/// Field types that can back an entity attribute.
pub trait ColumnValue: Sized {
    fn semantic_type() -> SemanticType;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self>;
}
