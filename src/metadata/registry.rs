use super::EntityMetadata;
use crate::core::{DbError, Result};
use crate::entity::Entity;
use lazy_static::lazy_static;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// Per-type cache cell; each `Entity` impl owns one as a `static`.
pub type MetadataSlot = OnceLock<Arc<EntityMetadata>>;

// Process-wide index of every resolved type, published copy-on-write. Typed
// lookups never touch it once their slot is filled; it serves first-time
// publication and lookups by column family name.
lazy_static! {
    static ref REGISTRY: RwLock<Arc<Registry>> = RwLock::new(Arc::new(Registry::default()));
}

#[derive(Default, Clone)]
struct Registry {
    by_type: HashMap<TypeId, Arc<EntityMetadata>>,
    by_family: HashMap<(Option<String>, String), Arc<EntityMetadata>>,
}

/// Returns the metadata for `E`, building and caching it on first use.
///
/// After the first call for a type this is a lock-free read of the type's
/// slot.
pub fn resolve<E: Entity>() -> Result<Arc<EntityMetadata>> {
    let slot = E::metadata_slot();
    if let Some(found) = slot.get() {
        return Ok(found.clone());
    }

    let metadata = Arc::new(EntityMetadata::from_descriptor(E::descriptor())?);
    let published = publish(TypeId::of::<E>(), metadata)?;
    Ok(slot.get_or_init(|| published).clone())
}

/// Looks up metadata by column family for callers that only hold names.
///
/// A type pinned to `keyspace` wins over one that follows the client's
/// configured keyspace.
pub fn by_family(keyspace: &str, column_family: &str) -> Result<Option<Arc<EntityMetadata>>> {
    let registry = snapshot()?;
    let pinned = (Some(keyspace.to_string()), column_family.to_string());
    let floating = (None, column_family.to_string());
    Ok(registry
        .by_family
        .get(&pinned)
        .or_else(|| registry.by_family.get(&floating))
        .cloned())
}

fn snapshot() -> Result<Arc<Registry>> {
    Ok(REGISTRY.read()?.clone())
}

fn publish(type_id: TypeId, metadata: Arc<EntityMetadata>) -> Result<Arc<EntityMetadata>> {
    let mut current = REGISTRY.write()?;

    // Another caller may have resolved the same type while we were building.
    if let Some(existing) = current.by_type.get(&type_id) {
        return Ok(existing.clone());
    }

    let family_key = (
        metadata.keyspace().map(str::to_string),
        metadata.column_family().to_string(),
    );
    if let Some(owner) = current.by_family.get(&family_key) {
        return Err(DbError::Metadata(format!(
            "{}: column family '{}' is already mapped by {}",
            metadata.type_name(),
            metadata.column_family(),
            owner.type_name()
        )));
    }

    let mut next = (**current).clone();
    next.by_type.insert(type_id, metadata.clone());
    next.by_family.insert(family_key, metadata.clone());
    *current = Arc::new(next);
    Ok(metadata)
}
