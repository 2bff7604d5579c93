use super::Entity;
use crate::client::Client;
use crate::codec::{self, key};
use crate::core::{DbError, Result, Value};
use crate::metadata::{self, AttributeMetadata, EntityMetadata, RelationKind};
use crate::store::Row;
use log::debug;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

enum RelationSlot {
    NotLoaded,
    Loaded(Box<dyn Any + Send + Sync>),
}

/// A live entity plus the bookkeeping one persistence operation needs.
///
/// Attribute writes go through [`EnhancedEntity::set`], which records the
/// attribute as dirty. The wrapper is not `Clone`; one instance belongs to
/// exactly one caller at a time.
pub struct EnhancedEntity<E: Entity> {
    entity: E,
    metadata: Arc<EntityMetadata>,
    id: Value,
    row_key: String,
    dirty: BTreeSet<String>,
    present: BTreeSet<String>,
    is_new: bool,
    stale: bool,
    relations: HashMap<String, RelationSlot>,
}

impl<E: Entity> EnhancedEntity<E> {
    /// Wraps an entity that is about to be written for the first time.
    /// Every attribute counts as dirty.
    pub fn wrap(entity: E) -> Result<Self> {
        Self::with_metadata(entity, metadata::resolve::<E>()?)
    }

    pub fn with_metadata(entity: E, metadata: Arc<EntityMetadata>) -> Result<Self> {
        let pk = metadata.primary_key();
        let id = entity.attribute(&pk.name).ok_or_else(|| {
            DbError::Metadata(format!(
                "{} does not expose primary key '{}'",
                metadata.type_name(),
                pk.name
            ))
        })?;
        let row_key = key::encode_row_key(&id, &pk.semantic_type)?;
        let all: BTreeSet<String> = metadata
            .attributes()
            .iter()
            .map(|attr| attr.name.clone())
            .collect();

        Ok(Self {
            relations: Self::empty_relations(&metadata),
            entity,
            metadata,
            id,
            row_key,
            dirty: all.clone(),
            present: all,
            is_new: true,
            stale: false,
        })
    }

    /// Rebuilds an entity from a stored row.
    ///
    /// Only attributes with a column in `row` are populated; the rest keep
    /// their defaults and are not marked dirty.
    pub fn from_row(row: &Row, metadata: Arc<EntityMetadata>) -> Result<Self> {
        let pk = metadata.primary_key();
        let id = key::decode_row_key(&row.id, &pk.semantic_type)?;

        let mut entity = E::default();
        entity.set_attribute(&pk.name, id.clone())?;

        let mut present = BTreeSet::new();
        for (column, bytes) in &row.columns {
            let Some(attr) = metadata.attribute_for_column(column) else {
                debug!(
                    "skipping unmapped column '{}' of {}/{}",
                    column,
                    metadata.column_family(),
                    row.id
                );
                continue;
            };
            let value = codec::decode(bytes, &attr.semantic_type)?;
            entity.set_attribute(&attr.name, value)?;
            present.insert(attr.name.clone());
        }

        Ok(Self {
            relations: Self::empty_relations(&metadata),
            entity,
            metadata,
            id,
            row_key: row.id.clone(),
            dirty: BTreeSet::new(),
            present,
            is_new: false,
            stale: false,
        })
    }

    fn empty_relations(metadata: &EntityMetadata) -> HashMap<String, RelationSlot> {
        metadata
            .relationships()
            .map(|attr| (attr.name.clone(), RelationSlot::NotLoaded))
            .collect()
    }

    pub fn id(&self) -> &Value {
        &self.id
    }

    pub fn row_key(&self) -> &str {
        &self.row_key
    }

    pub fn metadata(&self) -> &Arc<EntityMetadata> {
        &self.metadata
    }

    /// True until the first successful write.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn entity(&self) -> Result<&E> {
        self.ensure_live()?;
        Ok(&self.entity)
    }

    pub fn into_inner(self) -> Result<E> {
        self.ensure_live()?;
        Ok(self.entity)
    }

    /// Whether the attribute was loaded from the store or set since.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.metadata.is_primary_key(name) || self.present.contains(name)
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        self.ensure_live()?;
        if !self.metadata.is_primary_key(name) {
            self.mapped(name)?;
        }
        self.entity.attribute(name).ok_or_else(|| self.unknown(name))
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.ensure_live()?;
        if self.metadata.is_primary_key(name) {
            return Err(DbError::Metadata(format!(
                "primary key '{}' of {} is immutable",
                name,
                self.metadata.type_name()
            )));
        }
        let value = self.mapped(name)?.semantic_type.coerce(value.into())?;
        self.entity.set_attribute(name, value)?;

        if let Some(slot) = self.relations.get_mut(name) {
            *slot = RelationSlot::NotLoaded;
        }
        self.dirty.insert(name.to_string());
        self.present.insert(name.to_string());
        Ok(())
    }

    /// Attributes written since load or construction, with current values.
    pub fn dirty_attributes(&self) -> Result<BTreeMap<String, Value>> {
        self.ensure_live()?;
        self.dirty
            .iter()
            .map(|name| Ok((name.clone(), self.get(name)?)))
            .collect()
    }

    /// What the next write must send: the dirty set, or every present
    /// attribute when nothing is dirty.
    pub(crate) fn pending_writes(&self) -> Result<Vec<(AttributeMetadata, Value)>> {
        self.ensure_live()?;
        let names = if self.dirty.is_empty() { &self.present } else { &self.dirty };
        names
            .iter()
            .map(|name| Ok((self.mapped(name)?.clone(), self.get(name)?)))
            .collect()
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty.clear();
        self.is_new = false;
    }

    pub(crate) fn invalidate(&mut self) {
        self.stale = true;
        for slot in self.relations.values_mut() {
            *slot = RelationSlot::NotLoaded;
        }
    }

    /// Resolves a relationship attribute, fetching the related rows on first
    /// access and serving them from this wrapper's cache afterwards.
    ///
    /// Related keys with no stored row are left out.
    pub async fn related<R: Entity>(&mut self, name: &str, client: &Client) -> Result<&[R]> {
        self.ensure_live()?;
        let attr = self.mapped(name)?.clone();
        let relation = attr.relation.clone().ok_or_else(|| {
            DbError::Metadata(format!(
                "{}.{} is not a relationship",
                self.metadata.type_name(),
                name
            ))
        })?;

        let target = metadata::resolve::<R>()?;
        if target.column_family() != relation.target_family {
            return Err(DbError::Metadata(format!(
                "{}.{} refers to '{}', not {} ('{}')",
                self.metadata.type_name(),
                name,
                relation.target_family,
                target.type_name(),
                target.column_family()
            )));
        }

        if !matches!(self.relations.get(name), Some(RelationSlot::Loaded(_))) {
            let keys = match (relation.kind, self.get(name)?) {
                (_, Value::Null) => Vec::new(),
                (RelationKind::One, Value::Text(key)) if key.is_empty() => Vec::new(),
                (RelationKind::One, Value::Text(key)) => vec![key],
                (RelationKind::Many, Value::KeyList(keys)) => keys,
                (_, other) => {
                    return Err(DbError::TypeMismatch(format!(
                        "relationship '{}' holds {}",
                        name,
                        other.type_name()
                    )));
                }
            };
            let loaded = client
                .load_row_keys::<R>(&keys)
                .await?
                .into_iter()
                .map(EnhancedEntity::into_inner)
                .collect::<Result<Vec<R>>>()?;
            self.relations
                .insert(name.to_string(), RelationSlot::Loaded(Box::new(loaded)));
        }

        match self.relations.get(name) {
            Some(RelationSlot::Loaded(cached)) => cached
                .downcast_ref::<Vec<R>>()
                .map(Vec::as_slice)
                .ok_or_else(|| DbError::TypeMismatch(format!("relationship '{}' cached another type", name))),
            _ => Err(DbError::Metadata(format!("relationship '{}' failed to load", name))),
        }
    }

    /// To-one convenience over [`EnhancedEntity::related`].
    pub async fn related_one<R: Entity>(&mut self, name: &str, client: &Client) -> Result<Option<&R>> {
        Ok(self.related::<R>(name, client).await?.first())
    }

    pub fn is_relation_loaded(&self, name: &str) -> bool {
        matches!(self.relations.get(name), Some(RelationSlot::Loaded(_)))
    }

    fn mapped(&self, name: &str) -> Result<&AttributeMetadata> {
        self.metadata.attribute(name).ok_or_else(|| self.unknown(name))
    }

    fn unknown(&self, name: &str) -> DbError {
        DbError::Metadata(format!(
            "{} has no attribute '{}'",
            self.metadata.type_name(),
            name
        ))
    }

    fn ensure_live(&self) -> Result<()> {
        if self.stale {
            return Err(DbError::StaleEntity(format!(
                "{}/{}",
                self.metadata.column_family(),
                self.row_key
            )));
        }
        Ok(())
    }
}

impl<E: Entity + std::fmt::Debug> std::fmt::Debug for EnhancedEntity<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnhancedEntity")
            .field("entity", &self.entity)
            .field("row_key", &self.row_key)
            .field("dirty", &self.dirty)
            .field("is_new", &self.is_new)
            .field("stale", &self.stale)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ColumnMap;

    crate::column_entity! {
        struct Gadget in "enhanced_gadgets" {
            #[column(key)]
            id: String,
            #[column(index)]
            label: String,
            reading: i64,
            #[relation("enhanced_sites")]
            site: String,
        }
    }

    fn gadget() -> Gadget {
        Gadget {
            id: "p1".into(),
            label: "north".into(),
            reading: 7,
            site: "s1".into(),
        }
    }

    #[test]
    fn test_new_entity_is_fully_dirty() {
        let wrapped = EnhancedEntity::wrap(gadget()).unwrap();
        assert!(wrapped.is_new());
        assert_eq!(wrapped.row_key(), "p1");
        let dirty = wrapped.dirty_attributes().unwrap();
        assert_eq!(dirty.len(), 3);
        assert_eq!(dirty["reading"], Value::Integer(7));
    }

    #[test]
    fn test_set_tracks_only_changed_attributes() {
        let meta = metadata::resolve::<Gadget>().unwrap();
        let mut columns = ColumnMap::new();
        columns.insert("reading".into(), codec::encode(&Value::Integer(7), &crate::core::SemanticType::Integer).unwrap());
        let row = Row::new("p1", columns);

        let mut loaded = EnhancedEntity::<Gadget>::from_row(&row, meta).unwrap();
        assert!(!loaded.is_dirty());
        assert!(loaded.is_loaded("reading"));
        assert!(!loaded.is_loaded("label"));
        assert_eq!(loaded.entity().unwrap().id, "p1");
        assert_eq!(loaded.entity().unwrap().label, "");

        loaded.set("reading", 8i64).unwrap();
        let dirty = loaded.dirty_attributes().unwrap();
        assert_eq!(dirty.keys().collect::<Vec<_>>(), vec!["reading"]);
    }

    #[test]
    fn test_pending_writes_fall_back_to_present_attributes() {
        let meta = metadata::resolve::<Gadget>().unwrap();
        let mut columns = ColumnMap::new();
        columns.insert("label".into(), b"south".to_vec());
        let loaded = EnhancedEntity::<Gadget>::from_row(&Row::new("p2", columns), meta).unwrap();

        let pending = loaded.pending_writes().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0.name, "label");
        assert_eq!(pending[0].1, Value::from("south"));
    }

    #[test]
    fn test_primary_key_is_immutable() {
        let mut wrapped = EnhancedEntity::wrap(gadget()).unwrap();
        assert!(matches!(wrapped.set("id", "p9"), Err(DbError::Metadata(_))));
        assert!(matches!(wrapped.set("nope", 1i64), Err(DbError::Metadata(_))));
        assert!(matches!(
            wrapped.set("reading", "high"),
            Err(DbError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_stale_wrapper_rejects_access() {
        let mut wrapped = EnhancedEntity::wrap(gadget()).unwrap();
        wrapped.invalidate();
        assert!(matches!(wrapped.get("label"), Err(DbError::StaleEntity(_))));
        assert!(matches!(wrapped.set("label", "x"), Err(DbError::StaleEntity(_))));
        assert!(matches!(wrapped.entity(), Err(DbError::StaleEntity(_))));
    }

    #[test]
    fn test_empty_primary_key_rejected() {
        let mut blank = gadget();
        blank.id.clear();
        assert!(matches!(
            EnhancedEntity::wrap(blank),
            Err(DbError::Metadata(_))
        ));
    }
}
