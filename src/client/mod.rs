pub mod config;
pub mod outcome;

pub use config::ClientConfig;
pub use outcome::{DeleteOutcome, IndexInconsistency, NativeQuery, WriteOutcome};

use crate::codec::{self, key};
use crate::core::{DbError, Result, Value};
use crate::entity::{Entity, EnhancedEntity};
use crate::index::{ColumnFamilyIndexer, IndexMaintainer, Indexer, MemoryIndexer};
use crate::metadata::{self, AttributeMetadata, EntityMetadata};
use crate::query::{self, Access, Operand, Operator, Predicate};
use crate::store::{ColumnMap, ColumnStore, Family, MemoryStore, Row, StoreKind};
use futures::{StreamExt, TryStreamExt};
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::Bound;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Persistence façade over a column store.
///
/// Every operation runs to completion on the calling task; the client holds
/// no per-entity state and can be shared through `Arc`.
///
/// ```ignore
/// let client = Client::in_memory();
/// client.connect().await?;
///
/// let mut user = client.persist(User { id: "u1".into(), email: "a@x.com".into(), age: 30 }).await?;
/// user.set("age", 31)?;
/// client.write_data(&mut user).await?;
/// ```
pub struct Client {
    config: ClientConfig,
    store: Arc<dyn ColumnStore>,
    indexes: IndexMaintainer,
}

impl Client {
    /// A client whose index entries live in the store itself.
    pub fn new(config: ClientConfig, store: Arc<dyn ColumnStore>) -> Self {
        let indexer = Arc::new(ColumnFamilyIndexer::new(store.clone()));
        Self {
            config,
            store,
            indexes: IndexMaintainer::new(indexer),
        }
    }

    /// In-process store and index with the default configuration.
    pub fn in_memory() -> Self {
        Self::new(ClientConfig::default(), Arc::new(MemoryStore::new()))
            .with_indexer(Arc::new(MemoryIndexer::new()))
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn Indexer>) -> Self {
        self.indexes = IndexMaintainer::new(indexer);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn set_contact_nodes<I, S>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.contact_nodes = nodes.into_iter().map(Into::into).collect();
    }

    pub fn set_default_port(&mut self, port: u16) {
        self.config.port = port;
    }

    pub fn set_schema(&mut self, keyspace: &str) {
        self.config.keyspace = keyspace.to_string();
    }

    pub async fn connect(&self) -> Result<()> {
        self.config.validate()?;
        let span = info_span!("colmapper.connect", url = %self.config.to_url());
        self.store.connect(&self.config).instrument(span).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.store.shutdown().await
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    pub fn store(&self) -> Arc<dyn ColumnStore> {
        self.store.clone()
    }

    pub fn indexer(&self) -> Arc<dyn Indexer> {
        self.indexes.indexer()
    }

    /// Column family an entity type lives in under this client's keyspace.
    pub fn family_of(&self, metadata: &EntityMetadata) -> Family {
        Family::new(
            metadata.keyspace().unwrap_or(&self.config.keyspace),
            metadata.column_family(),
        )
    }

    /// Wraps a fresh entity and writes every attribute.
    pub async fn persist<E: Entity>(&self, entity: E) -> Result<EnhancedEntity<E>> {
        let mut wrapped = EnhancedEntity::wrap(entity)?;
        self.write_data(&mut wrapped).await?;
        Ok(wrapped)
    }

    /// Writes the wrapper's pending attributes and clears its dirty set.
    ///
    /// NULL attributes are written as column removals. Index failures after
    /// the row write are reported in the outcome, not as an error.
    pub async fn write_data<E: Entity>(&self, entity: &mut EnhancedEntity<E>) -> Result<WriteOutcome> {
        let metadata = entity.metadata().clone();
        let family = self.family_of(&metadata);
        let row_id = entity.row_key().to_string();
        let span = info_span!("colmapper.write", family = %family, row_id = %row_id);

        async move {
            let pending = entity.pending_writes()?;

            let mut puts = ColumnMap::new();
            let mut removals = Vec::new();
            for (attr, value) in &pending {
                if value.is_null() {
                    removals.push(attr.column.clone());
                } else {
                    puts.insert(attr.column.clone(), codec::encode(value, &attr.semantic_type)?);
                }
            }

            let indexed: Vec<&(AttributeMetadata, Value)> =
                pending.iter().filter(|(attr, _)| attr.indexed).collect();
            let previous = if indexed.is_empty() {
                None
            } else {
                self.store.get_row(&family, &row_id).await?
            };

            let columns_written = puts.len();
            self.store.put_row(&family, &row_id, puts).await?;
            if !removals.is_empty() {
                self.store.remove_columns(&family, &row_id, &removals).await?;
            }

            let mut index_warnings = Vec::new();
            for (attr, new) in indexed {
                let result = self.maintain_on_write(&family, &row_id, attr, previous.as_ref(), new).await;
                if let Err(err) = result {
                    let warning = IndexInconsistency::new(&family, &row_id, &attr.name, err.to_string());
                    warn!("{}", warning);
                    index_warnings.push(warning);
                }
            }

            entity.mark_clean();
            event!(
                Level::DEBUG,
                written = columns_written,
                removed = removals.len(),
                "row written"
            );
            Ok(WriteOutcome {
                row_id,
                columns_written,
                columns_removed: removals.len(),
                index_warnings,
            })
        }
        .instrument(span)
        .await
    }

    async fn maintain_on_write(
        &self,
        family: &Family,
        row_id: &str,
        attr: &AttributeMetadata,
        previous: Option<&Row>,
        new: &Value,
    ) -> Result<()> {
        let old = match previous.and_then(|row| row.columns.get(&attr.column)) {
            Some(bytes) => codec::decode(bytes, &attr.semantic_type)?,
            None => Value::Null,
        };
        self.indexes.on_write(family, row_id, attr, &old, new).await
    }

    /// Loads one entity by primary-key value.
    pub async fn load_data<E: Entity>(&self, id: impl Into<Value>) -> Result<EnhancedEntity<E>> {
        let metadata = metadata::resolve::<E>()?;
        let family = self.family_of(&metadata);
        let row_id = key::encode_row_key(&id.into(), &metadata.primary_key().semantic_type)?;
        let span = info_span!("colmapper.load", family = %family, row_id = %row_id);

        async move {
            match self.store.get_row(&family, &row_id).await? {
                Some(row) => EnhancedEntity::from_row(&row, metadata),
                None => Err(DbError::NotFound(family.name, row_id)),
            }
        }
        .instrument(span)
        .await
    }

    /// Loads several entities by primary-key value.
    ///
    /// Keys without a stored row are left out. The result follows the input
    /// order and holds each key once.
    pub async fn load_many<E, K, I>(&self, keys: I) -> Result<Vec<EnhancedEntity<E>>>
    where
        E: Entity,
        K: Into<Value>,
        I: IntoIterator<Item = K>,
    {
        let metadata = metadata::resolve::<E>()?;
        let pk_type = &metadata.primary_key().semantic_type;
        let row_ids = keys
            .into_iter()
            .map(|k| key::encode_row_key(&k.into(), pk_type))
            .collect::<Result<Vec<_>>>()?;
        self.load_row_keys(&row_ids).await
    }

    pub(crate) async fn load_row_keys<E: Entity>(&self, row_ids: &[String]) -> Result<Vec<EnhancedEntity<E>>> {
        let metadata = metadata::resolve::<E>()?;
        let family = self.family_of(&metadata);
        let span = info_span!("colmapper.load_many", family = %family, requested = row_ids.len());

        async move {
            let mut seen = HashSet::new();
            let unique: Vec<String> = row_ids
                .iter()
                .filter(|id| seen.insert(id.as_str()))
                .cloned()
                .collect();

            let mut rows = self.store.get_rows(&family, &unique).await?;
            let mut entities = Vec::with_capacity(rows.len());
            for id in unique {
                match rows.remove(&id) {
                    Some(columns) => {
                        let row = Row::new(id, columns);
                        entities.push(EnhancedEntity::from_row(&row, metadata.clone())?);
                    }
                    None => debug!("no row '{}' in {}; omitted from batch", id, family),
                }
            }
            event!(Level::DEBUG, found = entities.len(), "batch loaded");
            Ok(entities)
        }
        .instrument(span)
        .await
    }

    /// Runs a predicate sequence and returns matches in candidate order.
    pub async fn find<E: Entity>(&self, predicates: &[Predicate]) -> Result<Vec<EnhancedEntity<E>>> {
        let metadata = metadata::resolve::<E>()?;
        let family = self.family_of(&metadata);
        let plan = query::translate(predicates, &metadata)?;
        let span = info_span!(
            "colmapper.find",
            family = %family,
            index = plan.use_index.as_deref().unwrap_or("-")
        );

        async move {
            let (candidates, recheck): (Vec<Row>, Option<Predicate>) = match plan.access {
                Access::Key(row_id) => {
                    let rows = self.store.get_row(&family, &row_id).await?.into_iter().collect();
                    (rows, None)
                }
                Access::KeyRange { start, end } => {
                    let rows = self.store.scan_range(&family, start, end).try_collect().await?;
                    (rows, None)
                }
                Access::Index { attribute, predicate } => {
                    let rows = self.index_candidates(&family, &metadata, &attribute, &predicate).await?;
                    (rows, Some(predicate))
                }
            };

            let mut matched = Vec::new();
            for row in candidates {
                let entity = EnhancedEntity::<E>::from_row(&row, metadata.clone())?;
                // Stale index entries can surface rows that no longer match.
                if let Some(predicate) = &recheck {
                    if !matches_predicate(&entity, predicate)? {
                        continue;
                    }
                }
                if all_match(&entity, &plan.residual)? {
                    matched.push(entity);
                }
            }
            event!(Level::DEBUG, matched = matched.len(), "query answered");
            Ok(matched)
        }
        .instrument(span)
        .await
    }

    async fn index_candidates(
        &self,
        family: &Family,
        metadata: &EntityMetadata,
        attribute: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Row>> {
        let attr = metadata
            .attribute(attribute)
            .ok_or_else(|| DbError::UnsupportedQuery(format!("no attribute '{}'", attribute)))?;

        let ids: Vec<String> = match (predicate.operator, &predicate.operand) {
            (Operator::Eq, Operand::Value(value)) => {
                self.indexes.lookup(family, attr, value).await?.into_iter().collect()
            }
            _ => {
                let (lower, upper) = predicate.bounds()?;
                let mut seen = HashSet::new();
                self.indexes
                    .lookup_range(family, attr, &lower, &upper)
                    .await?
                    .into_iter()
                    .filter(|id| seen.insert(id.clone()))
                    .collect()
            }
        };

        let mut rows = self.store.get_rows(family, &ids).await?;
        let mut candidates = Vec::with_capacity(rows.len());
        for id in ids {
            match rows.remove(&id) {
                Some(columns) => candidates.push(Row::new(id, columns)),
                None => warn!(
                    "index {}.{} points at missing row '{}'",
                    family, attribute, id
                ),
            }
        }
        Ok(candidates)
    }

    /// Equality lookup keyed by column names. A primary-key column, if
    /// present, is routed first.
    pub async fn find_by_columns<E: Entity>(
        &self,
        columns: &BTreeMap<String, Value>,
    ) -> Result<Vec<EnhancedEntity<E>>> {
        let metadata = metadata::resolve::<E>()?;
        let mut predicates = Vec::with_capacity(columns.len());
        for (column, value) in columns {
            let pk = metadata.primary_key();
            if pk.column == *column {
                predicates.insert(0, Predicate::eq(pk.name.clone(), value.clone()));
                continue;
            }
            let attr = metadata.attribute_for_column(column).ok_or_else(|| {
                DbError::UnsupportedQuery(format!(
                    "no column '{}' in '{}'",
                    column,
                    metadata.column_family()
                ))
            })?;
            predicates.push(Predicate::eq(attr.name.clone(), value.clone()));
        }
        self.find::<E>(&predicates).await
    }

    /// Runs `SELECT * FROM <family> WHERE ...` against `E`'s column family.
    pub async fn query<E: Entity>(&self, sql: &str) -> Result<Vec<EnhancedEntity<E>>> {
        let metadata = metadata::resolve::<E>()?;
        let parsed = query::parse_query(sql)?;
        if parsed.family != metadata.column_family() {
            return Err(DbError::UnsupportedQuery(format!(
                "query targets '{}' but {} maps to '{}'",
                parsed.family,
                metadata.type_name(),
                metadata.column_family()
            )));
        }

        let predicates: Vec<Predicate> = parsed
            .predicates
            .into_iter()
            .map(|mut p| {
                if let Some(attr) = metadata.attribute_for_column(&p.attribute) {
                    p.attribute = attr.name.clone();
                } else if metadata.primary_key().column == p.attribute {
                    p.attribute = metadata.primary_key().name.clone();
                }
                p
            })
            .collect();

        let mut found = self.find::<E>(&predicates).await?;
        if let Some(limit) = parsed.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    /// Raw row-key access for callers that already speak the store's terms.
    pub async fn execute_native<E: Entity>(&self, native: NativeQuery) -> Result<Vec<EnhancedEntity<E>>> {
        match native {
            NativeQuery::Keys(row_ids) => self.load_row_keys(&row_ids).await,
            NativeQuery::Range { start, end, limit } => {
                let metadata = metadata::resolve::<E>()?;
                let family = self.family_of(&metadata);
                let start = start.map_or(Bound::Unbounded, Bound::Included);
                let end = end.map_or(Bound::Unbounded, Bound::Excluded);
                let rows: Vec<Row> = self
                    .store
                    .scan_range(&family, start, end)
                    .take(limit.unwrap_or(usize::MAX))
                    .try_collect()
                    .await?;
                rows.iter()
                    .map(|row| EnhancedEntity::from_row(row, metadata.clone()))
                    .collect()
            }
        }
    }

    /// Row ids indexed under `value` for an indexed attribute of `E`.
    pub async fn index_lookup<E: Entity>(
        &self,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<BTreeSet<String>> {
        let metadata = metadata::resolve::<E>()?;
        let attr = metadata
            .attribute(attribute)
            .filter(|attr| attr.indexed)
            .ok_or_else(|| {
                DbError::UnsupportedQuery(format!(
                    "{}.{} is not an indexed attribute",
                    metadata.type_name(),
                    attribute
                ))
            })?;
        self.indexes
            .lookup(&self.family_of(&metadata), attr, &value.into())
            .await
    }

    /// Deletes a row by name, for callers without the entity type at hand.
    ///
    /// Deleting an absent row is a no-op.
    pub async fn delete(&self, schema: &str, column_family: &str, row_id: &str) -> Result<DeleteOutcome> {
        let metadata = metadata::by_family(schema, column_family)?.ok_or_else(|| {
            DbError::Metadata(format!(
                "no entity type is mapped to column family '{}'",
                column_family
            ))
        })?;
        let family = Family::new(schema, column_family);
        self.delete_row(&family, &metadata, row_id).await
    }

    /// Deletes the wrapped entity's row and invalidates the wrapper.
    pub async fn remove<E: Entity>(&self, entity: &mut EnhancedEntity<E>) -> Result<DeleteOutcome> {
        entity.entity()?;
        let metadata = entity.metadata().clone();
        let family = self.family_of(&metadata);
        let outcome = self.delete_row(&family, &metadata, entity.row_key()).await?;
        entity.invalidate();
        Ok(outcome)
    }

    async fn delete_row(&self, family: &Family, metadata: &EntityMetadata, row_id: &str) -> Result<DeleteOutcome> {
        let span = info_span!("colmapper.delete", family = %family, row_id = %row_id);

        async move {
            let Some(row) = self.store.get_row(family, row_id).await? else {
                event!(Level::DEBUG, "row already absent");
                return Ok(DeleteOutcome {
                    existed: false,
                    index_warnings: Vec::new(),
                });
            };

            self.store.delete_row(family, row_id).await?;

            let mut index_warnings = Vec::new();
            for attr in metadata.indexed_attributes() {
                let Some(bytes) = row.columns.get(&attr.column) else {
                    continue;
                };
                let result = match codec::decode(bytes, &attr.semantic_type) {
                    Ok(current) => self.indexes.on_delete(family, row_id, attr, &current).await,
                    Err(err) => Err(err),
                };
                if let Err(err) = result {
                    let warning = IndexInconsistency::new(family, row_id, &attr.name, err.to_string());
                    warn!("{}", warning);
                    index_warnings.push(warning);
                }
            }

            event!(Level::DEBUG, "row deleted");
            Ok(DeleteOutcome {
                existed: true,
                index_warnings,
            })
        }
        .instrument(span)
        .await
    }
}

fn attribute_value<E: Entity>(entity: &EnhancedEntity<E>, name: &str) -> Result<Value> {
    if entity.is_loaded(name) {
        entity.get(name)
    } else {
        Ok(Value::Null)
    }
}

fn matches_predicate<E: Entity>(entity: &EnhancedEntity<E>, predicate: &Predicate) -> Result<bool> {
    predicate.matches(&attribute_value(entity, &predicate.attribute)?)
}

fn all_match<E: Entity>(entity: &EnhancedEntity<E>, predicates: &[Predicate]) -> Result<bool> {
    for predicate in predicates {
        if !matches_predicate(entity, predicate)? {
            return Ok(false);
        }
    }
    Ok(true)
}
