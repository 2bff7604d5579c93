pub mod descriptor;
pub mod registry;

pub use descriptor::{AttributeDescriptor, EntityDescriptor, Relation, RelationKind};
pub use registry::{MetadataSlot, by_family, resolve};

use crate::core::{DbError, Result, SemanticType};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMetadata {
    pub name: String,
    pub column: String,
    pub semantic_type: SemanticType,
    pub indexed: bool,
    pub relation: Option<Relation>,
}

impl AttributeMetadata {
    pub fn is_relationship(&self) -> bool {
        self.relation.is_some()
    }
}

/// Validated, immutable shape of one entity type.
///
/// The primary key is the row identifier and is kept apart from the
/// column-backed `attributes`, which preserve declaration order.
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    type_name: String,
    column_family: String,
    keyspace: Option<String>,
    primary_key: AttributeMetadata,
    attributes: Vec<AttributeMetadata>,
    by_name: HashMap<String, usize>,
    by_column: HashMap<String, usize>,
}

impl EntityMetadata {
    pub fn from_descriptor(descriptor: EntityDescriptor) -> Result<Self> {
        let type_name = descriptor.type_name;
        let fail = |reason: String| DbError::Metadata(format!("{}: {}", type_name, reason));

        if descriptor.column_family.is_empty() {
            return Err(fail("column family name is empty".into()));
        }

        let mut primary_key = None;
        let mut attributes = Vec::with_capacity(descriptor.attributes.len());
        let mut by_name = HashMap::new();
        let mut by_column = HashMap::new();
        let mut seen_names = HashSet::new();
        let mut seen_columns = HashSet::new();

        for attr in descriptor.attributes {
            if let SemanticType::Unsupported(name) = &attr.semantic_type {
                return Err(DbError::UnsupportedType(format!(
                    "{}.{} declares type '{}'",
                    type_name, attr.name, name
                )));
            }
            if !seen_names.insert(attr.name.clone()) {
                return Err(fail(format!("attribute '{}' declared twice", attr.name)));
            }
            // The primary key's column name is reserved too.
            if !seen_columns.insert(attr.column.clone()) {
                return Err(fail(format!(
                    "two attributes map to column '{}'",
                    attr.column
                )));
            }

            if attr.primary_key {
                if primary_key.is_some() {
                    return Err(fail("more than one primary-key attribute".into()));
                }
                if !attr.semantic_type.is_keyable() {
                    return Err(fail(format!(
                        "primary key '{}' has non-keyable type {}",
                        attr.name, attr.semantic_type
                    )));
                }
                if attr.relation.is_some() {
                    return Err(fail(format!(
                        "primary key '{}' cannot be a relationship",
                        attr.name
                    )));
                }
                primary_key = Some(AttributeMetadata {
                    name: attr.name,
                    column: attr.column,
                    semantic_type: attr.semantic_type,
                    indexed: false,
                    relation: None,
                });
                continue;
            }

            if let Some(relation) = &attr.relation {
                let expected = match relation.kind {
                    RelationKind::One => SemanticType::Text,
                    RelationKind::Many => SemanticType::KeyList,
                };
                if attr.semantic_type != expected {
                    return Err(fail(format!(
                        "relationship '{}' must be {}, declared {}",
                        attr.name, expected, attr.semantic_type
                    )));
                }
            }

            by_column.insert(attr.column.clone(), attributes.len());
            by_name.insert(attr.name.clone(), attributes.len());
            attributes.push(AttributeMetadata {
                name: attr.name,
                column: attr.column,
                semantic_type: attr.semantic_type,
                indexed: attr.indexed,
                relation: attr.relation,
            });
        }

        let primary_key = primary_key.ok_or_else(|| fail("no primary-key attribute".into()))?;

        Ok(Self {
            type_name,
            column_family: descriptor.column_family,
            keyspace: descriptor.keyspace,
            primary_key,
            attributes,
            by_name,
            by_column,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn column_family(&self) -> &str {
        &self.column_family
    }

    pub fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref()
    }

    pub fn primary_key(&self) -> &AttributeMetadata {
        &self.primary_key
    }

    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key.name == name
    }

    /// Column-backed attributes in declaration order (primary key excluded).
    pub fn attributes(&self) -> &[AttributeMetadata] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeMetadata> {
        self.by_name.get(name).map(|idx| &self.attributes[*idx])
    }

    pub fn attribute_for_column(&self, column: &str) -> Option<&AttributeMetadata> {
        self.by_column.get(column).map(|idx| &self.attributes[*idx])
    }

    pub fn indexed_attributes(&self) -> impl Iterator<Item = &AttributeMetadata> {
        self.attributes.iter().filter(|attr| attr.indexed)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &AttributeMetadata> {
        self.attributes.iter().filter(|attr| attr.is_relationship())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> EntityDescriptor {
        EntityDescriptor::new("User", "users")
            .attribute(AttributeDescriptor::new("id", SemanticType::Text).primary_key())
            .attribute(AttributeDescriptor::new("email", SemanticType::Text).indexed())
            .attribute(AttributeDescriptor::new("age", SemanticType::Integer))
    }

    #[test]
    fn test_resolves_valid_descriptor() {
        let meta = EntityMetadata::from_descriptor(user()).unwrap();
        assert_eq!(meta.column_family(), "users");
        assert_eq!(meta.primary_key().name, "id");
        assert_eq!(meta.attributes().len(), 2);
        assert!(meta.attribute("email").unwrap().indexed);
        assert_eq!(meta.attribute_for_column("age").unwrap().name, "age");
        assert!(meta.attribute("id").is_none());
    }

    #[test]
    fn test_missing_primary_key() {
        let desc = EntityDescriptor::new("Bad", "bad")
            .attribute(AttributeDescriptor::new("name", SemanticType::Text));
        assert!(matches!(
            EntityMetadata::from_descriptor(desc),
            Err(DbError::Metadata(_))
        ));
    }

    #[test]
    fn test_two_primary_keys() {
        let desc = user().attribute(AttributeDescriptor::new("other", SemanticType::Text).primary_key());
        assert!(matches!(
            EntityMetadata::from_descriptor(desc),
            Err(DbError::Metadata(_))
        ));
    }

    #[test]
    fn test_duplicate_column_names() {
        let desc = user().attribute(AttributeDescriptor::new("mail", SemanticType::Text).column("email"));
        let err = EntityMetadata::from_descriptor(desc).unwrap_err();
        assert!(err.to_string().contains("column 'email'"));
    }

    #[test]
    fn test_attribute_cannot_reuse_primary_key_column() {
        let desc = user().attribute(AttributeDescriptor::new("alias", SemanticType::Text).column("id"));
        let err = EntityMetadata::from_descriptor(desc).unwrap_err();
        assert!(matches!(err, DbError::Metadata(_)));
        assert!(err.to_string().contains("column 'id'"));

        // Same clash with the primary key declared last.
        let desc = EntityDescriptor::new("Late", "late")
            .attribute(AttributeDescriptor::new("alias", SemanticType::Text).column("id"))
            .attribute(AttributeDescriptor::new("id", SemanticType::Text).primary_key());
        assert!(matches!(
            EntityMetadata::from_descriptor(desc),
            Err(DbError::Metadata(_))
        ));
    }

    #[test]
    fn test_unsupported_type_fails_at_resolution() {
        let desc = user().attribute(AttributeDescriptor::new(
            "tags",
            SemanticType::Unsupported("MAP<TEXT,TEXT>".into()),
        ));
        assert!(matches!(
            EntityMetadata::from_descriptor(desc),
            Err(DbError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_relationship_type_must_match_cardinality() {
        let desc = user().attribute(
            AttributeDescriptor::new("groups", SemanticType::Text).relation("groups", RelationKind::Many),
        );
        assert!(EntityMetadata::from_descriptor(desc).is_err());

        let desc = user().attribute(
            AttributeDescriptor::new("groups", SemanticType::KeyList)
                .relation("groups", RelationKind::Many),
        );
        let meta = EntityMetadata::from_descriptor(desc).unwrap();
        assert_eq!(meta.relationships().count(), 1);
    }

    #[test]
    fn test_boolean_primary_key_rejected() {
        let desc = EntityDescriptor::new("Flag", "flags")
            .attribute(AttributeDescriptor::new("on", SemanticType::Boolean).primary_key());
        assert!(matches!(
            EntityMetadata::from_descriptor(desc),
            Err(DbError::Metadata(_))
        ));
    }
}
