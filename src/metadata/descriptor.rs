use crate::core::SemanticType;

/// Cardinality of a relationship attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// The attribute holds one row key (`Text`).
    One,
    /// The attribute holds an ordered list of row keys (`KeyList`).
    Many,
}

/// Reference from one entity type to rows of another column family.
///
/// Targets are named by column family rather than by type so cyclic entity
/// graphs never need their descriptors to refer to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    pub target_family: String,
    pub kind: RelationKind,
}

#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    pub name: String,
    pub column: String,
    pub semantic_type: SemanticType,
    pub primary_key: bool,
    pub indexed: bool,
    pub relation: Option<Relation>,
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            semantic_type,
            primary_key: false,
            indexed: false,
            relation: None,
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn primary_key(self) -> Self {
        self.primary_key_if(true)
    }

    pub fn primary_key_if(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    pub fn indexed(self) -> Self {
        self.indexed_if(true)
    }

    pub fn indexed_if(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    pub fn relation(mut self, target_family: impl Into<String>, kind: RelationKind) -> Self {
        self.relation = Some(Relation {
            target_family: target_family.into(),
            kind,
        });
        self
    }

    pub fn relation_if(self, relation: Option<(&str, RelationKind)>) -> Self {
        match relation {
            Some((target, kind)) => self.relation(target, kind),
            None => self,
        }
    }
}

/// Declared, unvalidated shape of an entity type.
///
/// Entity types hand one of these out; `EntityMetadata::from_descriptor`
/// checks it once and the result is cached for the process lifetime.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub type_name: String,
    pub column_family: String,
    pub keyspace: Option<String>,
    pub attributes: Vec<AttributeDescriptor>,
}

impl EntityDescriptor {
    pub fn new(type_name: impl Into<String>, column_family: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            column_family: column_family.into(),
            keyspace: None,
            attributes: Vec::new(),
        }
    }

    /// Pins the entity to a keyspace instead of the client's configured one.
    pub fn keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    pub fn attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }
}
