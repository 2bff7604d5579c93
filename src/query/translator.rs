use super::predicate::{Operand, Operator, Predicate};
use crate::codec::key;
use crate::core::{DbError, Result, SemanticType, Value};
use crate::metadata::EntityMetadata;
use std::ops::Bound;

/// How candidate rows are fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    /// Point read of one row.
    Key(String),
    /// Native key-range scan.
    KeyRange { start: Bound<String>, end: Bound<String> },
    /// Candidate row ids come from the secondary index on `attribute`.
    Index { attribute: String, predicate: Predicate },
}

/// Result of routing a predicate sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub access: Access,
    /// Applied to decoded candidates, in sequence order.
    pub residual: Vec<Predicate>,
    pub use_index: Option<String>,
}

/// Routes a predicate sequence onto a native key operation or an index.
///
/// Only a primary-key predicate in first position becomes a key operation;
/// otherwise the first predicate on an indexed attribute drives the lookup.
/// Every other predicate is residual. A sequence with neither path is
/// rejected rather than answered with a full scan.
pub fn translate(predicates: &[Predicate], metadata: &EntityMetadata) -> Result<QueryPlan> {
    if predicates.is_empty() {
        return Err(DbError::UnsupportedQuery(format!(
            "no predicates for '{}'; full scans are not supported",
            metadata.column_family()
        )));
    }

    let coerced = predicates
        .iter()
        .map(|p| p.coerced(semantic_type_of(p, metadata)?))
        .collect::<Result<Vec<_>>>()?;

    let pk = metadata.primary_key();
    if coerced[0].attribute == pk.name {
        let mut residual = coerced;
        let first = residual.remove(0);
        return Ok(QueryPlan {
            access: key_access(&first, &pk.semantic_type)?,
            residual,
            use_index: None,
        });
    }

    let routed = coerced.iter().position(|p| {
        metadata
            .attribute(&p.attribute)
            .is_some_and(|attr| attr.indexed)
    });

    match routed {
        Some(idx) => {
            let mut residual = coerced;
            let predicate = residual.remove(idx);
            let attribute = predicate.attribute.clone();
            Ok(QueryPlan {
                access: Access::Index {
                    attribute: attribute.clone(),
                    predicate,
                },
                residual,
                use_index: Some(attribute),
            })
        }
        None => Err(DbError::UnsupportedQuery(format!(
            "no primary-key or indexed predicate on '{}' ({})",
            metadata.column_family(),
            predicates
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

fn semantic_type_of<'a>(predicate: &Predicate, metadata: &'a EntityMetadata) -> Result<&'a SemanticType> {
    if metadata.is_primary_key(&predicate.attribute) {
        return Ok(&metadata.primary_key().semantic_type);
    }
    metadata
        .attribute(&predicate.attribute)
        .map(|attr| &attr.semantic_type)
        .ok_or_else(|| {
            DbError::UnsupportedQuery(format!(
                "{} has no attribute '{}'",
                metadata.type_name(),
                predicate.attribute
            ))
        })
}

fn key_access(predicate: &Predicate, semantic_type: &SemanticType) -> Result<Access> {
    if let (Operator::Eq, Operand::Value(value)) = (predicate.operator, &predicate.operand) {
        return Ok(Access::Key(key::encode_row_key(value, semantic_type)?));
    }
    let (lower, upper) = predicate.bounds()?;
    let encode = |bound: Bound<Value>| -> Result<Bound<String>> {
        Ok(match bound {
            Bound::Included(v) => Bound::Included(key::encode_row_key(&v, semantic_type)?),
            Bound::Excluded(v) => Bound::Excluded(key::encode_row_key(&v, semantic_type)?),
            Bound::Unbounded => Bound::Unbounded,
        })
    };
    Ok(Access::KeyRange {
        start: encode(lower)?,
        end: encode(upper)?,
    })
}
