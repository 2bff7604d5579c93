use crate::store::Family;
use std::fmt;

/// An index update that failed after its primary-row mutation succeeded.
///
/// The row is already written (or deleted) and is not rolled back; the index
/// may answer lookups for this row incorrectly until the entry is repaired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInconsistency {
    pub column_family: String,
    pub row_id: String,
    pub attribute: String,
    pub reason: String,
}

impl IndexInconsistency {
    pub(crate) fn new(family: &Family, row_id: &str, attribute: &str, reason: impl Into<String>) -> Self {
        Self {
            column_family: family.name.clone(),
            row_id: row_id.to_string(),
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for IndexInconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "index on {}.{} out of sync for row '{}': {}",
            self.column_family, self.attribute, self.row_id, self.reason
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub row_id: String,
    pub columns_written: usize,
    /// Columns dropped because their attribute was NULL.
    pub columns_removed: usize,
    pub index_warnings: Vec<IndexInconsistency>,
}

impl WriteOutcome {
    pub fn is_consistent(&self) -> bool {
        self.index_warnings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// False when the row was already absent.
    pub existed: bool,
    pub index_warnings: Vec<IndexInconsistency>,
}

impl DeleteOutcome {
    pub fn is_consistent(&self) -> bool {
        self.index_warnings.is_empty()
    }
}

/// Store-level read that bypasses predicate translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeQuery {
    /// Point reads by raw row key, in the given order.
    Keys(Vec<String>),
    /// Key-order scan from `start` (inclusive) to `end` (exclusive).
    Range {
        start: Option<String>,
        end: Option<String>,
        limit: Option<usize>,
    },
}
