use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid entity metadata: {0}")]
    Metadata(String),

    #[error("Unsupported semantic type: {0}")]
    UnsupportedType(String),

    #[error("Row '{1}' not found in column family '{0}'")]
    NotFound(String, String),

    #[error("Entity '{0}' has been invalidated")]
    StaleEntity(String),

    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
