use thiserror::Error;

type Cause = Box<MetaError>;

#[derive(Error, Debug)]
pub enum MetaError {
    #[error("Invalid meta attribute '{0}'")]
    InvalidAttribute(String),

    #[error("Meta attributes overlap core fields of '{table}': {names:?}")]
    AttributeOverlap { table: String, names: Vec<String> },

    #[error("Primary save of '{table}' failed: {cause}")]
    PrimarySaveFailed { table: String, cause: Cause },

    #[error("Meta attribute '{name}' write failed: {cause}")]
    MetaWriteFailed { name: String, cause: Cause },

    #[error("Queued meta attribute '{name}' flush failed: {cause}")]
    MetaFlushFailed { name: String, cause: Cause },

    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl MetaError {
    pub fn primary_save_failed(table: impl Into<String>, cause: MetaError) -> Self {
        Self::PrimarySaveFailed {
            table: table.into(),
            cause: Box::new(cause),
        }
    }

    pub fn meta_write_failed(name: impl Into<String>, cause: MetaError) -> Self {
        Self::MetaWriteFailed {
            name: name.into(),
            cause: Box::new(cause),
        }
    }

    pub fn meta_flush_failed(name: impl Into<String>, cause: MetaError) -> Self {
        Self::MetaFlushFailed {
            name: name.into(),
            cause: Box::new(cause),
        }
    }

    /// The innermost store-level error behind a lifecycle error.
    pub fn root_cause(&self) -> &MetaError {
        match self {
            Self::PrimarySaveFailed { cause, .. }
            | Self::MetaWriteFailed { cause, .. }
            | Self::MetaFlushFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, MetaError>;

impl From<serde_json::Error> for MetaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
