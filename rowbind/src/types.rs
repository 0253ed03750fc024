use std::future::Future;
use std::pin::Pin;

use sea_orm::DbErr;

/// Crate-wide result alias
pub type RowbindResult<T> = std::result::Result<T, RowbindError>;

/// Boxed future used wherever hydration recurses across entity types
pub type BoxedFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors raised by descriptor construction, statement execution and hydration
#[derive(Debug, thiserror::Error)]
pub enum RowbindError {
    // Descriptor errors
    #[error("entity '{entity}' has no annotated columns")]
    EmptyDescriptor { entity: String },

    #[error("entity '{entity}' maps column '{column}' more than once")]
    DuplicateColumn { entity: String, column: String },

    #[error("entity '{entity}' has no primary key; mark a field with `primary_key` or name it `id`")]
    NoPrimaryKey { entity: String },

    #[error("entity '{entity}' marks more than one primary key ({first}, {second})")]
    MultiplePrimaryKeys {
        entity: String,
        first: String,
        second: String,
    },

    #[error("invalid annotation on {entity}.{field}: {message}")]
    InvalidAnnotation {
        entity: String,
        field: String,
        message: String,
    },

    // Entity access errors
    #[error("entity '{entity}' has no persisted field '{field}'")]
    UnknownField { entity: String, field: String },

    #[error("entity '{entity}' has no relation field '{field}'")]
    UnknownRelation { entity: String, field: String },

    #[error("entity '{entity}' has no columns besides its primary key to update")]
    NothingToUpdate { entity: String },

    // Execution errors
    #[error("connection error: {0}")]
    Connection(#[source] DbErr),

    #[error("query failed: {0}")]
    Query(#[source] DbErr),

    #[error("failed to decode column '{column}' of '{entity}': {source}")]
    Decode {
        entity: String,
        column: String,
        #[source]
        source: DbErr,
    },

    #[error("{operation} on '{table}' failed: {source}")]
    Write {
        operation: &'static str,
        table: String,
        #[source]
        source: Box<RowbindError>,
    },

    #[error("rollback failed ({rollback}) after write error: {write}")]
    RollbackFailed {
        write: Box<RowbindError>,
        rollback: DbErr,
    },

    #[error("transaction is already closed")]
    TransactionClosed,

    #[error("no transaction is bound to this execution context")]
    NoTransaction,

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

impl From<DbErr> for RowbindError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => RowbindError::Connection(err),
            DbErr::Type(_) | DbErr::TryIntoErr { .. } => RowbindError::Decode {
                entity: String::new(),
                column: String::new(),
                source: err,
            },
            other => RowbindError::Query(other),
        }
    }
}

impl RowbindError {
    /// Create a decode error for one column of an entity
    pub fn decode(entity: impl Into<String>, column: impl Into<String>, source: DbErr) -> Self {
        Self::Decode {
            entity: entity.into(),
            column: column.into(),
            source,
        }
    }

    /// Create an invalid annotation error
    pub fn invalid_annotation(
        entity: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidAnnotation {
            entity: entity.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Wrap an execution error raised by a write statement
    pub fn write(operation: &'static str, table: impl Into<String>, source: RowbindError) -> Self {
        match source {
            // Rollback failures and interrupts already say everything the caller needs
            err @ (Self::RollbackFailed { .. } | Self::Cancelled | Self::DeadlineExceeded) => err,
            source => Self::Write {
                operation,
                table: table.into(),
                source: Box::new(source),
            },
        }
    }

    /// True for cancellation and deadline errors, which abort the whole operation
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// True when the store could not be reached
    pub fn is_connection(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Write { source, .. } => source.is_connection(),
            _ => false,
        }
    }
}

/// Shape of a relation field
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RelationKind {
    /// `T`: at most one row, default value when none
    Struct,
    /// `Option<T>` or `Option<Box<T>>`
    Optional,
    /// `Vec<T>`
    Slice,
    /// `Option<Vec<T>>`
    OptionalSlice,
}

impl RelationKind {
    pub fn is_collection(self) -> bool {
        matches!(self, RelationKind::Slice | RelationKind::OptionalSlice)
    }
}
