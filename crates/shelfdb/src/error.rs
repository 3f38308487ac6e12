use derive_more::Display;
use shelfdb_query::{
    compile::QueryError,
    executor::ExecutorError,
    wire::FilterParseError,
};
use shelfdb_schema::{config::ConfigError, registry::SchemaError, value::ValueCoercionError};
use thiserror::Error as ThisError;

///
/// Error
///
/// Public error surface: a flat (kind, origin, message) classification
/// over the per-concern errors of the inner crates. Schema errors are
/// fatal at startup; filter parse and coercion errors are recoverable by
/// discarding the offending filter or entry.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{origin}:{kind}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    /// Whether the failure is recoverable by discarding the input (a saved
    /// filter or one of its entries) rather than aborting startup.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidInput)
    }
}

///
/// ErrorKind
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[remain::sorted]
pub enum ErrorKind {
    /// Two derivation rules produced the same module id.
    Conflict,
    /// Malformed configuration or serialized filter, or an uncoercible value.
    InvalidInput,
    /// Persistence executor failure.
    Io,
    /// A module or field reference did not resolve.
    NotFound,
    /// The operator/value-type or schema combination is not expressible.
    Unsupported,
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[remain::sorted]
pub enum ErrorOrigin {
    Compiler,
    Config,
    Executor,
    Filter,
    Registry,
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Schema(e) => e.into(),
            ConfigError::Json(_) => {
                Self::new(ErrorKind::InvalidInput, ErrorOrigin::Config, err.to_string())
            }
        }
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        let kind = match err {
            SchemaError::IdCollision { .. } => ErrorKind::Conflict,
            SchemaError::UnknownModule(_) | SchemaError::UnknownField { .. } => {
                ErrorKind::NotFound
            }
            SchemaError::NotATemplate(_) | SchemaError::NotACollection { .. } => {
                ErrorKind::Unsupported
            }
        };
        Self::new(kind, ErrorOrigin::Registry, err.to_string())
    }
}

impl From<ValueCoercionError> for Error {
    fn from(err: ValueCoercionError) -> Self {
        Self::new(ErrorKind::InvalidInput, ErrorOrigin::Filter, err.to_string())
    }
}

impl From<FilterParseError> for Error {
    fn from(err: FilterParseError) -> Self {
        Self::new(ErrorKind::InvalidInput, ErrorOrigin::Filter, err.to_string())
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        let kind = match &err {
            QueryError::Schema(e) => return e.clone().into(),
            QueryError::MissingOperand(_)
            | QueryError::OperandMismatch { .. }
            | QueryError::OperandOutOfRange(_) => ErrorKind::InvalidInput,
            QueryError::UnsupportedPredicate { .. }
            | QueryError::MissingParentReference(_)
            | QueryError::UnsupportedOrdering { .. } => ErrorKind::Unsupported,
        };
        Self::new(kind, ErrorOrigin::Compiler, err.to_string())
    }
}

impl From<ExecutorError> for Error {
    fn from(err: ExecutorError) -> Self {
        Self::new(ErrorKind::Io, ErrorOrigin::Executor, err.to_string())
    }
}

impl From<shelfdb_schema::Error> for Error {
    fn from(err: shelfdb_schema::Error) -> Self {
        match err {
            shelfdb_schema::Error::Config(e) => e.into(),
            shelfdb_schema::Error::Schema(e) => e.into(),
            shelfdb_schema::Error::Coercion(e) => e.into(),
        }
    }
}

impl From<shelfdb_query::Error> for Error {
    fn from(err: shelfdb_query::Error) -> Self {
        match err {
            shelfdb_query::Error::Query(e) => e.into(),
            shelfdb_query::Error::Parse(e) => e.into(),
        }
    }
}
