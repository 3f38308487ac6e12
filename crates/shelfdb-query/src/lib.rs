//! Filter model and query compiler for the catalog: declarative filter
//! expressions, the legacy tagged wire format, and compilation into SQL
//! text against a sealed module registry.

pub mod compile;
pub mod executor;
pub mod filter;
pub mod record;
pub mod sql;
pub mod trace;
pub mod wire;

#[cfg(test)]
pub(crate) mod test_fixtures;

use crate::{compile::QueryError, wire::FilterParseError};
use thiserror::Error as ThisError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        compile::{ColumnRef, CompiledQuery, QueryCompiler, QueryError},
        executor::{ExecutorError, PersistenceExecutor, RowSet},
        filter::{Combinator, Filter, FilterEntry, Operator},
        record::{Record, materialize},
        trace::{QueryTraceEvent, QueryTraceSink},
        wire::{DroppedEntry, FilterParseError, ParseOutcome},
    };
}

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Parse(#[from] FilterParseError),
}
