use thiserror::Error as ThisError;

///
/// ExecutorError
///
/// Failure reported by the external persistence layer. The core emits
/// query text and never opens connections or manages transactions; all
/// I/O failure handling belongs on this boundary.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("persistence executor failure: {0}")]
pub struct ExecutorError(pub String);

///
/// RowSet
///
/// Raw result rows. Cells are untyped text; the materializer coerces them
/// per the compiled column order.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RowSet {
    pub rows: Vec<Vec<Option<String>>>,
}

///
/// PersistenceExecutor
///
/// Submit compiled query text, receive rows. Callers must treat this as
/// potentially slow and fallible; the core imposes no timeout semantics.
///

pub trait PersistenceExecutor {
    fn execute(&self, query: &str) -> Result<RowSet, ExecutorError>;
}
