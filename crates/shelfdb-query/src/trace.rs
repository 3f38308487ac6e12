//! Compiler tracing boundary.
//!
//! Tracing is optional, injected by the caller, and must not affect
//! compilation semantics.

use shelfdb_schema::module::ModuleId;

///
/// QueryTraceSink
///

pub trait QueryTraceSink: Send + Sync {
    fn on_event(&self, event: QueryTraceEvent);
}

///
/// QueryTraceEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryTraceEvent {
    Start {
        target: ModuleId,
        entries: usize,
    },
    /// Abstract target expanded to its member modules.
    UnionExpanded {
        target: ModuleId,
        members: usize,
    },
    /// Entries against a different module recursed into a sub-filter.
    ChildFilter {
        parent: ModuleId,
        child: ModuleId,
        entries: usize,
    },
    Finish {
        target: ModuleId,
    },
}
