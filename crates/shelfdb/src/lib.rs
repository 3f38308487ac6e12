//! ## Crate layout
//! - `schema`: value types, fields, modules, registry derivation rules,
//!   configuration ingestion.
//! - `query`: filter model, tagged wire format, SQL statement model and
//!   renderer, query compiler, record boundary.
//! - `error`: public (kind, origin, message) error surface over the inner
//!   crates' per-concern errors.
//!
//! The `prelude` module mirrors the surface a catalog host needs: build a
//! registry from configuration, parse or construct filters, compile them,
//! and hand the text to a persistence executor.

pub use shelfdb_query as query;
pub use shelfdb_schema as schema;

pub mod error;

pub use error::{Error, ErrorKind, ErrorOrigin};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::error::{Error, ErrorKind, ErrorOrigin};
    pub use shelfdb_query::prelude::*;
    pub use shelfdb_schema::{config::SchemaConfig, prelude::*};
}
