//! Schema metadata for the catalog: value types, fields, modules, and the
//! registry that owns module composition (property templates, synthesized
//! junctions, default-value templates, abstract unions).

pub mod config;
pub mod field;
pub mod module;
pub mod registry;
pub mod value;

use crate::{config::ConfigError, registry::SchemaError, value::ValueCoercionError};
use thiserror::Error as ThisError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        field::{Field, FieldList, MIRROR_FIELD_OFFSET, sysfield, system_fields},
        module::{AbstractScope, Module, ModuleId, ModuleKind},
        registry::{ModuleRegistry, RegistryBuilder, SchemaError},
        value::{RecordId, StorageClass, Value, ValueCoercionError, ValueType},
    };
}

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Coercion(#[from] ValueCoercionError),
}
