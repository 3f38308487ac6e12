use crate::compile::ColumnRef;
use serde::{Deserialize, Serialize};
use shelfdb_schema::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

///
/// Record
///
/// Generic field-indexed value container for one stored item. The core
/// consumes records to build filters and produces them when materializing
/// result rows; storage and editing live outside this core.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Record {
    module: ModuleId,
    values: BTreeMap<i32, Value>,
    changed: BTreeSet<i32>,
}

impl Record {
    #[must_use]
    pub const fn new(module: ModuleId) -> Self {
        Self {
            module,
            values: BTreeMap::new(),
            changed: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn module(&self) -> ModuleId {
        self.module
    }

    /// Set a field value and mark it changed.
    pub fn set(&mut self, index: i32, value: Value) {
        self.values.insert(index, value);
        self.changed.insert(index);
    }

    /// Set a field value without marking it changed (loaded state).
    pub fn load(&mut self, index: i32, value: Value) {
        self.values.insert(index, value);
    }

    #[must_use]
    pub fn value(&self, index: i32) -> Option<&Value> {
        self.values.get(&index)
    }

    pub fn changed_fields(&self) -> impl Iterator<Item = i32> + '_ {
        self.changed.iter().copied()
    }

    #[must_use]
    pub fn is_changed(&self, index: i32) -> bool {
        self.changed.contains(&index)
    }
}

/// Map one result row back into a record, positionally, per the compiled
/// column order (module-id column first when present, then fields in
/// definition order). Cells that fail coercion are left unset.
#[must_use]
pub fn materialize(
    columns: &[ColumnRef],
    row: &[Option<String>],
    fallback_module: ModuleId,
) -> Record {
    let module = columns
        .first()
        .zip(row.first())
        .and_then(|(col, cell)| match (col, cell) {
            (ColumnRef::ModuleId, Some(text)) => text.parse().ok().map(ModuleId::new),
            _ => None,
        })
        .unwrap_or(fallback_module);

    let mut record = Record::new(module);
    for (col, cell) in columns.iter().zip(row.iter()) {
        let ColumnRef::Field { index, value_type } = col else {
            continue;
        };
        let Some(text) = cell else {
            continue;
        };
        if let Ok(value) = Value::coerce(text, *value_type) {
            record.load(*index, value);
        }
    }
    record
}
