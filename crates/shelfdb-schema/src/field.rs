use crate::{
    module::ModuleId,
    value::{StorageClass, ValueType},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::LazyLock};

/// Index offset for the auto-generated persistent mirror of a
/// collection-valued field (the sortable proxy column).
pub const MIRROR_FIELD_OFFSET: i32 = 100_000_000;

///
/// System field indices
///
/// Fields shared by every module. Lookups fall back here after a module's
/// own field set. The lending fields have no column of their own; the
/// compiler routes them through the loan ledger.
///

pub mod sysfield {
    pub const CREATED: i32 = 201;
    pub const MODIFIED: i32 = 202;
    pub const AVAILABLE: i32 = 203;
    pub const LENT_BY: i32 = 204;
    pub const LOAN_DURATION: i32 = 205;
}

///
/// Field
///
/// One field descriptor within a module. `column = None` marks a
/// computed/UI-only field that must never appear in generated SQL.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Field {
    pub index: i32,
    pub module: ModuleId,
    pub label: String,
    pub name: String,
    pub value_type: ValueType,
    pub ui_only: bool,
    pub enabled: bool,
    pub read_only: bool,
    pub searchable: bool,
    pub max_length: u32,
    pub column: Option<String>,
    pub referenced_module: Option<ModuleId>,
}

impl Field {
    pub fn new(
        index: i32,
        module: ModuleId,
        name: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        let name = name.into();
        Self {
            index,
            module,
            label: name.clone(),
            name,
            value_type,
            ui_only: false,
            enabled: true,
            read_only: false,
            searchable: true,
            max_length: 0,
            column: None,
            referenced_module: None,
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_reference(mut self, module: ModuleId) -> Self {
        self.referenced_module = Some(module);
        self
    }

    #[must_use]
    pub fn ui_only(mut self) -> Self {
        self.ui_only = true;
        self
    }

    #[must_use]
    pub fn unsearchable(mut self) -> Self {
        self.searchable = false;
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Column name if this field participates in generated SQL.
    #[must_use]
    pub fn sql_column(&self) -> Option<&str> {
        if self.ui_only {
            None
        } else {
            self.column.as_deref()
        }
    }

    #[must_use]
    pub const fn is_mirror(&self) -> bool {
        self.index >= MIRROR_FIELD_OFFSET
    }

    /// The persistent mirror synthesized for a collection-valued field:
    /// same identity shifted by [`MIRROR_FIELD_OFFSET`], stored as a plain
    /// string column holding the sortable proxy value.
    #[must_use]
    pub fn mirror(&self) -> Option<Self> {
        if self.value_type.storage_class() != StorageClass::JunctionRouted {
            return None;
        }

        let mut mirror = Self::new(
            self.index + MIRROR_FIELD_OFFSET,
            self.module,
            format!("{}_mirror", self.name),
            ValueType::String,
        );
        mirror.label = self.label.clone();
        mirror.searchable = false;
        mirror.read_only = true;
        mirror.column = Some(format!("{}_mirror", self.name));

        Some(mirror)
    }
}

///
/// FieldList
///
/// Per-module field set, ordered by field index. Index uniqueness is the
/// map key invariant.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldList {
    fields: BTreeMap<i32, Field>,
}

impl FieldList {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Insert a field, replacing any field with the same index.
    pub fn insert(&mut self, field: Field) -> Option<Field> {
        self.fields.insert(field.index, field)
    }

    #[must_use]
    pub fn get(&self, index: i32) -> Option<&Field> {
        self.fields.get(&index)
    }

    #[must_use]
    pub fn contains(&self, index: i32) -> bool {
        self.fields.contains_key(&index)
    }

    /// Fields in definition (index) order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Fields that materialize as SQL columns, in definition order.
    pub fn persistent(&self) -> impl Iterator<Item = &Field> {
        self.iter().filter(|f| f.sql_column().is_some())
    }

    /// Merge fields from `other` whose indices are not already present.
    pub fn merge_missing(&mut self, other: &Self) {
        for field in other.iter() {
            if !self.contains(field.index) {
                self.insert(field.clone());
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn max_index(&self) -> Option<i32> {
        self.fields.keys().next_back().copied()
    }
}

impl FromIterator<Field> for FieldList {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut list = Self::new();
        for field in iter {
            list.insert(field);
        }
        list
    }
}

static SYSTEM_FIELDS: LazyLock<FieldList> = LazyLock::new(|| {
    let m = ModuleId::SYSTEM;

    FieldList::from_iter([
        Field::new(sysfield::CREATED, m, "created", ValueType::Date)
            .with_column("created")
            .read_only(),
        Field::new(sysfield::MODIFIED, m, "modified", ValueType::Date)
            .with_column("modified")
            .read_only(),
        Field::new(sysfield::AVAILABLE, m, "available", ValueType::Boolean).ui_only(),
        Field::new(sysfield::LENT_BY, m, "lent_by", ValueType::SingleReference).ui_only(),
        Field::new(sysfield::LOAN_DURATION, m, "loan_duration", ValueType::LongInt).ui_only(),
    ])
});

/// Fields common to all modules (timestamps and the lending trio).
#[must_use]
pub fn system_fields() -> &'static FieldList {
    &SYSTEM_FIELDS
}
