use serde::{Deserialize, Serialize};
use shelfdb_schema::prelude::*;

///
/// Combinator
///
/// How a filter entry joins the predicate chain. Entries fold
/// left-to-right with no precedence grouping; entry order is significant
/// for mixed AND/OR chains.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    #[must_use]
    pub const fn wire(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    #[must_use]
    pub fn from_wire(text: &str) -> Option<Self> {
        match text {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            _ => None,
        }
    }
}

///
/// Operator
///
/// Filter entry operators. Wire representation is the integer tag, which
/// is a compatibility contract and must never be renumbered.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[repr(u8)]
pub enum Operator {
    Equal = 1,
    NotEqual = 2,
    Contains = 3,
    DoesNotContain = 4,
    StartsWith = 5,
    EndsWith = 6,
    IsEmpty = 7,
    IsFilled = 8,
    LessThan = 9,
    GreaterThan = 10,
    Before = 11,
    After = 12,
    Today = 13,
    DaysBefore = 14,
    DaysAfter = 15,
    MonthsAgo = 16,
    YearsAgo = 17,
    ContainsValue = 18,
}

impl Operator {
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        let op = match tag {
            1 => Self::Equal,
            2 => Self::NotEqual,
            3 => Self::Contains,
            4 => Self::DoesNotContain,
            5 => Self::StartsWith,
            6 => Self::EndsWith,
            7 => Self::IsEmpty,
            8 => Self::IsFilled,
            9 => Self::LessThan,
            10 => Self::GreaterThan,
            11 => Self::Before,
            12 => Self::After,
            13 => Self::Today,
            14 => Self::DaysBefore,
            15 => Self::DaysAfter,
            16 => Self::MonthsAgo,
            17 => Self::YearsAgo,
            18 => Self::ContainsValue,
            _ => return None,
        };
        Some(op)
    }

    /// Operators that take no operand.
    #[must_use]
    pub const fn needs_operand(self) -> bool {
        !matches!(self, Self::IsEmpty | Self::IsFilled | Self::Today)
    }

    /// Value type of the operand, given the field's declared type. The
    /// relative-date operators carry a day/month/year count, not a date.
    #[must_use]
    pub const fn operand_type(self, field_type: ValueType) -> ValueType {
        match self {
            Self::DaysBefore | Self::DaysAfter | Self::MonthsAgo | Self::YearsAgo => {
                ValueType::LongInt
            }
            _ => field_type,
        }
    }
}

///
/// FilterEntry
///
/// One predicate of a filter. `module` may differ from the filter's target
/// module, in which case the entry describes a child-filter condition.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FilterEntry {
    pub combinator: Combinator,
    pub module: ModuleId,
    pub field_index: i32,
    pub operator: Operator,
    pub value: Option<Value>,
}

impl FilterEntry {
    #[must_use]
    pub fn new(
        combinator: Combinator,
        module: ModuleId,
        field_index: i32,
        operator: Operator,
        value: Option<Value>,
    ) -> Self {
        Self {
            combinator,
            module,
            field_index,
            operator,
            value,
        }
    }
}

///
/// Filter
///
/// Serializable, declarative query expression: target module, ordered
/// predicate entries, ordering, and a result-row cap. Immutable once
/// compiled; never mutates the registry.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Filter {
    pub name: String,
    pub target_module: ModuleId,
    pub entries: Vec<FilterEntry>,
    /// Field indices resolved against the target module at compile time.
    pub order_by: Vec<i32>,
    pub sort_descending: bool,
    pub row_limit: Option<u32>,
}

impl Filter {
    #[must_use]
    pub fn new(target_module: ModuleId) -> Self {
        Self {
            name: String::new(),
            target_module,
            entries: Vec::new(),
            order_by: Vec::new(),
            sort_descending: false,
            row_limit: None,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_entry(mut self, entry: FilterEntry) -> Self {
        self.entries.push(entry);
        self
    }

    #[must_use]
    pub fn order_by(mut self, field_index: i32) -> Self {
        self.order_by.push(field_index);
        self
    }

    #[must_use]
    pub const fn descending(mut self) -> Self {
        self.sort_descending = true;
        self
    }

    #[must_use]
    pub const fn limit(mut self, rows: u32) -> Self {
        self.row_limit = Some(rows);
        self
    }

    /// Build a filter from an edited record: every searchable, enabled,
    /// changed field becomes an `Equal` entry, chained with AND.
    #[must_use]
    pub fn from_record(record: &crate::record::Record, registry: &ModuleRegistry) -> Self {
        let module = record.module();
        let mut filter = Self::new(module);

        for index in record.changed_fields() {
            let Some(field) = registry.field_of(module, index) else {
                continue;
            };
            if !field.searchable || !field.enabled {
                continue;
            }
            let Some(value) = record.value(index) else {
                continue;
            };
            filter.entries.push(FilterEntry::new(
                Combinator::And,
                module,
                index,
                Operator::Equal,
                Some(value.clone()),
            ));
        }

        filter
    }
}
