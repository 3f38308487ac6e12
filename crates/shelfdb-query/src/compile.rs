use crate::{
    filter::{Combinator, Filter, FilterEntry, Operator},
    sql::{
        ast::{
            CompareKw, Join, Literal, MatchKind, OrderTerm, SelectColumn, SelectStmt,
            SqlPredicate, Statement, UnionStmt,
        },
        render::render,
    },
    trace::{QueryTraceEvent, QueryTraceSink},
};
use shelfdb_schema::{
    prelude::*,
    registry::{MAPPING_OBJECT_FIELD, MAPPING_REFERENCED_FIELD},
};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;
use time::{Date, Month};

// Loan ledger and picture store, keyed by item id.
const LOAN_TABLE: &str = "loans";
const LOAN_OBJECT_COLUMN: &str = "objectID";
const LOAN_PERSON_COLUMN: &str = "personID";
const LOAN_START_COLUMN: &str = "startdate";
const LOAN_END_COLUMN: &str = "enddate";
const PICTURE_TABLE: &str = "picture";
const PICTURE_OBJECT_COLUMN: &str = "objectID";
const PICTURE_FIELD_COLUMN: &str = "field";

/// Alias of the injected module-id literal column.
pub const MODULE_ID_ALIAS: &str = "MODULEIDX";

///
/// QueryError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QueryError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("operator {0:?} requires an operand")]
    MissingOperand(Operator),

    #[error("operand does not match {value_type} for operator {operator:?}")]
    OperandMismatch {
        operator: Operator,
        value_type: ValueType,
    },

    #[error("operand for {0:?} is outside the supported calendar range")]
    OperandOutOfRange(Operator),

    #[error("operator {operator:?} is not defined for {value_type} fields")]
    UnsupportedPredicate {
        operator: Operator,
        value_type: ValueType,
    },

    #[error("module {0} has no parent-reference field for child filtering")]
    MissingParentReference(ModuleId),

    #[error("field {index} on module {module} cannot be ordered by")]
    UnsupportedOrdering { module: ModuleId, index: i32 },
}

///
/// ColumnRef
///
/// Positional description of one emitted result column; the materializer
/// maps result cells back to field indices through this.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnRef {
    /// The injected module-id literal.
    ModuleId,
    Field { index: i32, value_type: ValueType },
}

///
/// CompiledQuery
///

#[derive(Clone, Debug, PartialEq)]
pub struct CompiledQuery {
    pub statement: Statement,
    pub columns: Vec<ColumnRef>,
}

impl CompiledQuery {
    /// Render to query text for the persistence executor.
    #[must_use]
    pub fn sql(&self) -> String {
        render(&self.statement)
    }
}

///
/// QueryCompiler
///
/// Pure function of (registry, filter, today). Compilation never mutates
/// the registry or the filter; instances are reentrant and freely shared.
///

pub struct QueryCompiler<'a> {
    registry: &'a ModuleRegistry,
    today: Date,
    trace: Option<&'a dyn QueryTraceSink>,
}

impl<'a> QueryCompiler<'a> {
    #[must_use]
    pub const fn new(registry: &'a ModuleRegistry, today: Date) -> Self {
        Self {
            registry,
            today,
            trace: None,
        }
    }

    #[must_use]
    pub const fn with_trace(mut self, sink: &'a dyn QueryTraceSink) -> Self {
        self.trace = Some(sink);
        self
    }

    fn emit(&self, event: QueryTraceEvent) {
        if let Some(sink) = self.trace {
            sink.on_event(event);
        }
    }

    pub fn compile(&self, filter: &Filter) -> Result<CompiledQuery, QueryError> {
        let target = self.registry.get(filter.target_module)?;
        self.emit(QueryTraceEvent::Start {
            target: target.id,
            entries: filter.entries.len(),
        });

        let statement = if target.is_abstract() {
            let members = self.registry.resolve_abstract(target.id)?;
            self.emit(QueryTraceEvent::UnionExpanded {
                target: target.id,
                members: members.len(),
            });

            if members.is_empty() {
                Statement::Empty
            } else {
                let selects = members
                    .iter()
                    .map(|id| {
                        let member = self.registry.get(*id)?;
                        self.member_select(filter, target, member, true)
                    })
                    .collect::<Result<Vec<_>, QueryError>>()?;

                Statement::Union(UnionStmt {
                    selects,
                    order_by: self.union_order(filter, target)?,
                    limit: filter.row_limit,
                })
            }
        } else {
            let mut select = self.member_select(filter, target, target, false)?;
            let (joins, order_by) = self.select_order(filter, target)?;
            select.joins = joins;
            select.order_by = order_by;
            select.limit = filter.row_limit;
            Statement::Select(select)
        };

        self.emit(QueryTraceEvent::Finish { target: target.id });

        Ok(CompiledQuery {
            columns: column_plan(target, target.is_abstract()),
            statement,
        })
    }

    /// One member `SELECT`: projection from the target's field list, rows
    /// from the member's table.
    fn member_select(
        &self,
        filter: &Filter,
        target: &Module,
        member: &Module,
        inject_module_id: bool,
    ) -> Result<SelectStmt, QueryError> {
        let mut select = SelectStmt::new(member.table.clone());

        if inject_module_id {
            select.columns.push(SelectColumn::IntLiteral {
                value: member.id.raw(),
                alias: MODULE_ID_ALIAS,
            });
        }
        for field in target.fields.persistent() {
            if let Some(column) = field.sql_column() {
                select.columns.push(SelectColumn::Column(column.to_string()));
            }
        }

        select.predicate = self.build_predicate(target, member, &filter.entries)?;
        Ok(select)
    }

    /// Partition entries into own-module predicates and child-filter
    /// groups, then fold them in entry order. Entries belong to the
    /// current module when they name the target or the member.
    fn build_predicate(
        &self,
        target: &Module,
        member: &Module,
        entries: &[FilterEntry],
    ) -> Result<Option<SqlPredicate>, QueryError> {
        let mut chain = Vec::new();
        let mut foreign: BTreeMap<ModuleId, Vec<FilterEntry>> = BTreeMap::new();

        for entry in entries {
            if entry.module == target.id || entry.module == member.id {
                chain.push((entry.combinator, self.predicate_for(target, member, entry)?));
            } else {
                foreign.entry(entry.module).or_default().push(entry.clone());
            }
        }

        for (child_id, group) in foreign {
            let combinator = group[0].combinator;
            chain.push((combinator, self.child_filter(member, child_id, &group)?));
        }

        Ok(if chain.is_empty() {
            None
        } else {
            Some(SqlPredicate::Chain(chain))
        })
    }

    /// Entries against another module select parent items whose child
    /// rows satisfy them: `<pk> IN (SELECT <parent-ref> FROM child ...)`.
    fn child_filter(
        &self,
        parent: &Module,
        child_id: ModuleId,
        entries: &[FilterEntry],
    ) -> Result<SqlPredicate, QueryError> {
        let child = self.registry.get(child_id)?;
        self.emit(QueryTraceEvent::ChildFilter {
            parent: parent.id,
            child: child_id,
            entries: entries.len(),
        });

        let parent_column = child
            .fields
            .iter()
            .find(|f| f.value_type == ValueType::ParentReference)
            .and_then(Field::sql_column)
            .ok_or(QueryError::MissingParentReference(child_id))?;

        let mut subquery = SelectStmt::new(child.table.clone());
        subquery
            .columns
            .push(SelectColumn::Column(parent_column.to_string()));
        subquery.predicate = self.build_predicate(child, child, entries)?;

        Ok(SqlPredicate::InSubquery {
            column: parent.pk().to_string(),
            negated: false,
            subquery: Box::new(subquery),
        })
    }

    /// The operator x value-type matrix.
    fn predicate_for(
        &self,
        target: &Module,
        member: &Module,
        entry: &FilterEntry,
    ) -> Result<SqlPredicate, QueryError> {
        if matches!(
            entry.field_index,
            sysfield::AVAILABLE | sysfield::LENT_BY | sysfield::LOAN_DURATION
        ) {
            return self.lending_predicate(member, entry);
        }

        let field = self
            .registry
            .field_of(member.id, entry.field_index)
            .or_else(|| self.registry.field_of(target.id, entry.field_index))
            .ok_or(SchemaError::UnknownField {
                module: member.id,
                index: entry.field_index,
            })?;

        let op = entry.operator;
        let value = entry.value.as_ref();
        if op.needs_operand() && value.is_none() {
            return Err(QueryError::MissingOperand(op));
        }

        match field.value_type {
            ValueType::SingleReference | ValueType::ParentReference => {
                let column = column_of(field)?;
                match op {
                    Operator::Equal | Operator::Contains => {
                        id_list(column, field, op, value, false)
                    }
                    Operator::NotEqual | Operator::DoesNotContain => {
                        id_list(column, field, op, value, true)
                    }
                    Operator::IsEmpty => Ok(SqlPredicate::IsNull {
                        column: column.to_string(),
                        negated: false,
                    }),
                    Operator::IsFilled => Ok(SqlPredicate::IsNull {
                        column: column.to_string(),
                        negated: true,
                    }),
                    _ => Err(unsupported(op, field)),
                }
            }

            ValueType::ReferenceCollection => self.collection_predicate(member, field, entry),

            ValueType::Picture => {
                let negated = match op {
                    Operator::IsEmpty => true,
                    Operator::IsFilled => false,
                    _ => return Err(unsupported(op, field)),
                };
                let mut subquery = SelectStmt::new(PICTURE_TABLE);
                subquery
                    .columns
                    .push(SelectColumn::Column(PICTURE_OBJECT_COLUMN.to_string()));
                subquery.predicate = Some(SqlPredicate::Compare {
                    column: PICTURE_FIELD_COLUMN.to_string(),
                    op: CompareKw::Eq,
                    literal: Literal::Text(field.name.clone()),
                });
                Ok(SqlPredicate::InSubquery {
                    column: member.pk().to_string(),
                    negated,
                    subquery: Box::new(subquery),
                })
            }

            ValueType::String | ValueType::Icon => {
                let column = column_of(field)?;
                match op {
                    Operator::Contains | Operator::ContainsValue => {
                        like(column, MatchKind::Contains, field, op, value, false)
                    }
                    Operator::DoesNotContain => {
                        like(column, MatchKind::Contains, field, op, value, true)
                    }
                    Operator::StartsWith => {
                        like(column, MatchKind::StartsWith, field, op, value, false)
                    }
                    Operator::EndsWith => like(column, MatchKind::EndsWith, field, op, value, false),
                    Operator::Equal => Ok(SqlPredicate::CompareUpper {
                        column: column.to_string(),
                        negated: false,
                        text: text_operand(field, op, value)?,
                    }),
                    Operator::NotEqual => Ok(SqlPredicate::CompareUpper {
                        column: column.to_string(),
                        negated: true,
                        text: text_operand(field, op, value)?,
                    }),
                    Operator::IsEmpty => Ok(SqlPredicate::NullOrEmpty {
                        column: column.to_string(),
                        negated: false,
                    }),
                    Operator::IsFilled => Ok(SqlPredicate::NullOrEmpty {
                        column: column.to_string(),
                        negated: true,
                    }),
                    _ => Err(unsupported(op, field)),
                }
            }

            ValueType::Date | ValueType::DateTime => self.temporal_predicate(field, entry),

            ValueType::LongInt | ValueType::BigInt | ValueType::Double => {
                let column = column_of(field)?;
                match op {
                    Operator::Equal => numeric(column, CompareKw::Eq, field, op, value),
                    Operator::NotEqual => numeric(column, CompareKw::Ne, field, op, value),
                    Operator::LessThan => numeric(column, CompareKw::Lt, field, op, value),
                    Operator::GreaterThan => numeric(column, CompareKw::Gt, field, op, value),
                    Operator::IsEmpty => Ok(SqlPredicate::IsNull {
                        column: column.to_string(),
                        negated: false,
                    }),
                    Operator::IsFilled => Ok(SqlPredicate::IsNull {
                        column: column.to_string(),
                        negated: true,
                    }),
                    _ => Err(unsupported(op, field)),
                }
            }

            ValueType::Boolean => {
                let column = column_of(field)?;
                let Some(Value::Bool(b)) = value else {
                    return Err(mismatch(op, field));
                };
                let kw = match op {
                    Operator::Equal => CompareKw::Eq,
                    Operator::NotEqual => CompareKw::Ne,
                    _ => return Err(unsupported(op, field)),
                };
                Ok(SqlPredicate::Compare {
                    column: column.to_string(),
                    op: kw,
                    literal: Literal::Bool(*b),
                })
            }
        }
    }

    /// Collection membership routes through the synthesized junction.
    fn collection_predicate(
        &self,
        member: &Module,
        field: &Field,
        entry: &FilterEntry,
    ) -> Result<SqlPredicate, QueryError> {
        let owner = self.registry.get(field.module)?;
        let mapping = self.registry.mapping_module(owner, field)?;
        let op = entry.operator;

        let (negated, membership) = match op {
            Operator::Contains | Operator::Equal => (false, true),
            Operator::DoesNotContain | Operator::NotEqual => (true, true),
            Operator::IsFilled => (false, false),
            Operator::IsEmpty => (true, false),
            _ => return Err(unsupported(op, field)),
        };

        let object_column = junction_column(mapping, MAPPING_OBJECT_FIELD)?;
        let referenced_column = junction_column(mapping, MAPPING_REFERENCED_FIELD)?;

        let mut subquery = SelectStmt::new(mapping.table.clone());
        subquery
            .columns
            .push(SelectColumn::Column(object_column.to_string()));
        if membership {
            let ids = ids_operand(field, op, entry.value.as_ref())?;
            subquery.predicate = Some(SqlPredicate::InList {
                column: referenced_column.to_string(),
                values: ids.into_iter().map(Literal::Text).collect(),
                negated: false,
            });
        }

        Ok(SqlPredicate::InSubquery {
            column: member.pk().to_string(),
            negated,
            subquery: Box::new(subquery),
        })
    }

    fn temporal_predicate(
        &self,
        field: &Field,
        entry: &FilterEntry,
    ) -> Result<SqlPredicate, QueryError> {
        let column = column_of(field)?.to_string();
        let op = entry.operator;
        let value = entry.value.as_ref();

        let compare = |kw: CompareKw, date: Date| SqlPredicate::Compare {
            column: column.clone(),
            op: kw,
            literal: Literal::Date(date),
        };
        let window = |low: Date, high: Date| SqlPredicate::Between {
            column: column.clone(),
            low: Literal::Date(low),
            high: Literal::Date(high),
        };

        match op {
            Operator::Equal => Ok(compare(CompareKw::Eq, date_operand(field, op, value)?)),
            Operator::NotEqual => Ok(compare(CompareKw::Ne, date_operand(field, op, value)?)),
            Operator::Before | Operator::LessThan => {
                Ok(compare(CompareKw::Lt, date_operand(field, op, value)?))
            }
            Operator::After | Operator::GreaterThan => {
                Ok(compare(CompareKw::Gt, date_operand(field, op, value)?))
            }

            Operator::Today => Ok(compare(CompareKw::Eq, self.today)),

            Operator::DaysBefore => {
                let days = long_operand(field, op, value)?;
                let low = days
                    .checked_neg()
                    .and_then(|d| shift_days(self.today, d))
                    .ok_or(QueryError::OperandOutOfRange(op))?;
                Ok(window(low, self.today))
            }
            Operator::DaysAfter => {
                let days = long_operand(field, op, value)?;
                let high =
                    shift_days(self.today, days).ok_or(QueryError::OperandOutOfRange(op))?;
                Ok(window(self.today, high))
            }
            // Calendar month/year, not a rolling window.
            Operator::MonthsAgo => {
                let months = long_operand(field, op, value)?;
                let (low, high) =
                    month_window(self.today, months).ok_or(QueryError::OperandOutOfRange(op))?;
                Ok(window(low, high))
            }
            Operator::YearsAgo => {
                let years = long_operand(field, op, value)?;
                let (low, high) =
                    year_window(self.today, years).ok_or(QueryError::OperandOutOfRange(op))?;
                Ok(window(low, high))
            }

            Operator::IsEmpty => Ok(SqlPredicate::IsNull {
                column,
                negated: false,
            }),
            Operator::IsFilled => Ok(SqlPredicate::IsNull {
                column,
                negated: true,
            }),

            _ => Err(unsupported(op, field)),
        }
    }

    /// The lending trio compiles to a correlated query against the loan
    /// ledger: open loans are rows with `enddate IS NULL` already started.
    fn lending_predicate(
        &self,
        member: &Module,
        entry: &FilterEntry,
    ) -> Result<SqlPredicate, QueryError> {
        let op = entry.operator;
        let field = system_fields()
            .get(entry.field_index)
            .ok_or(SchemaError::UnknownField {
                module: member.id,
                index: entry.field_index,
            })?;

        let mut open_loan = vec![
            (
                Combinator::And,
                SqlPredicate::IsNull {
                    column: LOAN_END_COLUMN.to_string(),
                    negated: false,
                },
            ),
            (
                Combinator::And,
                SqlPredicate::Compare {
                    column: LOAN_START_COLUMN.to_string(),
                    op: CompareKw::Lte,
                    literal: Literal::Date(self.today),
                },
            ),
        ];

        let negated = match entry.field_index {
            sysfield::AVAILABLE => {
                let Some(Value::Bool(available)) = entry.value.as_ref() else {
                    return Err(mismatch(op, field));
                };
                if op != Operator::Equal && op != Operator::NotEqual {
                    return Err(unsupported(op, field));
                }
                // available = true means: no open loan.
                *available == (op == Operator::Equal)
            }

            sysfield::LENT_BY => {
                if op != Operator::Equal {
                    return Err(unsupported(op, field));
                }
                let ids = ids_operand(field, op, entry.value.as_ref())?;
                open_loan.push((
                    Combinator::And,
                    SqlPredicate::InList {
                        column: LOAN_PERSON_COLUMN.to_string(),
                        values: ids.into_iter().map(Literal::Text).collect(),
                        negated: false,
                    },
                ));
                false
            }

            sysfield::LOAN_DURATION => {
                if op != Operator::GreaterThan && op != Operator::Equal {
                    return Err(unsupported(op, field));
                }
                let days = long_operand(field, op, entry.value.as_ref())?;
                let cutoff = days
                    .checked_neg()
                    .and_then(|d| shift_days(self.today, d))
                    .ok_or(QueryError::OperandOutOfRange(op))?;
                // Lent for at least `days`: the loan started that long ago.
                open_loan.pop();
                open_loan.push((
                    Combinator::And,
                    SqlPredicate::Compare {
                        column: LOAN_START_COLUMN.to_string(),
                        op: CompareKw::Lte,
                        literal: Literal::Date(cutoff),
                    },
                ));
                false
            }

            _ => return Err(unsupported(op, field)),
        };

        let mut subquery = SelectStmt::new(LOAN_TABLE);
        subquery
            .columns
            .push(SelectColumn::Column(LOAN_OBJECT_COLUMN.to_string()));
        subquery.predicate = Some(SqlPredicate::Chain(open_loan));

        Ok(SqlPredicate::InSubquery {
            column: member.pk().to_string(),
            negated,
            subquery: Box::new(subquery),
        })
    }

    /// Ordering for a concrete target: reference-valued order fields pull
    /// in a left outer join on the referenced module's display column;
    /// collection-valued fields order by their persistent mirror.
    fn select_order(
        &self,
        filter: &Filter,
        target: &Module,
    ) -> Result<(Vec<Join>, Vec<OrderTerm>), QueryError> {
        let mut joins = Vec::new();
        let mut terms = Vec::new();

        for (i, index) in filter.order_by.iter().enumerate() {
            let Some(field) = self.registry.field_of(target.id, *index) else {
                return Err(SchemaError::UnknownField {
                    module: target.id,
                    index: *index,
                }
                .into());
            };
            if field.ui_only {
                continue;
            }

            match field.value_type {
                ValueType::SingleReference | ValueType::ParentReference => {
                    let referenced = self.registry.get(field.referenced_module.ok_or(
                        QueryError::UnsupportedOrdering {
                            module: target.id,
                            index: *index,
                        },
                    )?)?;
                    let column = column_of(field)?;
                    let alias = format!("ref{i}");
                    joins.push(Join {
                        table: referenced.table.clone(),
                        alias: alias.clone(),
                        on_left: format!("{}.{}", target.table, column),
                        on_right: referenced.pk().to_string(),
                    });
                    let display = referenced.display_column().unwrap_or_else(|| referenced.pk());
                    terms.push(OrderTerm {
                        column: format!("{alias}.{display}"),
                        descending: filter.sort_descending,
                    });
                }

                ValueType::ReferenceCollection => {
                    terms.push(OrderTerm {
                        column: self.mirror_column(target, *index)?,
                        descending: filter.sort_descending,
                    });
                }

                _ => terms.push(OrderTerm {
                    column: column_of(field)?.to_string(),
                    descending: filter.sort_descending,
                }),
            }
        }

        Ok((joins, terms))
    }

    /// Ordering applied to the union's derived table: projected column
    /// names only. Reference-valued fields would need a per-member join on
    /// the referenced module's display column, which the derived table
    /// cannot express, so they are rejected rather than sorted by raw id.
    fn union_order(&self, filter: &Filter, target: &Module) -> Result<Vec<OrderTerm>, QueryError> {
        let mut terms = Vec::new();
        for index in &filter.order_by {
            let Some(field) = self.registry.field_of(target.id, *index) else {
                return Err(SchemaError::UnknownField {
                    module: target.id,
                    index: *index,
                }
                .into());
            };
            if field.ui_only {
                continue;
            }
            let column = match field.value_type {
                ValueType::ReferenceCollection => self.mirror_column(target, *index)?,
                ValueType::SingleReference | ValueType::ParentReference => {
                    return Err(QueryError::UnsupportedOrdering {
                        module: target.id,
                        index: *index,
                    });
                }
                _ => column_of(field)?.to_string(),
            };
            terms.push(OrderTerm {
                column,
                descending: filter.sort_descending,
            });
        }
        Ok(terms)
    }

    fn mirror_column(&self, target: &Module, index: i32) -> Result<String, QueryError> {
        self.registry
            .field_of(target.id, index + MIRROR_FIELD_OFFSET)
            .and_then(Field::sql_column)
            .map(ToString::to_string)
            .ok_or(QueryError::UnsupportedOrdering {
                module: target.id,
                index,
            })
    }
}

fn column_plan(target: &Module, has_module_column: bool) -> Vec<ColumnRef> {
    let mut columns = Vec::new();
    if has_module_column {
        columns.push(ColumnRef::ModuleId);
    }
    for field in target.fields.persistent() {
        columns.push(ColumnRef::Field {
            index: field.index,
            value_type: field.value_type,
        });
    }
    columns
}

// ---- operand extraction -------------------------------------------------

fn unsupported(operator: Operator, field: &Field) -> QueryError {
    QueryError::UnsupportedPredicate {
        operator,
        value_type: field.value_type,
    }
}

fn mismatch(operator: Operator, field: &Field) -> QueryError {
    QueryError::OperandMismatch {
        operator,
        value_type: field.value_type,
    }
}

fn junction_column(mapping: &Module, index: i32) -> Result<&str, QueryError> {
    mapping
        .fields
        .get(index)
        .and_then(Field::sql_column)
        .ok_or(QueryError::Schema(SchemaError::UnknownField {
            module: mapping.id,
            index,
        }))
}

fn column_of(field: &Field) -> Result<&str, QueryError> {
    field.sql_column().ok_or(QueryError::Schema(SchemaError::UnknownField {
        module: field.module,
        index: field.index,
    }))
}

fn text_operand(field: &Field, op: Operator, value: Option<&Value>) -> Result<String, QueryError> {
    match value {
        Some(Value::Text(s)) => Ok(s.clone()),
        Some(_) => Err(mismatch(op, field)),
        None => Err(QueryError::MissingOperand(op)),
    }
}

fn date_operand(field: &Field, op: Operator, value: Option<&Value>) -> Result<Date, QueryError> {
    match value {
        Some(Value::Date(d)) => Ok(*d),
        Some(Value::DateTime(dt)) => Ok(dt.date()),
        Some(_) => Err(mismatch(op, field)),
        None => Err(QueryError::MissingOperand(op)),
    }
}

fn long_operand(field: &Field, op: Operator, value: Option<&Value>) -> Result<i64, QueryError> {
    match value {
        Some(Value::Long(n)) => Ok(*n),
        Some(_) => Err(mismatch(op, field)),
        None => Err(QueryError::MissingOperand(op)),
    }
}

fn ids_operand(
    field: &Field,
    op: Operator,
    value: Option<&Value>,
) -> Result<Vec<String>, QueryError> {
    let ids: Vec<String> = match value {
        Some(v) => v
            .reference_ids()
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect(),
        None => return Err(QueryError::MissingOperand(op)),
    };
    if ids.is_empty() {
        return Err(mismatch(op, field));
    }
    Ok(ids)
}

fn id_list(
    column: &str,
    field: &Field,
    op: Operator,
    value: Option<&Value>,
    negated: bool,
) -> Result<SqlPredicate, QueryError> {
    let ids = ids_operand(field, op, value)?;
    Ok(SqlPredicate::InList {
        column: column.to_string(),
        values: ids.into_iter().map(Literal::Text).collect(),
        negated,
    })
}

fn like(
    column: &str,
    match_kind: MatchKind,
    field: &Field,
    op: Operator,
    value: Option<&Value>,
    negated: bool,
) -> Result<SqlPredicate, QueryError> {
    Ok(SqlPredicate::Like {
        column: column.to_string(),
        match_kind,
        text: text_operand(field, op, value)?,
        negated,
    })
}

fn numeric(
    column: &str,
    kw: CompareKw,
    field: &Field,
    op: Operator,
    value: Option<&Value>,
) -> Result<SqlPredicate, QueryError> {
    let literal = match value {
        Some(Value::Long(n)) => Literal::Long(*n),
        Some(Value::Big(n)) => Literal::Big(*n),
        Some(Value::Double(n)) => Literal::Double(*n),
        Some(_) => return Err(mismatch(op, field)),
        None => return Err(QueryError::MissingOperand(op)),
    };
    Ok(SqlPredicate::Compare {
        column: column.to_string(),
        op: kw,
        literal,
    })
}

// ---- calendar arithmetic ------------------------------------------------
//
// Counts come straight from filter operands, so every helper returns
// `None` when the result leaves the calendar range instead of panicking.

fn shift_days(date: Date, days: i64) -> Option<Date> {
    let julian = i64::from(date.to_julian_day()).checked_add(days)?;
    Date::from_julian_day(i32::try_from(julian).ok()?).ok()
}

/// The full calendar month `months` steps before `today`.
fn month_window(today: Date, months: i64) -> Option<(Date, Date)> {
    let total = (i64::from(today.year()) * 12 + i64::from(u8::from(today.month())) - 1)
        .checked_sub(months)?;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = Month::try_from(u8::try_from(total.rem_euclid(12) + 1).ok()?).ok()?;

    let first = Date::from_calendar_date(year, month, 1).ok()?;
    let last_day = time::util::days_in_year_month(year, month);
    let last = Date::from_calendar_date(year, month, last_day).ok()?;
    Some((first, last))
}

/// The full calendar year `years` steps before `today`.
fn year_window(today: Date, years: i64) -> Option<(Date, Date)> {
    let year = i32::try_from(i64::from(today.year()).checked_sub(years)?).ok()?;
    let first = Date::from_calendar_date(year, Month::January, 1).ok()?;
    let last = Date::from_calendar_date(year, Month::December, 31).ok()?;
    Some((first, last))
}

#[cfg(test)]
mod tests;
