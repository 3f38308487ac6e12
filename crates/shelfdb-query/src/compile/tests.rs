use super::*;
use crate::{test_fixtures::*, trace::test_support::RecordingSink};
use time::macros::date;

const TODAY: Date = date!(2026 - 08 - 29);

fn entry(module: ModuleId, field: i32, operator: Operator, value: Option<Value>) -> FilterEntry {
    FilterEntry::new(Combinator::And, module, field, operator, value)
}

fn or_entry(module: ModuleId, field: i32, operator: Operator, value: Option<Value>) -> FilterEntry {
    FilterEntry::new(Combinator::Or, module, field, operator, value)
}

fn sql_of(filter: &Filter) -> String {
    let registry = catalog();
    QueryCompiler::new(&registry, TODAY)
        .compile(filter)
        .unwrap()
        .sql()
}

const MOVIE_COLUMNS: &str = "title, year, rating, watched, release, director, genres_mirror";

#[test]
fn contains_with_ordering_and_limit() {
    let filter = Filter::new(MOVIE)
        .with_entry(entry(
            MOVIE,
            TITLE,
            Operator::Contains,
            Some(Value::from("matrix")),
        ))
        .order_by(YEAR)
        .descending()
        .limit(50);

    assert_eq!(
        sql_of(&filter),
        format!(
            "SELECT {MOVIE_COLUMNS} FROM movie \
             WHERE UPPER(title) LIKE UPPER('%matrix%') \
             ORDER BY year DESC LIMIT 50"
        )
    );
}

#[test]
fn mixed_combinators_fold_flat_in_entry_order() {
    let filter = Filter::new(MOVIE)
        .with_entry(entry(
            MOVIE,
            TITLE,
            Operator::Contains,
            Some(Value::from("a")),
        ))
        .with_entry(or_entry(
            MOVIE,
            YEAR,
            Operator::GreaterThan,
            Some(Value::from(1999i64)),
        ));

    assert_eq!(
        sql_of(&filter),
        format!(
            "SELECT {MOVIE_COLUMNS} FROM movie \
             WHERE UPPER(title) LIKE UPPER('%a%') OR year > 1999"
        )
    );
}

#[test]
fn abstract_target_compiles_to_union_with_module_id_column() {
    let filter = Filter::new(MEDIA)
        .with_entry(entry(
            MEDIA,
            TITLE,
            Operator::StartsWith,
            Some(Value::from("the")),
        ))
        .order_by(TITLE);

    assert_eq!(
        sql_of(&filter),
        "SELECT * FROM (\
         SELECT 51 AS MODULEIDX, title, year FROM movie \
         WHERE UPPER(title) LIKE UPPER('the%') \
         UNION \
         SELECT 54 AS MODULEIDX, title, year FROM book \
         WHERE UPPER(title) LIKE UPPER('the%')\
         ) AS results ORDER BY title"
    );
}

#[test]
fn union_skips_disabled_members() {
    let mut builder = RegistryBuilder::new();
    builder
        .register_module(
            Module::new(MOVIE, ModuleKind::Media, "movie", "movie").with_fields(
                FieldList::from_iter([
                    Field::new(TITLE, MOVIE, "title", ValueType::String).with_column("title"),
                ]),
            ),
        )
        .unwrap();
    builder
        .register_module(
            Module::new(BOOK, ModuleKind::Media, "book", "book")
                .with_fields(FieldList::from_iter([
                    Field::new(TITLE, BOOK, "title", ValueType::String).with_column("title"),
                ]))
                .disabled(),
        )
        .unwrap();
    builder
        .register_module(
            Module::new(MEDIA, ModuleKind::Media, "media", "media")
                .with_fields(FieldList::from_iter([
                    Field::new(TITLE, MEDIA, "title", ValueType::String).with_column("title"),
                ]))
                .with_scope(AbstractScope::Kind(ModuleKind::Media)),
        )
        .unwrap();
    let registry = builder.build().unwrap();

    let sql = QueryCompiler::new(&registry, TODAY)
        .compile(&Filter::new(MEDIA))
        .unwrap()
        .sql();
    assert_eq!(sql, "SELECT 51 AS MODULEIDX, title FROM movie");
}

#[test]
fn abstract_target_without_members_selects_nothing() {
    let registry = catalog();
    let compiled = QueryCompiler::new(&registry, TODAY)
        .compile(&Filter::new(SHELF))
        .unwrap();

    assert_eq!(compiled.statement, Statement::Empty);
    assert_eq!(compiled.sql(), "SELECT NULL WHERE 1 = 0");
}

#[test]
fn collection_membership_routes_through_the_junction() {
    let filter = Filter::new(MOVIE).with_entry(entry(
        MOVIE,
        GENRES,
        Operator::Contains,
        Some(Value::References(vec!["3".into(), "7".into()])),
    ));

    assert_eq!(
        sql_of(&filter),
        format!(
            "SELECT {MOVIE_COLUMNS} FROM movie \
             WHERE ID IN (SELECT objectID FROM x_movie_genres \
             WHERE referencedID IN ('3', '7'))"
        )
    );
}

#[test]
fn empty_collection_tests_junction_existence() {
    let filter = Filter::new(MOVIE).with_entry(entry(MOVIE, GENRES, Operator::IsEmpty, None));

    assert_eq!(
        sql_of(&filter),
        format!(
            "SELECT {MOVIE_COLUMNS} FROM movie \
             WHERE ID NOT IN (SELECT objectID FROM x_movie_genres)"
        )
    );
}

#[test]
fn single_reference_compares_against_id_list() {
    let filter = Filter::new(MOVIE).with_entry(entry(
        MOVIE,
        DIRECTOR,
        Operator::NotEqual,
        Some(Value::Reference("p9".into())),
    ));

    assert_eq!(
        sql_of(&filter),
        format!("SELECT {MOVIE_COLUMNS} FROM movie WHERE director NOT IN ('p9')")
    );
}

#[test]
fn picture_presence_routes_through_the_picture_table() {
    let filter = Filter::new(MOVIE).with_entry(entry(MOVIE, COVER, Operator::IsFilled, None));

    assert_eq!(
        sql_of(&filter),
        format!(
            "SELECT {MOVIE_COLUMNS} FROM movie \
             WHERE ID IN (SELECT objectID FROM picture WHERE field = 'cover')"
        )
    );
}

#[test]
fn child_entries_become_a_parent_key_subquery() {
    let filter = Filter::new(ALBUM).with_entry(entry(
        TRACK,
        TITLE,
        Operator::Contains,
        Some(Value::from("love")),
    ));

    assert_eq!(
        sql_of(&filter),
        "SELECT title FROM album WHERE ID IN (\
         SELECT albumID FROM track WHERE UPPER(title) LIKE UPPER('%love%'))"
    );
}

#[test]
fn today_and_relative_date_windows() {
    let today = Filter::new(MOVIE).with_entry(entry(MOVIE, RELEASE, Operator::Today, None));
    assert!(sql_of(&today).ends_with("WHERE release = '2026-08-29'"));

    let last_week = Filter::new(MOVIE).with_entry(entry(
        MOVIE,
        RELEASE,
        Operator::DaysBefore,
        Some(Value::from(7i64)),
    ));
    assert!(
        sql_of(&last_week).ends_with("WHERE release >= '2026-08-22' AND release <= '2026-08-29'")
    );

    let last_month = Filter::new(MOVIE).with_entry(entry(
        MOVIE,
        RELEASE,
        Operator::MonthsAgo,
        Some(Value::from(1i64)),
    ));
    assert!(
        sql_of(&last_month).ends_with("WHERE release >= '2026-07-01' AND release <= '2026-07-31'")
    );

    let last_year = Filter::new(MOVIE).with_entry(entry(
        MOVIE,
        RELEASE,
        Operator::YearsAgo,
        Some(Value::from(1i64)),
    ));
    assert!(
        sql_of(&last_year).ends_with("WHERE release >= '2025-01-01' AND release <= '2025-12-31'")
    );
}

#[test]
fn month_window_crosses_year_boundaries() {
    let (low, high) = month_window(date!(2026 - 01 - 15), 2).unwrap();
    assert_eq!(low, date!(2025 - 11 - 01));
    assert_eq!(high, date!(2025 - 11 - 30));

    let (low, high) = month_window(date!(2024 - 03 - 31), 1).unwrap();
    assert_eq!(low, date!(2024 - 02 - 01));
    assert_eq!(high, date!(2024 - 02 - 29));
}

#[test]
fn relative_date_counts_beyond_the_calendar_are_rejected() {
    let registry = catalog();
    let compiler = QueryCompiler::new(&registry, TODAY);

    for op in [
        Operator::DaysBefore,
        Operator::DaysAfter,
        Operator::MonthsAgo,
        Operator::YearsAgo,
    ] {
        for count in [i64::MAX, i64::MIN] {
            let filter =
                Filter::new(MOVIE).with_entry(entry(MOVIE, RELEASE, op, Some(Value::from(count))));
            assert_eq!(
                compiler.compile(&filter),
                Err(QueryError::OperandOutOfRange(op)),
                "{op:?} with count {count}"
            );
        }
    }

    let lent_forever = Filter::new(MOVIE).with_entry(entry(
        MOVIE,
        sysfield::LOAN_DURATION,
        Operator::GreaterThan,
        Some(Value::from(i64::MIN)),
    ));
    assert_eq!(
        compiler.compile(&lent_forever),
        Err(QueryError::OperandOutOfRange(Operator::GreaterThan))
    );
}

#[test]
fn availability_checks_the_loan_ledger() {
    let filter = Filter::new(MOVIE).with_entry(entry(
        MOVIE,
        sysfield::AVAILABLE,
        Operator::Equal,
        Some(Value::from(true)),
    ));

    assert_eq!(
        sql_of(&filter),
        format!(
            "SELECT {MOVIE_COLUMNS} FROM movie \
             WHERE ID NOT IN (SELECT objectID FROM loans \
             WHERE enddate IS NULL AND startdate <= '2026-08-29')"
        )
    );
}

#[test]
fn lent_by_narrows_open_loans_to_the_borrower() {
    let filter = Filter::new(MOVIE).with_entry(entry(
        MOVIE,
        sysfield::LENT_BY,
        Operator::Equal,
        Some(Value::Reference("p1".into())),
    ));

    assert_eq!(
        sql_of(&filter),
        format!(
            "SELECT {MOVIE_COLUMNS} FROM movie \
             WHERE ID IN (SELECT objectID FROM loans \
             WHERE enddate IS NULL AND startdate <= '2026-08-29' \
             AND personID IN ('p1'))"
        )
    );
}

#[test]
fn loan_duration_shifts_the_start_cutoff() {
    let filter = Filter::new(MOVIE).with_entry(entry(
        MOVIE,
        sysfield::LOAN_DURATION,
        Operator::GreaterThan,
        Some(Value::from(30i64)),
    ));

    assert_eq!(
        sql_of(&filter),
        format!(
            "SELECT {MOVIE_COLUMNS} FROM movie \
             WHERE ID IN (SELECT objectID FROM loans \
             WHERE enddate IS NULL AND startdate <= '2026-07-30')"
        )
    );
}

#[test]
fn reference_ordering_joins_on_the_display_column() {
    let filter = Filter::new(MOVIE).order_by(DIRECTOR);

    assert_eq!(
        sql_of(&filter),
        format!(
            "SELECT {MOVIE_COLUMNS} FROM movie \
             LEFT OUTER JOIN person ref0 ON movie.director = ref0.ID \
             ORDER BY ref0.name"
        )
    );
}

#[test]
fn collection_ordering_uses_the_mirror_column() {
    let filter = Filter::new(MOVIE).order_by(GENRES);

    assert_eq!(
        sql_of(&filter),
        format!("SELECT {MOVIE_COLUMNS} FROM movie ORDER BY genres_mirror")
    );
}

#[test]
fn union_ordering_by_a_reference_field_is_rejected() {
    let mut builder = RegistryBuilder::new();
    builder
        .register_module(
            Module::new(MOVIE, ModuleKind::Media, "movie", "movie").with_fields(
                FieldList::from_iter([
                    Field::new(TITLE, MOVIE, "title", ValueType::String).with_column("title"),
                    Field::new(DIRECTOR, MOVIE, "director", ValueType::SingleReference)
                        .with_column("director")
                        .with_reference(PERSON),
                ]),
            ),
        )
        .unwrap();
    builder
        .register_module(
            Module::new(MEDIA, ModuleKind::Media, "media", "media")
                .with_fields(FieldList::from_iter([
                    Field::new(TITLE, MEDIA, "title", ValueType::String).with_column("title"),
                    Field::new(DIRECTOR, MEDIA, "director", ValueType::SingleReference)
                        .with_column("director")
                        .with_reference(PERSON),
                ]))
                .with_scope(AbstractScope::Kind(ModuleKind::Media)),
        )
        .unwrap();
    let registry = builder.build().unwrap();

    // The derived table cannot carry the per-member display-column join.
    assert_eq!(
        QueryCompiler::new(&registry, TODAY).compile(&Filter::new(MEDIA).order_by(DIRECTOR)),
        Err(QueryError::UnsupportedOrdering {
            module: MEDIA,
            index: DIRECTOR,
        })
    );
}

#[test]
fn ui_only_order_fields_are_skipped() {
    let filter = Filter::new(MOVIE).order_by(sysfield::AVAILABLE).order_by(TITLE);

    assert_eq!(
        sql_of(&filter),
        format!("SELECT {MOVIE_COLUMNS} FROM movie ORDER BY title")
    );
}

#[test]
fn column_plan_tracks_the_projection() {
    let registry = catalog();
    let compiler = QueryCompiler::new(&registry, TODAY);

    let concrete = compiler.compile(&Filter::new(MOVIE)).unwrap();
    assert_eq!(concrete.columns.len(), 7);
    assert_eq!(
        concrete.columns[0],
        ColumnRef::Field {
            index: TITLE,
            value_type: ValueType::String,
        }
    );

    let union = compiler.compile(&Filter::new(MEDIA)).unwrap();
    assert_eq!(union.columns[0], ColumnRef::ModuleId);
    assert_eq!(
        union.columns[1],
        ColumnRef::Field {
            index: TITLE,
            value_type: ValueType::String,
        }
    );
}

#[test]
fn missing_operand_is_rejected() {
    let registry = catalog();
    let filter = Filter::new(MOVIE).with_entry(entry(MOVIE, TITLE, Operator::Contains, None));

    assert_eq!(
        QueryCompiler::new(&registry, TODAY).compile(&filter),
        Err(QueryError::MissingOperand(Operator::Contains))
    );
}

#[test]
fn type_incompatible_operator_is_rejected() {
    let registry = catalog();
    let filter = Filter::new(MOVIE).with_entry(entry(
        MOVIE,
        YEAR,
        Operator::StartsWith,
        Some(Value::from("19")),
    ));

    assert_eq!(
        QueryCompiler::new(&registry, TODAY).compile(&filter),
        Err(QueryError::UnsupportedPredicate {
            operator: Operator::StartsWith,
            value_type: ValueType::LongInt,
        })
    );
}

#[test]
fn unknown_field_surfaces_a_schema_error() {
    let registry = catalog();
    let filter = Filter::new(MOVIE).with_entry(entry(
        MOVIE,
        999,
        Operator::Equal,
        Some(Value::from("x")),
    ));

    assert_eq!(
        QueryCompiler::new(&registry, TODAY).compile(&filter),
        Err(QueryError::Schema(SchemaError::UnknownField {
            module: MOVIE,
            index: 999,
        }))
    );
}

#[test]
fn trace_records_union_expansion_and_child_recursion() {
    let registry = catalog();
    let sink = RecordingSink::default();
    let compiler = QueryCompiler::new(&registry, TODAY).with_trace(&sink);

    compiler.compile(&Filter::new(MEDIA)).unwrap();
    compiler
        .compile(&Filter::new(ALBUM).with_entry(entry(
            TRACK,
            TITLE,
            Operator::Contains,
            Some(Value::from("love")),
        )))
        .unwrap();

    let events = sink.events.lock().unwrap();
    assert!(events.contains(&QueryTraceEvent::UnionExpanded {
        target: MEDIA,
        members: 2,
    }));
    assert!(events.contains(&QueryTraceEvent::ChildFilter {
        parent: ALBUM,
        child: TRACK,
        entries: 1,
    }));
    assert!(events.contains(&QueryTraceEvent::Finish { target: ALBUM }));
}
