//! Full path through the public surface: JSON schema configuration into a
//! sealed registry, a saved filter off the wire, compilation to SQL, and
//! row materialization through a stub executor.

use shelfdb::prelude::*;
use time::macros::date;

const CATALOG: &str = r#"{
    "property_templates": [
        {
            "id": 70, "name": "genre", "kind": "Property",
            "top_level": false, "display_field": 1,
            "fields": [
                { "index": 1, "name": "name", "value_type": "String", "column": "name" }
            ]
        }
    ],
    "modules": [
        {
            "id": 50, "name": "media", "kind": "Media",
            "abstract_scope": { "Kind": "Media" },
            "fields": [
                { "index": 1, "name": "title", "value_type": "String", "column": "title" },
                { "index": 2, "name": "year", "value_type": "LongInt", "column": "year" }
            ]
        },
        {
            "id": 51, "name": "movie", "kind": "Media",
            "display_field": 1,
            "fields": [
                { "index": 1, "name": "title", "value_type": "String", "column": "title" },
                { "index": 2, "name": "year", "value_type": "LongInt", "column": "year" },
                { "index": 3, "name": "genres", "value_type": "ReferenceCollection",
                  "referenced_module": 70 }
            ]
        },
        {
            "id": 54, "name": "book", "kind": "Media",
            "display_field": 1,
            "fields": [
                { "index": 1, "name": "title", "value_type": "String", "column": "title" },
                { "index": 2, "name": "year", "value_type": "LongInt", "column": "year" }
            ]
        }
    ]
}"#;

const SAVED_FILTER: &str = "<FILTER>\n\
    <NAME>nineties on the shelf</NAME>\n\
    <MODULE>50</MODULE>\n\
    <SORTORDER>0</SORTORDER>\n\
    <ENTRIES>\n\
    <ENTRY><ANDOR>AND</ANDOR><MODULE>50</MODULE><FIELD>2</FIELD>\
    <OPERATOR>10</OPERATOR><VALUE>1989</VALUE></ENTRY>\n\
    <ENTRY><ANDOR>AND</ANDOR><MODULE>50</MODULE><FIELD>203</FIELD>\
    <OPERATOR>1</OPERATOR><VALUE>true</VALUE></ENTRY>\n\
    </ENTRIES>\n\
    <ORDER><FIELD>1</FIELD></ORDER>\n\
    </FILTER>";

struct CannedRows(RowSet);

impl PersistenceExecutor for CannedRows {
    fn execute(&self, _query: &str) -> Result<RowSet, ExecutorError> {
        Ok(self.0.clone())
    }
}

#[test]
fn saved_filter_compiles_and_materializes() {
    let registry = SchemaConfig::from_json(CATALOG)
        .expect("config parses")
        .build()
        .expect("registry builds");

    let outcome = shelfdb::query::wire::parse(SAVED_FILTER, &registry).expect("filter parses");
    assert!(outcome.dropped.is_empty());
    assert_eq!(outcome.filter.name, "nineties on the shelf");

    let compiled = QueryCompiler::new(&registry, date!(2026 - 08 - 29))
        .compile(&outcome.filter)
        .expect("filter compiles");

    assert_eq!(
        compiled.sql(),
        "SELECT * FROM (\
         SELECT 51 AS MODULEIDX, title, year FROM movie \
         WHERE year > 1989 AND ID NOT IN (SELECT objectID FROM loans \
         WHERE enddate IS NULL AND startdate <= '2026-08-29') \
         UNION \
         SELECT 54 AS MODULEIDX, title, year FROM book \
         WHERE year > 1989 AND ID NOT IN (SELECT objectID FROM loans \
         WHERE enddate IS NULL AND startdate <= '2026-08-29')\
         ) AS results ORDER BY title"
    );

    let executor = CannedRows(RowSet {
        rows: vec![vec![
            Some("54".to_string()),
            Some("Snow Crash".to_string()),
            Some("1992".to_string()),
        ]],
    });
    let rows = executor.execute(&compiled.sql()).expect("rows come back");

    let record = materialize(&compiled.columns, &rows.rows[0], ModuleId::new(50));
    assert_eq!(record.module(), ModuleId::new(54));
    assert_eq!(record.value(1), Some(&Value::Text("Snow Crash".to_string())));
    assert_eq!(record.value(2), Some(&Value::Long(1992)));
}

#[test]
fn round_trip_survives_reserialization() {
    let registry = SchemaConfig::from_json(CATALOG).unwrap().build().unwrap();

    let first = shelfdb::query::wire::parse(SAVED_FILTER, &registry).unwrap();
    let second =
        shelfdb::query::wire::parse(&shelfdb::query::wire::serialize(&first.filter), &registry)
            .unwrap();

    assert_eq!(second.filter, first.filter);
}

#[test]
fn schema_errors_surface_through_the_public_taxonomy() {
    let registry = SchemaConfig::from_json(CATALOG).unwrap().build().unwrap();

    let missing = Filter::new(ModuleId::new(51)).order_by(999);
    let err: Error = QueryCompiler::new(&registry, date!(2026 - 08 - 29))
        .compile(&missing)
        .unwrap_err()
        .into();

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.origin, ErrorOrigin::Registry);
    assert!(!err.is_recoverable());
}
