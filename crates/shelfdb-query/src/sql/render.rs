use crate::sql::ast::{
    CompareKw, Join, Literal, MatchKind, OrderTerm, SelectColumn, SelectStmt, SqlPredicate,
    Statement, UnionStmt,
};
use shelfdb_schema::value::SQL_DATE;

/// Render a compiled statement to query text.
#[must_use]
pub fn render(statement: &Statement) -> String {
    match statement {
        Statement::Select(select) => render_select(select),
        Statement::Union(union) => render_union(union),
        Statement::Empty => "SELECT NULL WHERE 1 = 0".to_string(),
    }
}

fn render_select(stmt: &SelectStmt) -> String {
    let mut sql = String::from("SELECT ");

    let columns: Vec<String> = stmt.columns.iter().map(render_column).collect();
    sql.push_str(&columns.join(", "));

    sql.push_str(" FROM ");
    sql.push_str(&stmt.from);

    for join in &stmt.joins {
        sql.push_str(&render_join(join));
    }

    if let Some(predicate) = &stmt.predicate {
        sql.push_str(" WHERE ");
        sql.push_str(&render_predicate(predicate));
    }

    if !stmt.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&render_order(&stmt.order_by));
    }

    if let Some(limit) = stmt.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    sql
}

fn render_union(stmt: &UnionStmt) -> String {
    let selects: Vec<String> = stmt.selects.iter().map(render_select).collect();
    let body = selects.join(" UNION ");

    if stmt.order_by.is_empty() && stmt.limit.is_none() {
        return body;
    }

    // The final ORDER BY needs a derived table around the union.
    let mut sql = format!("SELECT * FROM ({body}) AS results");
    if !stmt.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&render_order(&stmt.order_by));
    }
    if let Some(limit) = stmt.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    sql
}

fn render_column(column: &SelectColumn) -> String {
    match column {
        SelectColumn::Column(name) => name.clone(),
        SelectColumn::IntLiteral { value, alias } => format!("{value} AS {alias}"),
    }
}

fn render_join(join: &Join) -> String {
    format!(
        " LEFT OUTER JOIN {} {} ON {} = {}.{}",
        join.table, join.alias, join.on_left, join.alias, join.on_right
    )
}

fn render_order(terms: &[OrderTerm]) -> String {
    terms
        .iter()
        .map(|t| {
            if t.descending {
                format!("{} DESC", t.column)
            } else {
                t.column.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_predicate(predicate: &SqlPredicate) -> String {
    match predicate {
        // Legacy flat fold: no parenthesization, left-to-right.
        SqlPredicate::Chain(terms) => {
            let mut sql = String::new();
            for (i, (combinator, term)) in terms.iter().enumerate() {
                if i > 0 {
                    sql.push(' ');
                    sql.push_str(combinator.wire());
                    sql.push(' ');
                }
                sql.push_str(&render_predicate(term));
            }
            sql
        }

        SqlPredicate::Compare {
            column,
            op,
            literal,
        } => format!("{column} {} {}", op.sql(), render_literal(literal)),

        SqlPredicate::CompareUpper {
            column,
            negated,
            text,
        } => {
            let op = if *negated { "<>" } else { "=" };
            format!("UPPER({column}) {op} UPPER('{}')", escape_text(text))
        }

        SqlPredicate::Like {
            column,
            match_kind,
            text,
            negated,
        } => {
            let escaped = escape_like(text);
            let pattern = match match_kind {
                MatchKind::Contains => format!("%{escaped}%"),
                MatchKind::StartsWith => format!("{escaped}%"),
                MatchKind::EndsWith => format!("%{escaped}"),
            };
            let not = if *negated { "NOT " } else { "" };
            format!("UPPER({column}) {not}LIKE UPPER('{pattern}')")
        }

        SqlPredicate::InList {
            column,
            values,
            negated,
        } => {
            let list: Vec<String> = values.iter().map(render_literal).collect();
            let not = if *negated { "NOT " } else { "" };
            format!("{column} {not}IN ({})", list.join(", "))
        }

        SqlPredicate::InSubquery {
            column,
            negated,
            subquery,
        } => {
            let not = if *negated { "NOT " } else { "" };
            format!("{column} {not}IN ({})", render_select(subquery))
        }

        SqlPredicate::IsNull { column, negated } => {
            if *negated {
                format!("{column} IS NOT NULL")
            } else {
                format!("{column} IS NULL")
            }
        }

        SqlPredicate::NullOrEmpty { column, negated } => {
            if *negated {
                format!("({column} IS NOT NULL AND {column} <> '')")
            } else {
                format!("({column} IS NULL OR {column} = '')")
            }
        }

        SqlPredicate::Between { column, low, high } => format!(
            "{column} >= {} AND {column} <= {}",
            render_literal(low),
            render_literal(high)
        ),
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Text(s) => format!("'{}'", escape_text(s)),
        Literal::Long(n) => n.to_string(),
        Literal::Big(n) => n.to_string(),
        Literal::Double(n) => n.to_string(),
        Literal::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Literal::Date(d) => format!("'{}'", d.format(SQL_DATE).unwrap_or_default()),
    }
}

/// Double embedded quotes.
fn escape_text(text: &str) -> String {
    text.replace('\'', "''")
}

/// Escape quotes plus the LIKE metacharacters.
fn escape_like(text: &str) -> String {
    escape_text(text).replace('%', "\\%").replace('_', "\\_")
}
