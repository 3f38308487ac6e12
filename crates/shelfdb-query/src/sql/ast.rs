use crate::filter::Combinator;
use time::Date;

///
/// SQL statement model
///
/// Structural representation of compiled queries: select list, predicate
/// tree, join list, order-by list. No execution or storage semantics; the
/// single renderer in `sql::render` is the only lowering site.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Select(SelectStmt),
    /// `UNION` (not `UNION ALL`) of per-member selects, wrapped in a
    /// derived table for the final ORDER BY. Cross-member duplicates fold;
    /// this mirrors the legacy engine and is preserved deliberately.
    Union(UnionStmt),
    /// An abstract target with no enabled members compiles to a query
    /// that selects nothing rather than an error.
    Empty,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnionStmt {
    pub selects: Vec<SelectStmt>,
    pub order_by: Vec<OrderTerm>,
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectStmt {
    pub columns: Vec<SelectColumn>,
    pub from: String,
    pub joins: Vec<Join>,
    pub predicate: Option<SqlPredicate>,
    pub order_by: Vec<OrderTerm>,
    pub limit: Option<u32>,
}

impl SelectStmt {
    #[must_use]
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            from: from.into(),
            joins: Vec::new(),
            predicate: None,
            order_by: Vec::new(),
            limit: None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SelectColumn {
    Column(String),
    /// Injected literal disambiguating union rows, e.g. `51 AS MODULEIDX`.
    IntLiteral { value: i32, alias: &'static str },
}

///
/// Join
///
/// Left outer join used for reference-valued ordering.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Join {
    pub table: String,
    pub alias: String,
    /// Qualified column on the base table.
    pub on_left: String,
    /// Column on the joined table (unqualified; rendered with the alias).
    pub on_right: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderTerm {
    pub column: String,
    pub descending: bool,
}

///
/// SqlPredicate
///
/// Predicate tree. `Chain` reproduces the legacy flat AND/OR fold: terms
/// render left-to-right with no parenthesization, so entry order changes
/// semantics for mixed chains.
///

#[derive(Clone, Debug, PartialEq)]
pub enum SqlPredicate {
    /// First term's combinator is ignored at render time.
    Chain(Vec<(Combinator, SqlPredicate)>),

    Compare {
        column: String,
        op: CompareKw,
        literal: Literal,
    },

    /// Case-insensitive string comparison: `UPPER(col) = UPPER('x')`.
    CompareUpper {
        column: String,
        negated: bool,
        text: String,
    },

    /// `[UPPER(]col[)] LIKE 'pattern'`; pattern is raw match text, the
    /// renderer escapes and wraps it.
    Like {
        column: String,
        match_kind: MatchKind,
        text: String,
        negated: bool,
    },

    InList {
        column: String,
        values: Vec<Literal>,
        negated: bool,
    },

    InSubquery {
        column: String,
        negated: bool,
        subquery: Box<SelectStmt>,
    },

    IsNull {
        column: String,
        negated: bool,
    },

    /// String emptiness: `(col IS NULL OR col = '')`.
    NullOrEmpty {
        column: String,
        negated: bool,
    },

    /// Inclusive range, rendered as two chained comparisons.
    Between {
        column: String,
        low: Literal,
        high: Literal,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchKind {
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareKw {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareKw {
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

///
/// Literal
///
/// Typed SQL literal; quoting and escaping are the renderer's concern.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Text(String),
    Long(i64),
    Big(i128),
    Double(f64),
    Bool(bool),
    Date(Date),
}
