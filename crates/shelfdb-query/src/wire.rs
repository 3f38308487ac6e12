//! Legacy tagged-text filter format.
//!
//! The format is a compatibility contract: operators serialize as their
//! integer tag, dates as `yyyy/MM/dd`, reference values as comma-joined
//! record ids. Parsing coerces each entry's value against the operand type
//! the operator expects for the field's declared type (relative-date
//! operators take an integer count), never against the textual shape.

use crate::filter::{Combinator, Filter, FilterEntry, Operator};
use shelfdb_schema::prelude::*;
use std::fmt::Write as _;
use thiserror::Error as ThisError;

///
/// FilterParseError
///
/// Malformed serialized filter. Recoverable: the caller discards the
/// saved filter and continues.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum FilterParseError {
    #[error("missing <{0}> section")]
    MissingSection(&'static str),

    #[error("malformed <{tag}> value '{text}'")]
    Malformed { tag: &'static str, text: String },

    #[error("unknown target module {0}")]
    UnknownModule(ModuleId),
}

///
/// DropReason
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum DropReason {
    #[error("operator requires an operand")]
    MissingOperand,

    #[error("field is not defined on the module")]
    UnknownField,

    #[error(transparent)]
    Coercion(ValueCoercionError),
}

///
/// DroppedEntry
///
/// Diagnostic for one entry discarded during parsing. Coercion failures
/// drop the entry, not the filter.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DroppedEntry {
    pub position: usize,
    pub module: ModuleId,
    pub field_index: i32,
    pub reason: DropReason,
}

///
/// ParseOutcome
///

#[derive(Clone, Debug, PartialEq)]
pub struct ParseOutcome {
    pub filter: Filter,
    pub dropped: Vec<DroppedEntry>,
}

/// Serialize a filter to the tagged text form.
#[must_use]
pub fn serialize(filter: &Filter) -> String {
    let mut out = String::from("<FILTER>\n");

    let _ = writeln!(out, "<NAME>{}</NAME>", escape(&filter.name));
    let _ = writeln!(out, "<MODULE>{}</MODULE>", filter.target_module.raw());
    let _ = writeln!(
        out,
        "<SORTORDER>{}</SORTORDER>",
        u8::from(filter.sort_descending)
    );
    if let Some(limit) = filter.row_limit {
        let _ = writeln!(out, "<LIMIT>{limit}</LIMIT>");
    }

    out.push_str("<ENTRIES>\n");
    for entry in &filter.entries {
        let _ = write!(
            out,
            "<ENTRY><ANDOR>{}</ANDOR><MODULE>{}</MODULE><FIELD>{}</FIELD><OPERATOR>{}</OPERATOR>",
            entry.combinator.wire(),
            entry.module.raw(),
            entry.field_index,
            entry.operator.tag(),
        );
        if let Some(value) = &entry.value {
            let _ = write!(out, "<VALUE>{}</VALUE>", escape(&value.to_wire_text()));
        }
        out.push_str("</ENTRY>\n");
    }
    out.push_str("</ENTRIES>\n");

    if !filter.order_by.is_empty() {
        out.push_str("<ORDER>");
        for index in &filter.order_by {
            let _ = write!(out, "<FIELD>{index}</FIELD>");
        }
        out.push_str("</ORDER>\n");
    }

    out.push_str("</FILTER>");
    out
}

/// Parse the tagged text form, coercing entry values against the
/// registry's field types. Entries whose value cannot be coerced are
/// dropped and reported, not fatal.
pub fn parse(text: &str, registry: &ModuleRegistry) -> Result<ParseOutcome, FilterParseError> {
    let body = section(text, "FILTER").ok_or(FilterParseError::MissingSection("FILTER"))?;

    // The filter-level tags live before <ENTRIES>; entries carry their
    // own <MODULE> and <FIELD> tags.
    let header = body.find("<ENTRIES>").map_or(body, |at| &body[..at]);

    let target = ModuleId::new(parse_i32(
        "MODULE",
        section(header, "MODULE").ok_or(FilterParseError::MissingSection("MODULE"))?,
    )?);
    if registry.module(target).is_none() {
        return Err(FilterParseError::UnknownModule(target));
    }

    let mut filter = Filter::new(target);
    filter.name = section(header, "NAME").map(unescape).unwrap_or_default();
    filter.sort_descending = section(header, "SORTORDER").is_some_and(|s| s.trim() == "1");
    if let Some(limit) = section(header, "LIMIT") {
        filter.row_limit = Some(
            limit
                .trim()
                .parse()
                .map_err(|_| FilterParseError::Malformed {
                    tag: "LIMIT",
                    text: limit.to_string(),
                })?,
        );
    }

    let mut dropped = Vec::new();
    if let Some(entries) = section(body, "ENTRIES") {
        for (position, block) in sections(entries, "ENTRY").enumerate() {
            match parse_entry(block, registry)? {
                Ok(entry) => filter.entries.push(entry),
                Err(diag) => dropped.push(DroppedEntry { position, ..diag }),
            }
        }
    }

    if let Some(order) = section(body, "ORDER") {
        for field in sections(order, "FIELD") {
            filter.order_by.push(parse_i32("FIELD", field)?);
        }
    }

    Ok(ParseOutcome { filter, dropped })
}

/// One entry block. The outer `Result` is a structural parse failure;
/// the inner one is a droppable per-entry diagnostic.
fn parse_entry(
    block: &str,
    registry: &ModuleRegistry,
) -> Result<Result<FilterEntry, DroppedEntry>, FilterParseError> {
    let combinator = section(block, "ANDOR")
        .and_then(|s| Combinator::from_wire(s.trim()))
        .ok_or(FilterParseError::MissingSection("ANDOR"))?;
    let module = ModuleId::new(parse_i32(
        "MODULE",
        section(block, "MODULE").ok_or(FilterParseError::MissingSection("MODULE"))?,
    )?);
    let field_index = parse_i32(
        "FIELD",
        section(block, "FIELD").ok_or(FilterParseError::MissingSection("FIELD"))?,
    )?;
    let operator_text =
        section(block, "OPERATOR").ok_or(FilterParseError::MissingSection("OPERATOR"))?;
    let operator = operator_text
        .trim()
        .parse::<u8>()
        .ok()
        .and_then(Operator::from_tag)
        .ok_or_else(|| FilterParseError::Malformed {
            tag: "OPERATOR",
            text: operator_text.to_string(),
        })?;

    let drop = |reason| DroppedEntry {
        position: 0,
        module,
        field_index,
        reason,
    };

    let value = if operator.needs_operand() {
        let Some(text) = section(block, "VALUE").map(unescape) else {
            return Ok(Err(drop(DropReason::MissingOperand)));
        };
        let Some(field) = registry.field_of(module, field_index) else {
            return Ok(Err(drop(DropReason::UnknownField)));
        };
        // Relative-date operators carry a count, not a date.
        match Value::coerce(&text, operator.operand_type(field.value_type)) {
            Ok(value) => Some(value),
            Err(e) => return Ok(Err(drop(DropReason::Coercion(e)))),
        }
    } else {
        None
    };

    Ok(Ok(FilterEntry::new(
        combinator,
        module,
        field_index,
        operator,
        value,
    )))
}

fn parse_i32(tag: &'static str, text: &str) -> Result<i32, FilterParseError> {
    text.trim().parse().map_err(|_| FilterParseError::Malformed {
        tag,
        text: text.to_string(),
    })
}

/// Content of the first `<TAG>...</TAG>` pair.
fn section<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = text.find(&open)? + open.len();
    let end = start + text[start..].find(&close)?;
    Some(&text[start..end])
}

/// Contents of every `<TAG>...</TAG>` pair, in order.
fn sections<'a>(text: &'a str, tag: &str) -> impl Iterator<Item = &'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut rest = text;

    std::iter::from_fn(move || {
        let start = rest.find(&open)? + open.len();
        let end = start + rest[start..].find(&close)?;
        let inner = &rest[start..end];
        rest = &rest[end + close.len()..];
        Some(inner)
    })
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
