use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use time::{
    Date, PrimitiveDateTime, Time, format_description::BorrowedFormatItem, macros::format_description,
};

/// Wire format for dates inside serialized filters.
pub const WIRE_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]/[month]/[day]");

/// Wire format for date-times inside serialized filters.
pub const WIRE_DATETIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]/[month]/[day] [hour]:[minute]:[second]");

/// Date format used in emitted SQL literals.
pub const SQL_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

///
/// ValueType
///
/// Closed enumeration of field value kinds. Drives the default operator
/// set, SQL literal quoting, and how a field is materialized (plain
/// column, foreign-key column, junction table, or picture table).
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[remain::sorted]
pub enum ValueType {
    BigInt,
    Boolean,
    Date,
    DateTime,
    Double,
    Icon,
    LongInt,
    ParentReference,
    Picture,
    ReferenceCollection,
    SingleReference,
    String,
}

///
/// StorageClass
///
/// Where a field's data physically lives relative to its module's table.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StorageClass {
    /// Ordinary column on the module's own table.
    PlainColumn,
    /// Column holding a referenced record id.
    ForeignKey,
    /// No column; rows live in a synthesized junction table.
    JunctionRouted,
    /// No column; blobs live in the shared picture table.
    PictureRouted,
}

impl ValueType {
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::String | Self::Icon)
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::LongInt | Self::BigInt | Self::Double)
    }

    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::DateTime)
    }

    #[must_use]
    pub const fn is_reference(self) -> bool {
        matches!(
            self,
            Self::SingleReference | Self::ReferenceCollection | Self::ParentReference
        )
    }

    #[must_use]
    pub const fn storage_class(self) -> StorageClass {
        match self {
            Self::SingleReference | Self::ParentReference => StorageClass::ForeignKey,
            Self::ReferenceCollection => StorageClass::JunctionRouted,
            Self::Picture => StorageClass::PictureRouted,
            _ => StorageClass::PlainColumn,
        }
    }

    /// Whether SQL literals of this type are single-quoted.
    #[must_use]
    pub const fn quotes_literal(self) -> bool {
        !matches!(self, Self::LongInt | Self::BigInt | Self::Double | Self::Boolean)
    }
}

///
/// RecordId
///
/// Opaque record identifier. Ids are strings on the wire and quoted in
/// generated SQL; the core never interprets their contents.
///

#[derive(
    Clone, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

///
/// ValueCoercionError
///
/// Stored text does not match the field's declared value type. Recoverable:
/// the owning filter entry is dropped, not the whole filter.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ValueCoercionError {
    #[error("'{text}' is not a valid {ty} value")]
    Invalid { ty: ValueType, text: String },

    #[error("{0} values cannot be coerced from text")]
    NotTextual(ValueType),
}

///
/// Value
///
/// Runtime value container mirroring `ValueType`. Filter entries, records,
/// and coercion all speak this type.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Value {
    Big(i128),
    Blob(Vec<u8>),
    Bool(bool),
    Date(Date),
    DateTime(PrimitiveDateTime),
    Double(f64),
    Long(i64),
    Reference(RecordId),
    References(Vec<RecordId>),
    Text(String),
}

impl Value {
    /// Coerce wire text into a typed value, dispatching on the field's
    /// declared type. Reference and collection values store comma-joined
    /// record ids, never display text.
    pub fn coerce(text: &str, ty: ValueType) -> Result<Self, ValueCoercionError> {
        let invalid = || ValueCoercionError::Invalid {
            ty,
            text: text.to_string(),
        };

        let value = match ty {
            ValueType::String | ValueType::Icon => Self::Text(text.to_string()),

            ValueType::LongInt => Self::Long(text.trim().parse().map_err(|_| invalid())?),
            ValueType::BigInt => Self::Big(text.trim().parse().map_err(|_| invalid())?),
            ValueType::Double => Self::Double(text.trim().parse().map_err(|_| invalid())?),

            ValueType::Boolean => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Self::Bool(true),
                "false" | "0" => Self::Bool(false),
                _ => return Err(invalid()),
            },

            ValueType::Date => {
                Self::Date(Date::parse(text.trim(), WIRE_DATE).map_err(|_| invalid())?)
            }

            // Date-only text is accepted for date-time fields; it coerces
            // to midnight.
            ValueType::DateTime => match PrimitiveDateTime::parse(text.trim(), WIRE_DATETIME) {
                Ok(dt) => Self::DateTime(dt),
                Err(_) => {
                    let date = Date::parse(text.trim(), WIRE_DATE).map_err(|_| invalid())?;
                    Self::DateTime(PrimitiveDateTime::new(date, Time::MIDNIGHT))
                }
            },

            ValueType::SingleReference | ValueType::ParentReference => {
                if text.is_empty() {
                    return Err(invalid());
                }
                Self::Reference(RecordId::from(text))
            }

            ValueType::ReferenceCollection => Self::References(
                text.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(RecordId::from)
                    .collect(),
            ),

            ValueType::Picture => return Err(ValueCoercionError::NotTextual(ty)),
        };

        Ok(value)
    }

    /// Render the value as wire text, the inverse of [`Self::coerce`].
    /// Blob values have no wire form and render empty.
    #[must_use]
    pub fn to_wire_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Long(n) => n.to_string(),
            Self::Big(n) => n.to_string(),
            Self::Double(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Date(d) => d.format(WIRE_DATE).unwrap_or_default(),
            Self::DateTime(dt) => dt.format(WIRE_DATETIME).unwrap_or_default(),
            Self::Reference(id) => id.as_str().to_string(),
            Self::References(ids) => ids
                .iter()
                .map(RecordId::as_str)
                .collect::<Vec<_>>()
                .join(","),
            Self::Blob(_) => String::new(),
        }
    }

    /// Record ids carried by a reference-valued entry, in order.
    #[must_use]
    pub fn reference_ids(&self) -> Vec<&RecordId> {
        match self {
            Self::Reference(id) => vec![id],
            Self::References(ids) => ids.iter().collect(),
            _ => Vec::new(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Long(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Date> for Value {
    fn from(d: Date) -> Self {
        Self::Date(d)
    }
}
