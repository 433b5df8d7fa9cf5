use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sqlx::{ColumnIndex, Row, any::AnyRow};

use crate::error::{Error, Result};

/// A single scalar crossing the engine boundary, either as a bound parameter or as a
/// selected column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

/// The storage class a selected expression is decoded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Real,
    Text,
    Bool,
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Read the column at `index` from a row, interpreting it as `kind`. SQL `NULL` always
    /// decodes to [`Value::Null`].
    ///
    /// # Errors
    ///
    /// If the column does not exist or holds a value incompatible with `kind`.
    pub fn decode<I>(row: &AnyRow, index: I, kind: ValueKind) -> Result<Self, sqlx::Error>
    where
        I: ColumnIndex<AnyRow>,
    {
        let value = match kind {
            ValueKind::Int => row.try_get::<Option<i64>, _>(index)?.map(Self::Int),
            ValueKind::Real => row.try_get::<Option<f64>, _>(index)?.map(Self::Real),
            ValueKind::Text => row.try_get::<Option<String>, _>(index)?.map(Self::Text),
            ValueKind::Bool => row.try_get::<Option<bool>, _>(index)?.map(Self::Bool),
        };

        Ok(value.unwrap_or(Self::Null))
    }

    /// Key used by the identity map. Distinguishes `Int(1)` from `Text("1")`.
    pub(crate) fn identity_key(&self) -> String {
        format!("{self:?}")
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Int(e) => write!(f, "{e}"),
            Self::Real(e) => write!(f, "{e}"),
            Self::Text(e) => write!(f, "'{e}'"),
            Self::Bool(e) => write!(f, "{e}"),
        }
    }
}

/// A rust type that can be stored in a column, bound as a parameter and read back.
pub trait ColumnType: Clone + Send + Sync + Sized + 'static {
    /// `Self` decoded from a column that may hold `NULL`, e.g. an aggregate over no rows.
    type Nullable: ColumnType;

    const KIND: ValueKind;

    fn into_value(self) -> Value;

    /// # Errors
    ///
    /// [`Error::ProjectionBinding`] if `value` cannot be represented as `Self`.
    fn from_value(value: Value) -> Result<Self>;

    /// # Errors
    ///
    /// If the column is missing, or its content cannot be represented as `Self`.
    fn from_row<I>(row: &AnyRow, index: I) -> Result<Self>
    where
        I: ColumnIndex<AnyRow>,
    {
        Self::from_value(Value::decode(row, index, Self::KIND)?)
    }
}

fn mismatch<T>(expected: &str, found: &Value) -> Result<T> {
    Err(Error::binding(format!("expected {expected}, found {found:?}")))
}

impl ColumnType for i64 {
    type Nullable = Option<Self>;

    const KIND: ValueKind = ValueKind::Int;

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(e) => Ok(e),
            other => mismatch("an integer", &other),
        }
    }
}

impl ColumnType for i32 {
    type Nullable = Option<Self>;

    const KIND: ValueKind = ValueKind::Int;

    fn into_value(self) -> Value {
        Value::Int(self.into())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(e) => {
                Self::try_from(e).map_err(|_| Error::binding(format!("{e} does not fit into i32")))
            }
            other => mismatch("an integer", &other),
        }
    }
}

impl ColumnType for f64 {
    type Nullable = Option<Self>;

    const KIND: ValueKind = ValueKind::Real;

    fn into_value(self) -> Value {
        Value::Real(self)
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Real(e) => Ok(e),
            Value::Int(e) => Ok(e as Self),
            other => mismatch("a real number", &other),
        }
    }
}

impl ColumnType for bool {
    type Nullable = Option<Self>;

    const KIND: ValueKind = ValueKind::Bool;

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(e) => Ok(e),
            Value::Int(e) => Ok(e != 0),
            other => mismatch("a boolean", &other),
        }
    }
}

impl ColumnType for String {
    type Nullable = Option<Self>;

    const KIND: ValueKind = ValueKind::Text;

    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(e) => Ok(e),
            other => mismatch("text", &other),
        }
    }
}

impl<T> ColumnType for Option<T>
where
    T: ColumnType,
{
    type Nullable = Self;

    const KIND: ValueKind = T::KIND;

    fn into_value(self) -> Value {
        self.map_or(Value::Null, ColumnType::into_value)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Column types that support arithmetic in SQL.
pub trait Numeric: ColumnType {}

impl Numeric for i64 {}
impl Numeric for i32 {}
impl Numeric for f64 {}
impl<T: Numeric> Numeric for Option<T> {}

/// Column types that support string operators in SQL.
pub trait Textual: ColumnType {}

impl Textual for String {}
impl Textual for Option<String> {}

#[cfg(test)]
mod test {
    use super::{ColumnType, Value};
    use crate::Error;

    #[test]
    fn optional_columns_map_null() {
        assert_eq!(Option::<i64>::from_value(Value::Null).ok(), Some(None));
        assert_eq!(Some(3_i64).into_value(), Value::Int(3));
        assert_eq!(Option::<String>::None.into_value(), Value::Null);
    }

    #[test]
    fn non_optional_columns_reject_null() {
        assert!(matches!(
            i64::from_value(Value::Null),
            Err(Error::ProjectionBinding(_))
        ));
        assert!(matches!(
            String::from_value(Value::Int(1)),
            Err(Error::ProjectionBinding(_))
        ));
    }

    #[test]
    fn narrow_integers_are_range_checked() {
        assert_eq!(i32::from_value(Value::Int(40)).ok(), Some(40));
        assert!(i32::from_value(Value::Int(i64::MAX)).is_err());
    }

    #[test]
    fn identity_keys_keep_kind() {
        assert_ne!(
            Value::Int(1).identity_key(),
            Value::Text("1".to_string()).identity_key()
        );
    }
}
