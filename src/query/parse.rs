use sqlx::any::AnyRow;

use crate::error::Result;

/// Trait describing a struct that may be parsed from a [`sqlx::Row`]. Every column is read as
/// `<prefix><column name>`, so the same model can appear several times in one row.
pub trait ParseFromRow: Sized {
    /// # Errors
    ///
    /// If a column is missing or holds a value the field cannot represent.
    fn parse_from_row(row: &AnyRow, prefix: &str) -> Result<Self>;
}
