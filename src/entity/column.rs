use sqlx::any::AnyRow;

use crate::{
    entity::Entity,
    error::Result,
    query::{
        expr::{ColumnName, Expr, IntoExpr, TypedExpr},
        order::OrderSpec,
        predicate::Condition,
        value::{ColumnType, Textual},
    },
};

pub trait Column: Sized + Send + Sync + 'static {
    /// The underlying rust type of this column.
    type Type: ColumnType;

    /// The entity that this column belongs to.
    type Entity: Entity;

    /// The name this column has in the database;
    const NAME: &'static str;

    /// The fully qualified name of this column, usually something like
    /// `"entity_table_name"."column_name"`.
    fn full_column_name() -> ColumnName {
        ColumnName::new_with_table_or_alias(Self::Entity::TABLE_NAME, Self::NAME)
    }

    /// This column, qualified by `alias` instead of the table name.
    fn aliased_column_name(alias: &str) -> ColumnName {
        ColumnName::new_with_table_or_alias(alias, Self::NAME)
    }

    /// A typed expression referring to this column of the entity's table.
    fn expr() -> TypedExpr<Self::Type> {
        TypedExpr::new(Expr::Column(Self::full_column_name()))
    }

    /// A typed expression referring to this column of an aliased occurrence of the table.
    fn of(alias: &str) -> TypedExpr<Self::Type> {
        TypedExpr::new(Expr::Column(Self::aliased_column_name(alias)))
    }

    /// Parse a return value from a sqlx row into this column's rust type. Entity columns are
    /// selected as `<prefix><name>`.
    ///
    /// # Errors
    ///
    /// If the column is missing from the row or holds an incompatible value.
    fn value_from_row(row: &AnyRow, prefix: &str) -> Result<Self::Type> {
        Self::Type::from_row(row, format!("{prefix}{}", Self::NAME).as_str())
    }
}

pub trait NullableColumn: Column {
    fn is_null() -> Condition {
        Self::expr().is_null()
    }

    fn is_not_null() -> Condition {
        Self::expr().is_not_null()
    }
}

impl<T, Type> NullableColumn for T
where
    T: Column<Type = Option<Type>>,
    Type: ColumnType,
{
}

pub trait ComparableColumn: Column {
    fn eq(other: impl IntoExpr<Self::Type>) -> Condition {
        Self::expr().eq(other)
    }

    fn not_eq(other: impl IntoExpr<Self::Type>) -> Condition {
        Self::expr().ne(other)
    }

    fn is_in<V: IntoExpr<Self::Type>>(other: impl IntoIterator<Item = V>) -> Condition {
        Self::expr().is_in(other)
    }

    fn is_not_in<V: IntoExpr<Self::Type>>(other: impl IntoIterator<Item = V>) -> Condition {
        Self::expr().is_not_in(other)
    }
}

impl<T> ComparableColumn for T where T: Column {}

pub trait StringComparableColumn: Column<Type: Textual> {
    fn like(pattern: impl Into<String>) -> Condition {
        Self::expr().like(pattern)
    }

    fn contains(needle: impl std::fmt::Display) -> Condition {
        Self::expr().contains(needle)
    }
}

impl<T> StringComparableColumn for T where T: Column<Type: Textual> {}

pub trait RangeColumn: Column<Type: PartialOrd + std::fmt::Debug> {
    fn between(low: impl IntoExpr<Self::Type>, high: impl IntoExpr<Self::Type>) -> Condition {
        Self::expr().between(low, high)
    }

    fn not_between(low: impl IntoExpr<Self::Type>, high: impl IntoExpr<Self::Type>) -> Condition {
        Self::expr().not_between(low, high)
    }

    fn goe(other: impl IntoExpr<Self::Type>) -> Condition {
        Self::expr().goe(other)
    }

    fn loe(other: impl IntoExpr<Self::Type>) -> Condition {
        Self::expr().loe(other)
    }

    /// See [`TypedExpr::within`].
    ///
    /// # Errors
    ///
    /// [`crate::Error::InvalidCondition`] if `lower > upper`.
    fn within(
        lower: Option<Self::Type>,
        upper: Option<Self::Type>,
    ) -> Result<Option<Condition>> {
        Self::expr().within(lower, upper)
    }
}

impl<T> RangeColumn for T where T: Column<Type: PartialOrd + std::fmt::Debug> {}

pub trait OrderableColumn: Column {
    fn asc() -> OrderSpec {
        Self::expr().asc()
    }

    fn desc() -> OrderSpec {
        Self::expr().desc()
    }
}

impl<T> OrderableColumn for T where T: Column {}
