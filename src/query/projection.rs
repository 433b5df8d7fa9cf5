use std::{marker::PhantomData, sync::Arc};

use itertools::Itertools;
use sqlx::any::AnyRow;

use crate::{
    error::{Error, Result},
    session::Session,
};

use super::{
    PushToQuery, StatementBuilder,
    expr::{Expr, TypedExpr},
    select::{SelectList, SelectStatement},
    value::{ColumnType, Value, ValueKind},
};

/// One expression of an explicit select list, with the name it binds to.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub(crate) expr: Expr,
    pub(crate) alias: Option<String>,
    pub(crate) kind: ValueKind,
}

impl SelectItem {
    pub(crate) const fn new(expr: Expr, alias: Option<String>, kind: ValueKind) -> Self {
        Self { expr, alias, kind }
    }

    /// The name a target field must have to receive this item: the alias if one was given,
    /// otherwise the column name of a plain column reference. Computed expressions without
    /// an alias have no binding name.
    #[must_use]
    pub fn binding_name(&self) -> Option<&str> {
        match (&self.alias, &self.expr) {
            (Some(alias), _) => Some(alias),
            (None, Expr::Column(column)) => Some(column.column_name()),
            _ => None,
        }
    }

    fn decode(&self, row: &AnyRow, index: usize) -> Result<Value> {
        Ok(Value::decode(row, index, self.kind)?)
    }
}

impl PushToQuery for SelectItem {
    fn push_to(&self, builder: &mut StatementBuilder) -> Result<()> {
        self.expr.push_to(builder)?;
        if let Some(alias) = &self.alias {
            builder.push(" AS ").push_identifier(alias);
        }
        Ok(())
    }
}

/// A target shape populated by writing each selected value into the field of the same name.
///
/// Derived with `#[derive(Projection)]` and `#[strata_orm(fields)]`.
pub trait FieldTarget: Default {
    const FIELDS: &'static [&'static str];

    /// # Errors
    ///
    /// [`Error::ProjectionBinding`] if the field does not exist or cannot hold `value`.
    fn write_field(&mut self, name: &str, value: Value) -> Result<()>;
}

/// A target shape populated through `set_<field>` mutators on a default instance.
///
/// Derived with `#[derive(Projection)]` and `#[strata_orm(setters)]`.
pub trait SetterTarget: Default {
    const SETTERS: &'static [&'static str];

    /// # Errors
    ///
    /// [`Error::ProjectionBinding`] if there is no such setter or it cannot take `value`.
    fn call_setter(&mut self, name: &str, value: Value) -> Result<()>;
}

/// A target shape built by one constructor call taking every selected value in order.
///
/// Derived with `#[derive(Projection)]` and `#[strata_orm(constructor = "new")]`.
pub trait ConstructorTarget: Sized {
    const ARITY: usize;

    /// # Errors
    ///
    /// [`Error::ProjectionBinding`] if a value does not fit the parameter at its position.
    fn construct(values: Vec<Value>) -> Result<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingStrategy {
    Fields,
    Setters,
    Constructor,
}

/// A projection of selected expressions into `D` through one binding strategy.
pub struct Projection<D> {
    items: Vec<SelectItem>,
    strategy: BindingStrategy,
    validate: fn(&[SelectItem]) -> Result<()>,
    build: fn(&[SelectItem], Vec<Value>) -> Result<D>,
}

impl<D> Clone for Projection<D> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            strategy: self.strategy,
            validate: self.validate,
            build: self.build,
        }
    }
}

impl<D> std::fmt::Debug for Projection<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Projection")
            .field("items", &self.items)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl<D> Projection<D> {
    #[must_use]
    pub const fn strategy(&self) -> BindingStrategy {
        self.strategy
    }

    #[must_use]
    pub fn items(&self) -> &[SelectItem] {
        &self.items
    }

    /// Check that `D` can receive every item, without touching the database.
    ///
    /// # Errors
    ///
    /// [`Error::ProjectionBinding`] on unnamed items, unknown names or an arity mismatch.
    pub fn validate(&self) -> Result<()> {
        (self.validate)(&self.items)
    }
}

fn validate_named(items: &[SelectItem], targets: &[&str], what: &str) -> Result<()> {
    for item in items {
        let Some(name) = item.binding_name() else {
            return Err(Error::binding(format!(
                "computed expression {:?} must be aliased before binding to a {what}",
                item.expr
            )));
        };
        if !targets.contains(&name) {
            return Err(Error::binding(format!("target has no {what} named `{name}`")));
        }
    }

    if let Some(duplicate) = items.iter().filter_map(SelectItem::binding_name).duplicates().next() {
        return Err(Error::binding(format!("`{duplicate}` is bound more than once")));
    }

    Ok(())
}

fn bind_names<D: Default>(
    items: &[SelectItem],
    values: Vec<Value>,
    mut write: impl FnMut(&mut D, &str, Value) -> Result<()>,
) -> Result<D> {
    let mut target = D::default();
    for (item, value) in items.iter().zip(values) {
        let name = item
            .binding_name()
            .ok_or_else(|| Error::binding("unnamed select item"))?;
        write(&mut target, name, value)?;
    }
    Ok(target)
}

impl<D: FieldTarget> Projection<D> {
    /// Field binding: default-construct `D` and write each item into the field named like
    /// its binding name.
    pub fn fields(items: impl IntoIterator<Item = SelectItem>) -> Self {
        Self {
            items: items.into_iter().collect(),
            strategy: BindingStrategy::Fields,
            validate: |items| validate_named(items, D::FIELDS, "field"),
            build: |items, values| bind_names(items, values, D::write_field),
        }
    }
}

impl<D: SetterTarget> Projection<D> {
    /// Setter binding: default-construct `D` and pass each item to the setter named like its
    /// binding name.
    pub fn setters(items: impl IntoIterator<Item = SelectItem>) -> Self {
        Self {
            items: items.into_iter().collect(),
            strategy: BindingStrategy::Setters,
            validate: |items| validate_named(items, D::SETTERS, "setter"),
            build: |items, values| bind_names(items, values, D::call_setter),
        }
    }
}

impl<D: ConstructorTarget> Projection<D> {
    /// Constructor binding: call the constructor of `D` with every item in positional
    /// order. Names are irrelevant, only arity and order matter.
    pub fn constructor(items: impl IntoIterator<Item = SelectItem>) -> Self {
        Self {
            items: items.into_iter().collect(),
            strategy: BindingStrategy::Constructor,
            validate: |items| {
                if items.len() == D::ARITY {
                    Ok(())
                } else {
                    Err(Error::binding(format!(
                        "constructor takes {} arguments, but {} expressions are selected",
                        D::ARITY,
                        items.len()
                    )))
                }
            },
            build: |_, values| D::construct(values),
        }
    }
}

/// Turns driver rows into outputs of one shape.
pub trait RowMapper {
    type Output;

    /// Fill in the select list (and any joins the shape needs), and reject shapes that
    /// cannot be bound before the statement runs.
    ///
    /// # Errors
    ///
    /// [`Error::ProjectionBinding`] or [`Error::UnsupportedQueryShape`].
    fn prepare(&self, statement: &mut SelectStatement) -> Result<()>;

    /// # Errors
    ///
    /// If the row does not contain what [`RowMapper::prepare`] selected.
    fn map_row(&self, row: &AnyRow) -> Result<Self::Output>;

    /// Record materialized entities in the unit of work.
    fn remember(&self, _output: &Self::Output, _session: &mut Session) {}
}

fn decode_all(items: &[SelectItem], row: &AnyRow) -> Result<Vec<Value>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| item.decode(row, i))
        .collect()
}

impl<D> RowMapper for Projection<D> {
    type Output = D;

    fn prepare(&self, statement: &mut SelectStatement) -> Result<()> {
        self.validate()?;
        statement.select_list = SelectList::Items(self.items.clone());
        Ok(())
    }

    fn map_row(&self, row: &AnyRow) -> Result<D> {
        (self.build)(&self.items, decode_all(&self.items, row)?)
    }
}

/// Maps one selected expression to `V`.
#[derive(Debug, Clone)]
pub struct ScalarMapper<V> {
    pub(crate) item: SelectItem,
    marker: PhantomData<fn() -> V>,
}

impl<V: ColumnType> ScalarMapper<V> {
    pub(crate) fn new(expr: TypedExpr<V>) -> Self {
        Self {
            item: expr.item(),
            marker: PhantomData,
        }
    }
}

impl<V: ColumnType> RowMapper for ScalarMapper<V> {
    type Output = V;

    fn prepare(&self, statement: &mut SelectStatement) -> Result<()> {
        statement.select_list = SelectList::Items(vec![self.item.clone()]);
        Ok(())
    }

    fn map_row(&self, row: &AnyRow) -> Result<V> {
        V::from_value(self.item.decode(row, 0)?)
    }
}

/// Maps a row to a [`Tuple`].
#[derive(Debug, Clone)]
pub struct TupleMapper {
    items: Arc<[SelectItem]>,
}

impl TupleMapper {
    pub(crate) fn new(items: impl IntoIterator<Item = SelectItem>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }
}

impl RowMapper for TupleMapper {
    type Output = Tuple;

    fn prepare(&self, statement: &mut SelectStatement) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::unsupported("tuple projection without any expression"));
        }
        statement.select_list = SelectList::Items(self.items.to_vec());
        Ok(())
    }

    fn map_row(&self, row: &AnyRow) -> Result<Tuple> {
        Ok(Tuple {
            values: decode_all(&self.items, row)?,
            items: Arc::clone(&self.items),
        })
    }
}

/// A flat row of selected values, accessible by position, by binding name, or by the
/// expression that produced it.
#[derive(Debug, Clone)]
pub struct Tuple {
    items: Arc<[SelectItem]>,
    values: Vec<Value>,
}

impl Tuple {
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// # Errors
    ///
    /// [`Error::ProjectionBinding`] if `index` is out of range or the value is not a `V`.
    pub fn get<V: ColumnType>(&self, index: usize) -> Result<V> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| Error::binding(format!("tuple has no element {index}")))?;
        V::from_value(value.clone())
    }

    /// # Errors
    ///
    /// [`Error::ProjectionBinding`] if nothing is bound to `name` or the value is not a `V`.
    pub fn get_named<V: ColumnType>(&self, name: &str) -> Result<V> {
        let index = self
            .items
            .iter()
            .position(|e| e.binding_name() == Some(name))
            .ok_or_else(|| Error::binding(format!("tuple has no element named `{name}`")))?;
        self.get(index)
    }

    /// Look up the value of an expression that is part of the select list.
    ///
    /// # Errors
    ///
    /// [`Error::ProjectionBinding`] if the expression was not selected.
    pub fn get_by<V: ColumnType>(&self, expr: &TypedExpr<V>) -> Result<V> {
        let index = self
            .items
            .iter()
            .position(|e| &e.expr == expr.expr())
            .ok_or_else(|| Error::binding(format!("{:?} is not selected", expr.expr())))?;
        self.get(index)
    }
}
