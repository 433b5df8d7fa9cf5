use std::marker::PhantomData;

use tracing::debug;

use crate::{
    config::DbType,
    entity::{Entity, column::Column},
    error::{Error, Result},
    session::Session,
};

use super::{
    PushToQuery, Statement, StatementBuilder,
    expr::{Expr, IntoExpr},
    predicate::Condition,
    push_conjunction,
};

/// Reject references to anything but the mutated table. Subqueries are checked on their own
/// when they are built, so they may refer to other tables.
fn check_single_table<T: Entity>(exprs: &[&Expr]) -> Result<()> {
    let mut foreign = None;
    for expr in exprs {
        expr.visit_columns(&mut |column| {
            if let Some(table) = column.table_or_alias().filter(|e| *e != T::TABLE_NAME) {
                foreign.get_or_insert_with(|| table.to_string());
            }
        });
    }

    match foreign {
        Some(table) => Err(Error::unsupported(format!(
            "bulk mutation of `{}` cannot refer to `{table}`",
            T::TABLE_NAME
        ))),
        None => Ok(()),
    }
}

fn push_where(builder: &mut StatementBuilder, conditions: &[Expr]) -> Result<()> {
    if !conditions.is_empty() {
        builder.push(" WHERE ");
        push_conjunction(builder, conditions)?;
    }
    Ok(())
}

/// A set-based `UPDATE` of `T`. Assigned values may refer to the row's own columns, e.g.
/// `age = age + 1`.
pub struct Update<T: Entity> {
    assignments: Vec<(&'static str, Expr)>,
    conditions: Vec<Expr>,
    marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Update<T> {
    pub(crate) const fn new() -> Self {
        Self {
            assignments: vec![],
            conditions: vec![],
            marker: PhantomData,
        }
    }

    /// Assign `value` to `column` on every matching row.
    #[must_use]
    pub fn set<C>(mut self, _column: C, value: impl IntoExpr<C::Type>) -> Self
    where
        C: Column<Entity = T>,
    {
        self.assignments.push((C::NAME, value.into_expr()));
        self
    }

    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition.into_expr());
        self
    }

    /// Like [`Update::filter`]; `None` leaves the statement untouched.
    #[must_use]
    pub fn filter_opt(self, condition: Option<Condition>) -> Self {
        match condition {
            Some(condition) => self.filter(condition),
            None => self,
        }
    }

    /// # Errors
    ///
    /// [`Error::UnsupportedQueryShape`] without assignments, or when an assignment or
    /// condition refers to another table.
    pub fn statement(&self, db: DbType) -> Result<Statement> {
        if self.assignments.is_empty() {
            return Err(Error::unsupported("update without assignments"));
        }
        let exprs = self
            .assignments
            .iter()
            .map(|(_, e)| e)
            .chain(&self.conditions)
            .collect::<Vec<_>>();
        check_single_table::<T>(&exprs)?;

        let mut builder = StatementBuilder::new(db);
        builder.push("UPDATE ").push_identifier(T::TABLE_NAME).push(" SET ");
        for (i, (column, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push_identifier(column).push(" = ");
            value.push_to(&mut builder)?;
        }
        push_where(&mut builder, &self.conditions)?;

        Ok(builder.into_statement())
    }

    /// Run the update and return the number of affected rows. The session's identity map is
    /// cleared afterwards, since any cached copy may now be stale.
    ///
    /// # Errors
    ///
    /// If the statement cannot be translated or executed.
    pub async fn execute(self, session: &mut Session) -> Result<u64> {
        let statement = self.statement(session.db_type())?;
        let affected = session.execute(&statement).await?;
        debug!(table = T::TABLE_NAME, affected, "bulk update");
        session.clear();
        Ok(affected)
    }
}

/// A set-based `DELETE` of `T`.
pub struct Delete<T: Entity> {
    conditions: Vec<Expr>,
    marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Delete<T> {
    pub(crate) const fn new() -> Self {
        Self {
            conditions: vec![],
            marker: PhantomData,
        }
    }

    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition.into_expr());
        self
    }

    /// Like [`Delete::filter`]; `None` leaves the statement untouched.
    #[must_use]
    pub fn filter_opt(self, condition: Option<Condition>) -> Self {
        match condition {
            Some(condition) => self.filter(condition),
            None => self,
        }
    }

    /// # Errors
    ///
    /// [`Error::UnsupportedQueryShape`] when a condition refers to another table.
    pub fn statement(&self, db: DbType) -> Result<Statement> {
        check_single_table::<T>(&self.conditions.iter().collect::<Vec<_>>())?;

        let mut builder = StatementBuilder::new(db);
        builder.push("DELETE FROM ").push_identifier(T::TABLE_NAME);
        push_where(&mut builder, &self.conditions)?;

        Ok(builder.into_statement())
    }

    /// Run the delete and return the number of affected rows. The session's identity map is
    /// cleared afterwards.
    ///
    /// # Errors
    ///
    /// If the statement cannot be translated or executed.
    pub async fn execute(self, session: &mut Session) -> Result<u64> {
        let statement = self.statement(session.db_type())?;
        let affected = session.execute(&statement).await?;
        debug!(table = T::TABLE_NAME, affected, "bulk delete");
        session.clear();
        Ok(affected)
    }
}
