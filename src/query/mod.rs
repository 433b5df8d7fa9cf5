pub mod expr;
pub mod fetch;
pub mod join;
pub mod mutation;
pub mod order;
pub mod pagination;
pub mod parse;
pub mod predicate;
pub mod projection;
pub mod select;
pub mod value;

use std::fmt::{Display, Write};

use sqlx::{
    Any,
    any::AnyArguments,
    query::Query,
};

use crate::{config::DbType, error::Result};

use value::Value;

/// This trait represents anything that can be pushed into a [`StatementBuilder`], i.e. any
/// kind of query fragment, like a condition or a list of values.
///
/// Pushing fails when the fragment has no representation in the target dialect.
pub trait PushToQuery {
    /// Push the object's contents into a statement builder.
    ///
    /// # Errors
    ///
    /// [`crate::Error::UnsupportedQueryShape`] if the fragment cannot be translated.
    fn push_to(&self, builder: &mut StatementBuilder) -> Result<()>;
}

impl<T: PushToQuery + ?Sized> PushToQuery for Box<T> {
    fn push_to(&self, builder: &mut StatementBuilder) -> Result<()> {
        (**self).push_to(builder)
    }
}

/// Accumulates SQL text and its positional parameters for one dialect.
#[derive(Debug)]
pub struct StatementBuilder {
    db: DbType,
    sql: String,
    params: Vec<Value>,
}

impl StatementBuilder {
    #[must_use]
    pub const fn new(db: DbType) -> Self {
        Self {
            db,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub const fn db(&self) -> DbType {
        self.db
    }

    pub fn push(&mut self, sql: impl Display) -> &mut Self {
        let _ = write!(self.sql, "{sql}");
        self
    }

    /// Push a quoted identifier.
    pub fn push_identifier(&mut self, ident: &str) -> &mut Self {
        let quote = match self.db {
            DbType::MySql => '`',
            DbType::Postgres | DbType::Sqlite => '"',
        };
        self.sql.push(quote);
        ident.chars().for_each(|c| {
            if c == quote {
                self.sql.push(quote);
            }
            self.sql.push(c);
        });
        self.sql.push(quote);
        self
    }

    /// Push a placeholder and record `value` as its parameter. `NULL` is inlined.
    pub fn push_bind(&mut self, value: Value) -> &mut Self {
        if value.is_null() {
            return self.push("NULL");
        }

        self.params.push(value);
        if self.db.numbered_placeholders() {
            let position = self.params.len();
            self.push(format_args!("${position}"))
        } else {
            self.push("?")
        }
    }

    /// Push `items`, separated by `separator`.
    pub(crate) fn push_separated<I, T>(&mut self, items: I, separator: &str) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: PushToQuery,
    {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.push(separator);
            }
            item.push_to(self)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn into_statement(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

impl<T: PushToQuery + ?Sized> PushToQuery for &T {
    fn push_to(&self, builder: &mut StatementBuilder) -> Result<()> {
        (**self).push_to(builder)
    }
}

/// An executable SQL statement plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    /// Bind the parameters to a driver query.
    #[must_use]
    pub fn query(&self) -> Query<'_, Any, AnyArguments<'_>> {
        self.params
            .iter()
            .fold(sqlx::query(&self.sql), |query, param| match param {
                Value::Null => query.bind(Option::<String>::None),
                Value::Int(e) => query.bind(*e),
                Value::Real(e) => query.bind(*e),
                Value::Text(e) => query.bind(e.clone()),
                Value::Bool(e) => query.bind(*e),
            })
    }
}

/// Glue conditions together with `AND`, each wrapped in `()` brackets.
pub(crate) fn push_conjunction<T: PushToQuery>(
    builder: &mut StatementBuilder,
    conditions: &[T],
) -> Result<()> {
    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            builder.push(" AND ");
        }
        builder.push("(");
        condition.push_to(builder)?;
        builder.push(")");
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{StatementBuilder, value::Value};
    use crate::config::DbType;

    #[test]
    fn placeholders_follow_dialect() {
        let mut sqlite = StatementBuilder::new(DbType::Sqlite);
        sqlite.push_bind(Value::Int(1)).push(", ").push_bind(Value::Int(2));
        assert_eq!(sqlite.into_statement().sql, "?, ?");

        let mut postgres = StatementBuilder::new(DbType::Postgres);
        postgres
            .push_bind(Value::Int(1))
            .push(", ")
            .push_bind(Value::Null)
            .push(", ")
            .push_bind(Value::Int(2));
        let statement = postgres.into_statement();
        assert_eq!(statement.sql, "$1, NULL, $2");
        assert_eq!(statement.params, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn identifiers_are_quoted() {
        let mut builder = StatementBuilder::new(DbType::Sqlite);
        builder.push_identifier("we\"ird");
        assert_eq!(builder.into_statement().sql, "\"we\"\"ird\"");

        let mut builder = StatementBuilder::new(DbType::MySql);
        builder.push_identifier("member");
        assert_eq!(builder.into_statement().sql, "`member`");
    }
}
