use crate::error::Result;

use super::{PushToQuery, StatementBuilder, expr::Expr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Where `NULL` values go. When unset, the storage default applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

/// One `ORDER BY` key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    expr: Expr,
    direction: Direction,
    nulls: Option<NullsOrder>,
}

impl OrderSpec {
    pub(crate) const fn new(expr: Expr, direction: Direction) -> Self {
        Self {
            expr,
            direction,
            nulls: None,
        }
    }

    #[must_use]
    pub const fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullsOrder::First);
        self
    }

    #[must_use]
    pub const fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub const fn nulls(&self) -> Option<NullsOrder> {
        self.nulls
    }
}

impl PushToQuery for OrderSpec {
    fn push_to(&self, builder: &mut StatementBuilder) -> Result<()> {
        let direction = match self.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        };

        match self.nulls {
            None => {
                self.expr.push_to(builder)?;
                builder.push(direction);
            }
            Some(nulls) if builder.db().supports_nulls_ordering() => {
                self.expr.push_to(builder)?;
                builder.push(direction).push(match nulls {
                    NullsOrder::First => " NULLS FIRST",
                    NullsOrder::Last => " NULLS LAST",
                });
            }
            // emulated through a leading sort key; `false` sorts before `true`
            Some(nulls) => {
                self.expr.push_to(builder)?;
                builder.push(match nulls {
                    NullsOrder::First => " IS NOT NULL, ",
                    NullsOrder::Last => " IS NULL, ",
                });
                self.expr.push_to(builder)?;
                builder.push(direction);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{Direction, OrderSpec};
    use crate::{
        config::DbType,
        query::{
            PushToQuery, StatementBuilder,
            expr::{ColumnName, Expr},
        },
    };

    fn render(order: &OrderSpec, db: DbType) -> String {
        let mut builder = StatementBuilder::new(db);
        assert!(order.push_to(&mut builder).is_ok());
        builder.into_statement().sql
    }

    fn username() -> Expr {
        Expr::Column(ColumnName::new("username"))
    }

    #[test]
    fn storage_default_without_nulls_order() {
        let order = OrderSpec::new(username(), Direction::Desc);
        assert_eq!(render(&order, DbType::Sqlite), "\"username\" DESC");
    }

    #[test]
    fn native_nulls_last() {
        let order = OrderSpec::new(username(), Direction::Asc).nulls_last();
        assert_eq!(
            render(&order, DbType::Postgres),
            "\"username\" ASC NULLS LAST"
        );
    }

    #[test]
    fn emulated_nulls_order() {
        let last = OrderSpec::new(username(), Direction::Asc).nulls_last();
        assert_eq!(
            render(&last, DbType::MySql),
            "`username` IS NULL, `username` ASC"
        );

        let first = OrderSpec::new(username(), Direction::Desc).nulls_first();
        assert_eq!(
            render(&first, DbType::MySql),
            "`username` IS NOT NULL, `username` DESC"
        );
    }
}
