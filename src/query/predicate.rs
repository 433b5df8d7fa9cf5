use crate::error::Result;

use super::{
    PushToQuery, StatementBuilder,
    expr::{BinaryOp, Expr, UnaryOp},
};

/// A boolean condition, usable in `WHERE`, `HAVING`, join refinements and `CASE` branches.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition(pub(crate) Expr);

impl Condition {
    pub(crate) const fn from_expr(expr: Expr) -> Self {
        Self(expr)
    }

    #[must_use]
    pub fn into_expr(self) -> Expr {
        self.0
    }

    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.0
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self(Expr::binary(self.0, BinaryOp::And, other.0))
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self(Expr::binary(self.0, BinaryOp::Or, other.0))
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self(Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(self.0),
        })
    }
}

impl PushToQuery for Condition {
    fn push_to(&self, builder: &mut StatementBuilder) -> Result<()> {
        self.0.push_to(builder)
    }
}

/// Conjunct every present condition. Absent entries are skipped entirely, so passing `None`
/// is the same as leaving the entry out. Returns `None` if nothing is left.
pub fn all_of(conditions: impl IntoIterator<Item = Option<Condition>>) -> Option<Condition> {
    conditions.into_iter().flatten().reduce(Condition::and)
}

/// Disjunct every present condition, skipping absent entries like [`all_of`].
pub fn any_of(conditions: impl IntoIterator<Item = Option<Condition>>) -> Option<Condition> {
    conditions.into_iter().flatten().reduce(Condition::or)
}

/// Incrementally collects optional conditions, for callers that prefer an imperative
/// style over [`all_of`].
#[derive(Debug, Clone, Default)]
pub struct BooleanBuilder {
    condition: Option<Condition>,
}

impl BooleanBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self { condition: None }
    }

    /// `AND` the condition in. `None` is a no-op.
    pub fn and(&mut self, condition: impl Into<Option<Condition>>) -> &mut Self {
        if let Some(condition) = condition.into() {
            self.condition = Some(match self.condition.take() {
                Some(existing) => existing.and(condition),
                None => condition,
            });
        }
        self
    }

    /// `OR` the condition in. `None` is a no-op.
    pub fn or(&mut self, condition: impl Into<Option<Condition>>) -> &mut Self {
        if let Some(condition) = condition.into() {
            self.condition = Some(match self.condition.take() {
                Some(existing) => existing.or(condition),
                None => condition,
            });
        }
        self
    }

    #[must_use]
    pub const fn has_value(&self) -> bool {
        self.condition.is_some()
    }

    #[must_use]
    pub fn build(self) -> Option<Condition> {
        self.condition
    }
}

#[cfg(test)]
mod test {
    use super::{BooleanBuilder, Condition, all_of, any_of};
    use crate::{
        config::DbType,
        error::Error,
        query::{
            PushToQuery, StatementBuilder,
            expr::{ColumnName, Expr, TypedExpr},
        },
    };

    fn age() -> TypedExpr<i64> {
        TypedExpr::new(Expr::Column(ColumnName::new_with_table_or_alias(
            "member", "age",
        )))
    }

    fn render(condition: &Condition) -> String {
        let mut builder = StatementBuilder::new(DbType::Sqlite);
        assert!(condition.push_to(&mut builder).is_ok());
        builder.into_statement().sql
    }

    #[test]
    fn absent_entries_are_no_ops() {
        let with_gaps = all_of([None, Some(age().goe(10)), None, Some(age().loe(30))]);
        let without = all_of([Some(age().goe(10)), Some(age().loe(30))]);
        assert_eq!(with_gaps, without);
        assert!(all_of([None, None]).is_none());
    }

    #[test]
    fn conjunction_brackets_nested_disjunction() {
        let condition = all_of([
            any_of([Some(age().eq(1)), Some(age().eq(2))]),
            Some(age().ne(3)),
        ]);
        let Some(condition) = condition else {
            panic!("expected a condition");
        };
        assert_eq!(
            render(&condition),
            "(\"member\".\"age\" = ? OR \"member\".\"age\" = ?) AND \"member\".\"age\" != ?"
        );
    }

    #[test]
    fn within_skips_missing_bounds() {
        assert!(matches!(age().within(None, None), Ok(None)));

        let Ok(Some(lower)) = age().within(Some(10), None) else {
            panic!("expected a lower bound");
        };
        assert_eq!(render(&lower), "\"member\".\"age\" >= ?");

        let Ok(Some(both)) = age().within(Some(10), Some(30)) else {
            panic!("expected a range");
        };
        assert_eq!(render(&both), "\"member\".\"age\" BETWEEN ? AND ?");
    }

    #[test]
    fn within_rejects_inverted_bounds() {
        assert!(matches!(
            age().within(Some(40), Some(10)),
            Err(Error::InvalidCondition(_))
        ));
    }

    #[test]
    fn boolean_builder_ignores_none() {
        let mut builder = BooleanBuilder::new();
        builder
            .and(None::<Condition>)
            .and(age().gt(1))
            .and(None::<Condition>);
        assert!(builder.has_value());
        assert_eq!(builder.build(), Some(age().gt(1)));
    }
}
