use std::{fmt::Display, marker::PhantomData};

use crate::error::{Error, Result};

use super::{
    PushToQuery, StatementBuilder,
    order::{Direction, OrderSpec},
    predicate::Condition,
    projection::SelectItem,
    select::SelectStatement,
    value::{ColumnType, Numeric, Textual, Value, ValueKind},
};
use crate::config::DbType;

/// A column reference, optionally qualified by a table name or alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnName {
    table_or_alias: Option<String>,
    column_name: String,
}

impl ColumnName {
    pub fn new(column_name: impl Into<String>) -> Self {
        Self {
            table_or_alias: None,
            column_name: column_name.into(),
        }
    }

    pub fn new_with_table_or_alias(
        table_or_alias: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self {
            table_or_alias: Some(table_or_alias.into()),
            column_name: column_name.into(),
        }
    }

    #[must_use]
    pub fn table_or_alias(&self) -> Option<&str> {
        self.table_or_alias.as_deref()
    }

    #[must_use]
    pub fn column_name(&self) -> &str {
        &self.column_name
    }
}

impl PushToQuery for ColumnName {
    fn push_to(&self, builder: &mut StatementBuilder) -> Result<()> {
        if let Some(table_or_alias) = &self.table_or_alias {
            builder.push_identifier(table_or_alias).push(".");
        }
        builder.push_identifier(&self.column_name);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Equals,
    DoesNotEqual,
    Like,
    /// `LIKE` with `\` escaping the wildcards of the pattern.
    LikeEscaped,
    And,
    Or,
    In,
    NotIn,
    Gt,
    Lt,
    Geq,
    Leq,
    Add,
    Sub,
    Mul,
    Div,
    Concat,
}

impl BinaryOp {
    /// Operators for which `(a op b) op c` may be written without brackets.
    const fn is_associative(self) -> bool {
        matches!(
            self,
            Self::And | Self::Or | Self::Add | Self::Mul | Self::Concat
        )
    }

    const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// Predicates binding tighter than `AND` and `OR`.
    const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equals
                | Self::DoesNotEqual
                | Self::Like
                | Self::LikeEscaped
                | Self::In
                | Self::NotIn
                | Self::Gt
                | Self::Lt
                | Self::Geq
                | Self::Leq
        )
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Equals => "=",
                Self::DoesNotEqual => "!=",
                Self::Like | Self::LikeEscaped => "LIKE",
                Self::And => "AND",
                Self::Or => "OR",
                Self::In => "IN",
                Self::NotIn => "NOT IN",
                Self::Gt => ">",
                Self::Lt => "<",
                Self::Geq => ">=",
                Self::Leq => "<=",
                Self::Add => "+",
                Self::Sub => "-",
                Self::Mul => "*",
                Self::Div => "/",
                Self::Concat => "||",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    IsNull,
    IsNotNull,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl Display for AggregateFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Count => "COUNT",
                Self::Sum => "SUM",
                Self::Avg => "AVG",
                Self::Max => "MAX",
                Self::Min => "MIN",
            }
        )
    }
}

/// The expression tree every condition, projection and assignment is built from. Nothing
/// is rendered until the owning statement is translated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnName),
    Value(Value),
    /// `*`, only meaningful as the argument of `COUNT`.
    Star,
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    List(Vec<Expr>),
    Aggregate {
        func: AggregateFunc,
        arg: Box<Expr>,
    },
    Function {
        name: &'static str,
        args: Vec<Expr>,
    },
    Cast {
        expr: Box<Expr>,
        kind: ValueKind,
    },
    Case {
        whens: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    /// A scalar or list subquery, rendered in brackets.
    Subquery(Box<SelectStatement>),
}

impl Expr {
    pub(crate) fn binary(left: Self, op: BinaryOp, right: Self) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Whether this node needs brackets when it appears as an operand of `parent`.
    fn needs_brackets_under(&self, parent: BinaryOp) -> bool {
        match self {
            Self::Binary { op, .. } if parent.is_logical() && op.is_comparison() => false,
            Self::Binary { op, .. } => !(*op == parent && parent.is_associative()),
            Self::Between { .. } | Self::Unary { .. } => !parent.is_logical(),
            _ => false,
        }
    }

    /// Call `f` for every column referenced outside of nested subqueries.
    pub(crate) fn visit_columns<'a>(&'a self, f: &mut impl FnMut(&'a ColumnName)) {
        match self {
            Self::Column(column) => f(column),
            Self::Value(_) | Self::Star | Self::Subquery(_) => {}
            Self::Binary { left, right, .. } => {
                left.visit_columns(f);
                right.visit_columns(f);
            }
            Self::Unary { expr, .. } | Self::Cast { expr, .. } => expr.visit_columns(f),
            Self::Aggregate { arg, .. } => arg.visit_columns(f),
            Self::Between {
                expr, low, high, ..
            } => {
                expr.visit_columns(f);
                low.visit_columns(f);
                high.visit_columns(f);
            }
            Self::List(items) | Self::Function { args: items, .. } => {
                for item in items {
                    item.visit_columns(f);
                }
            }
            Self::Case { whens, otherwise } => {
                for (when, then) in whens {
                    when.visit_columns(f);
                    then.visit_columns(f);
                }
                if let Some(otherwise) = otherwise {
                    otherwise.visit_columns(f);
                }
            }
        }
    }

    fn push_operand(&self, parent: BinaryOp, builder: &mut StatementBuilder) -> Result<()> {
        if self.needs_brackets_under(parent) {
            builder.push("(");
            self.push_to(builder)?;
            builder.push(")");
            Ok(())
        } else {
            self.push_to(builder)
        }
    }
}

fn cast_target(kind: ValueKind, db: DbType) -> &'static str {
    match (kind, db) {
        (ValueKind::Text, DbType::MySql) => "CHAR",
        (ValueKind::Text, _) => "TEXT",
        (ValueKind::Int, DbType::MySql) => "SIGNED",
        (ValueKind::Int, _) => "INTEGER",
        (ValueKind::Real, DbType::Postgres) => "DOUBLE PRECISION",
        (ValueKind::Real, DbType::MySql) => "DOUBLE",
        (ValueKind::Real, DbType::Sqlite) => "REAL",
        (ValueKind::Bool, DbType::Postgres) => "BOOLEAN",
        (ValueKind::Bool, DbType::MySql) => "UNSIGNED",
        (ValueKind::Bool, DbType::Sqlite) => "INTEGER",
    }
}

impl PushToQuery for Expr {
    fn push_to(&self, builder: &mut StatementBuilder) -> Result<()> {
        match self {
            Self::Column(column) => column.push_to(builder)?,
            Self::Value(value) => {
                builder.push_bind(value.clone());
            }
            Self::Star => {
                builder.push("*");
            }
            Self::Binary { left, op, right } => {
                // `x IN ()` is not valid everywhere
                if let (BinaryOp::In | BinaryOp::NotIn, Self::List(items)) = (op, right.as_ref()) {
                    if items.is_empty() {
                        builder.push(if *op == BinaryOp::In { "1 = 0" } else { "1 = 1" });
                        return Ok(());
                    }
                }
                if *op == BinaryOp::Concat && builder.db() == DbType::MySql {
                    builder.push("CONCAT(");
                    left.push_to(builder)?;
                    builder.push(", ");
                    right.push_to(builder)?;
                    builder.push(")");
                    return Ok(());
                }
                left.push_operand(*op, builder)?;
                builder.push(format_args!(" {op} "));
                right.push_operand(*op, builder)?;
                if *op == BinaryOp::LikeEscaped {
                    builder.push(match builder.db() {
                        DbType::MySql => r" ESCAPE '\\'",
                        DbType::Postgres | DbType::Sqlite => r" ESCAPE '\'",
                    });
                }
            }
            Self::Unary { op, expr } => match op {
                UnaryOp::Not => {
                    builder.push("NOT (");
                    expr.push_to(builder)?;
                    builder.push(")");
                }
                UnaryOp::IsNull | UnaryOp::IsNotNull => {
                    expr.push_operand(BinaryOp::Equals, builder)?;
                    builder.push(if *op == UnaryOp::IsNull {
                        " IS NULL"
                    } else {
                        " IS NOT NULL"
                    });
                }
            },
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => {
                expr.push_operand(BinaryOp::Equals, builder)?;
                builder.push(if *negated {
                    " NOT BETWEEN "
                } else {
                    " BETWEEN "
                });
                low.push_operand(BinaryOp::Equals, builder)?;
                builder.push(" AND ");
                high.push_operand(BinaryOp::Equals, builder)?;
            }
            Self::List(items) => {
                builder.push("(");
                builder.push_separated(items, ", ")?;
                builder.push(")");
            }
            Self::Aggregate { func, arg } => {
                builder.push(format_args!("{func}("));
                arg.push_to(builder)?;
                builder.push(")");
            }
            Self::Function { name, args } => {
                builder.push(format_args!("{name}("));
                builder.push_separated(args, ", ")?;
                builder.push(")");
            }
            Self::Cast { expr, kind } => {
                builder.push("CAST(");
                expr.push_to(builder)?;
                let target = cast_target(*kind, builder.db());
                builder.push(format_args!(" AS {target})"));
            }
            Self::Case { whens, otherwise } => {
                if whens.is_empty() {
                    return Err(Error::unsupported("CASE expression without any WHEN branch"));
                }
                builder.push("CASE");
                for (when, then) in whens {
                    builder.push(" WHEN ");
                    when.push_to(builder)?;
                    builder.push(" THEN ");
                    then.push_to(builder)?;
                }
                if let Some(otherwise) = otherwise {
                    builder.push(" ELSE ");
                    otherwise.push_to(builder)?;
                }
                builder.push(" END");
            }
            Self::Subquery(statement) => {
                builder.push("(");
                statement.push_to(builder)?;
                builder.push(")");
            }
        }
        Ok(())
    }
}

/// An expression whose SQL result is known to decode as `T`. Column handles, aggregates,
/// subqueries and constants all produce one, so operands are checked at compile time.
pub struct TypedExpr<T> {
    pub(crate) expr: Expr,
    marker: PhantomData<fn() -> T>,
}

impl<T> Clone for TypedExpr<T> {
    fn clone(&self) -> Self {
        Self::new(self.expr.clone())
    }
}

impl<T> std::fmt::Debug for TypedExpr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TypedExpr").field(&self.expr).finish()
    }
}

impl<T> TypedExpr<T> {
    pub(crate) const fn new(expr: Expr) -> Self {
        Self {
            expr,
            marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.expr
    }

    #[must_use]
    pub fn into_expr(self) -> Expr {
        self.expr
    }
}

/// Anything usable where an expression of type `T` is expected: plain values, `&str` for
/// text columns, or another typed expression. Comparisons accept nullable operands, so
/// `age = (SELECT MAX(age) ...)` type checks.
pub trait IntoExpr<T> {
    fn into_expr(self) -> Expr;
}

impl<T: ColumnType> IntoExpr<T> for T {
    fn into_expr(self) -> Expr {
        Expr::Value(self.into_value())
    }
}

impl<T: ColumnType> IntoExpr<Option<T>> for T {
    fn into_expr(self) -> Expr {
        Expr::Value(self.into_value())
    }
}

impl IntoExpr<String> for &str {
    fn into_expr(self) -> Expr {
        Expr::Value(Value::Text(self.to_string()))
    }
}

impl IntoExpr<Option<String>> for &str {
    fn into_expr(self) -> Expr {
        Expr::Value(Value::Text(self.to_string()))
    }
}

impl<T> IntoExpr<T> for TypedExpr<T> {
    fn into_expr(self) -> Expr {
        self.expr
    }
}

impl<T> IntoExpr<Option<T>> for TypedExpr<T> {
    fn into_expr(self) -> Expr {
        self.expr
    }
}

impl<T> IntoExpr<T> for TypedExpr<Option<T>> {
    fn into_expr(self) -> Expr {
        self.expr
    }
}

/// A constant in the select list, e.g. `SELECT "member"."username", 'A'`.
pub fn constant<T: ColumnType>(value: T) -> TypedExpr<T> {
    TypedExpr::new(Expr::Value(value.into_value()))
}

/// `COUNT(*)` over the rows of the query.
#[must_use]
pub fn count_star() -> TypedExpr<i64> {
    TypedExpr::new(Expr::Aggregate {
        func: AggregateFunc::Count,
        arg: Box::new(Expr::Star),
    })
}

#[allow(clippy::should_implement_trait)]
impl<T: ColumnType> TypedExpr<T> {
    /// Equality against a null value renders as `IS NULL`.
    fn compare(self, op: BinaryOp, other: Expr) -> Condition {
        match (op, &other) {
            (BinaryOp::Equals, Expr::Value(Value::Null)) => self.is_null(),
            (BinaryOp::DoesNotEqual, Expr::Value(Value::Null)) => self.is_not_null(),
            _ => Condition::from_expr(Expr::binary(self.expr, op, other)),
        }
    }

    fn aggregate<R>(self, func: AggregateFunc) -> TypedExpr<R> {
        TypedExpr::new(Expr::Aggregate {
            func,
            arg: Box::new(self.expr),
        })
    }

    pub fn eq(self, other: impl IntoExpr<T>) -> Condition {
        self.compare(BinaryOp::Equals, other.into_expr())
    }

    pub fn ne(self, other: impl IntoExpr<T>) -> Condition {
        self.compare(BinaryOp::DoesNotEqual, other.into_expr())
    }

    pub fn lt(self, other: impl IntoExpr<T>) -> Condition {
        self.compare(BinaryOp::Lt, other.into_expr())
    }

    pub fn gt(self, other: impl IntoExpr<T>) -> Condition {
        self.compare(BinaryOp::Gt, other.into_expr())
    }

    /// `<=`
    pub fn loe(self, other: impl IntoExpr<T>) -> Condition {
        self.compare(BinaryOp::Leq, other.into_expr())
    }

    /// `>=`
    pub fn goe(self, other: impl IntoExpr<T>) -> Condition {
        self.compare(BinaryOp::Geq, other.into_expr())
    }

    pub fn between(self, low: impl IntoExpr<T>, high: impl IntoExpr<T>) -> Condition {
        Condition::from_expr(Expr::Between {
            expr: Box::new(self.expr),
            low: Box::new(low.into_expr()),
            high: Box::new(high.into_expr()),
            negated: false,
        })
    }

    pub fn not_between(self, low: impl IntoExpr<T>, high: impl IntoExpr<T>) -> Condition {
        Condition::from_expr(Expr::Between {
            expr: Box::new(self.expr),
            low: Box::new(low.into_expr()),
            high: Box::new(high.into_expr()),
            negated: true,
        })
    }

    pub fn is_in<V: IntoExpr<T>>(self, values: impl IntoIterator<Item = V>) -> Condition {
        let values = values.into_iter().map(IntoExpr::into_expr).collect();
        self.compare(BinaryOp::In, Expr::List(values))
    }

    pub fn is_not_in<V: IntoExpr<T>>(self, values: impl IntoIterator<Item = V>) -> Condition {
        let values = values.into_iter().map(IntoExpr::into_expr).collect();
        self.compare(BinaryOp::NotIn, Expr::List(values))
    }

    /// `x IN (SELECT ...)`. The subquery comes from
    /// [`ProjectedSelect::into_subquery`](super::select::ProjectedSelect::into_subquery).
    pub fn in_subquery(self, subquery: impl IntoExpr<T>) -> Condition {
        self.compare(BinaryOp::In, subquery.into_expr())
    }

    #[must_use]
    pub fn is_null(self) -> Condition {
        Condition::from_expr(Expr::Unary {
            op: UnaryOp::IsNull,
            expr: Box::new(self.expr),
        })
    }

    #[must_use]
    pub fn is_not_null(self) -> Condition {
        Condition::from_expr(Expr::Unary {
            op: UnaryOp::IsNotNull,
            expr: Box::new(self.expr),
        })
    }

    /// Conjunct of `>= lower` and `<= upper`, skipping absent bounds. `None` when both are
    /// absent.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCondition`] if both bounds are present and `lower > upper`.
    pub fn within(self, lower: Option<T>, upper: Option<T>) -> Result<Option<Condition>>
    where
        T: PartialOrd + std::fmt::Debug,
    {
        match (lower, upper) {
            (Some(lower), Some(upper)) if lower > upper => Err(Error::invalid_condition(format!(
                "lower bound {lower:?} is greater than upper bound {upper:?}"
            ))),
            (Some(lower), Some(upper)) => Ok(Some(self.between(lower, upper))),
            (Some(lower), None) => Ok(Some(self.goe(lower))),
            (None, Some(upper)) => Ok(Some(self.loe(upper))),
            (None, None) => Ok(None),
        }
    }

    #[must_use]
    pub fn asc(self) -> OrderSpec {
        OrderSpec::new(self.expr, Direction::Asc)
    }

    #[must_use]
    pub fn desc(self) -> OrderSpec {
        OrderSpec::new(self.expr, Direction::Desc)
    }

    #[must_use]
    pub fn count(self) -> TypedExpr<i64> {
        self.aggregate(AggregateFunc::Count)
    }

    /// `MAX(x)`, `NULL` over no rows.
    #[must_use]
    pub fn max(self) -> TypedExpr<T::Nullable> {
        self.aggregate(AggregateFunc::Max)
    }

    /// `MIN(x)`, `NULL` over no rows.
    #[must_use]
    pub fn min(self) -> TypedExpr<T::Nullable> {
        self.aggregate(AggregateFunc::Min)
    }

    #[must_use]
    pub fn avg(self) -> TypedExpr<Option<f64>>
    where
        T: Numeric,
    {
        self.aggregate(AggregateFunc::Avg)
    }

    #[must_use]
    pub fn sum(self) -> TypedExpr<T::Nullable>
    where
        T: Numeric,
    {
        self.aggregate(AggregateFunc::Sum)
    }

    /// `CAST(x AS ...)`, with the target type picked from `U` and the dialect.
    #[must_use]
    pub fn cast<U: ColumnType>(self) -> TypedExpr<U> {
        TypedExpr::new(Expr::Cast {
            expr: Box::new(self.expr),
            kind: U::KIND,
        })
    }

    /// The same expression, decoded as optional. Needed for columns on the outer side of a
    /// left join.
    #[must_use]
    pub fn nullable(self) -> TypedExpr<Option<T>> {
        TypedExpr::new(self.expr)
    }

    /// `CAST(x AS TEXT)`
    #[must_use]
    pub fn string_value(self) -> TypedExpr<String> {
        self.cast()
    }

    /// Start a simple `CASE` over this expression, yielding values of type `V`.
    #[must_use]
    pub fn case<V: ColumnType>(self) -> SimpleCase<T, V> {
        SimpleCase {
            operand: self.expr,
            whens: Vec::new(),
            marker: PhantomData,
        }
    }

    /// Use this expression in a select list under its natural name.
    #[must_use]
    pub fn item(self) -> SelectItem {
        SelectItem::new(self.expr, None, T::KIND)
    }

    /// Use this expression in a select list under `alias`.
    #[must_use]
    pub fn alias(self, alias: impl Into<String>) -> SelectItem {
        SelectItem::new(self.expr, Some(alias.into()), T::KIND)
    }
}

#[allow(clippy::should_implement_trait)]
impl<T: Numeric> TypedExpr<T> {
    fn arithmetic(self, op: BinaryOp, other: Expr) -> Self {
        Self::new(Expr::binary(self.expr, op, other))
    }

    #[must_use]
    pub fn add(self, other: impl IntoExpr<T>) -> Self {
        self.arithmetic(BinaryOp::Add, other.into_expr())
    }

    #[must_use]
    pub fn sub(self, other: impl IntoExpr<T>) -> Self {
        self.arithmetic(BinaryOp::Sub, other.into_expr())
    }

    #[must_use]
    pub fn mul(self, other: impl IntoExpr<T>) -> Self {
        self.arithmetic(BinaryOp::Mul, other.into_expr())
    }

    #[must_use]
    pub fn div(self, other: impl IntoExpr<T>) -> Self {
        self.arithmetic(BinaryOp::Div, other.into_expr())
    }
}

impl<T: Textual> TypedExpr<T> {
    pub fn like(self, pattern: impl Into<String>) -> Condition {
        Condition::from_expr(Expr::binary(
            self.expr,
            BinaryOp::Like,
            Expr::Value(Value::Text(pattern.into())),
        ))
    }

    fn like_escaped(self, pattern: String) -> Condition {
        Condition::from_expr(Expr::binary(
            self.expr,
            BinaryOp::LikeEscaped,
            Expr::Value(Value::Text(pattern)),
        ))
    }

    /// `LIKE '%needle%'`, matching `needle` literally.
    pub fn contains(self, needle: impl Display) -> Condition {
        let needle = escape_like(&needle.to_string());
        self.like_escaped(format!("%{needle}%"))
    }

    /// `LIKE 'prefix%'`, matching `prefix` literally.
    pub fn starts_with(self, prefix: impl Display) -> Condition {
        let prefix = escape_like(&prefix.to_string());
        self.like_escaped(format!("{prefix}%"))
    }

    #[must_use]
    pub fn lower(self) -> Self {
        Self::new(Expr::Function {
            name: "lower",
            args: vec![self.expr],
        })
    }

    #[must_use]
    pub fn replace(self, from: impl IntoExpr<String>, to: impl IntoExpr<String>) -> Self {
        Self::new(Expr::Function {
            name: "replace",
            args: vec![self.expr, from.into_expr(), to.into_expr()],
        })
    }

    #[must_use]
    pub fn concat(self, other: impl IntoExpr<String>) -> Self {
        Self::new(Expr::binary(self.expr, BinaryOp::Concat, other.into_expr()))
    }
}

/// Escape the `LIKE` wildcards in `input` with `\`.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// A searched `CASE WHEN condition THEN value ... ELSE value END` producing `V`.
pub struct CaseBuilder<V> {
    whens: Vec<(Expr, Expr)>,
    marker: PhantomData<fn() -> V>,
}

impl<V: ColumnType> Default for CaseBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: ColumnType> CaseBuilder<V> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            whens: Vec::new(),
            marker: PhantomData,
        }
    }

    #[must_use]
    pub fn when(mut self, condition: Condition, then: impl IntoExpr<V>) -> Self {
        self.whens.push((condition.into_expr(), then.into_expr()));
        self
    }

    pub fn otherwise(self, value: impl IntoExpr<V>) -> TypedExpr<V> {
        TypedExpr::new(Expr::Case {
            whens: self.whens,
            otherwise: Some(Box::new(value.into_expr())),
        })
    }

    /// Finish without an `ELSE` branch; unmatched rows yield `NULL`.
    #[must_use]
    pub fn end(self) -> TypedExpr<Option<V>> {
        TypedExpr::new(Expr::Case {
            whens: self.whens,
            otherwise: None,
        })
    }
}

/// A simple `CASE` comparing one operand against constants.
pub struct SimpleCase<T, V> {
    operand: Expr,
    whens: Vec<(Expr, Expr)>,
    marker: PhantomData<fn() -> (T, V)>,
}

impl<T: ColumnType, V: ColumnType> SimpleCase<T, V> {
    #[must_use]
    pub fn when(mut self, value: impl IntoExpr<T>, then: impl IntoExpr<V>) -> Self {
        let condition = Expr::binary(self.operand.clone(), BinaryOp::Equals, value.into_expr());
        self.whens.push((condition, then.into_expr()));
        self
    }

    pub fn otherwise(self, value: impl IntoExpr<V>) -> TypedExpr<V> {
        TypedExpr::new(Expr::Case {
            whens: self.whens,
            otherwise: Some(Box::new(value.into_expr())),
        })
    }
}

#[cfg(test)]
mod test {
    use super::{BinaryOp, ColumnName, Expr, TypedExpr, count_star};
    use crate::{
        config::DbType,
        query::{PushToQuery, Statement, StatementBuilder, value::Value},
    };

    fn render(expr: &Expr) -> Statement {
        let mut builder = StatementBuilder::new(DbType::Sqlite);
        assert!(expr.push_to(&mut builder).is_ok());
        builder.into_statement()
    }

    fn age() -> TypedExpr<i64> {
        TypedExpr::new(Expr::Column(ColumnName::new_with_table_or_alias(
            "member", "age",
        )))
    }

    fn username() -> TypedExpr<Option<String>> {
        TypedExpr::new(Expr::Column(ColumnName::new_with_table_or_alias(
            "member", "username",
        )))
    }

    #[test]
    fn arithmetic_renders_with_parameters() {
        let statement = render(&age().add(1).mul(2).into_expr());
        assert_eq!(statement.sql, "(\"member\".\"age\" + ?) * ?");
        assert_eq!(statement.params, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn same_operator_chains_stay_flat() {
        let statement = render(&age().add(1).add(2).into_expr());
        assert_eq!(statement.sql, "\"member\".\"age\" + ? + ?");
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let statement = render(&age().is_in(Vec::<i64>::new()).into_expr());
        assert_eq!(statement.sql, "1 = 0");
    }

    #[test]
    fn text_helpers_build_like_patterns() {
        let statement = render(&username().contains("mem").into_expr());
        assert_eq!(statement.sql, r#""member"."username" LIKE ? ESCAPE '\'"#);
        assert_eq!(statement.params, vec![Value::Text("%mem%".to_string())]);

        let statement = render(&username().like("mem_").into_expr());
        assert_eq!(statement.sql, r#""member"."username" LIKE ?"#);
    }

    #[test]
    fn wildcards_in_needles_are_escaped() {
        let statement = render(&username().contains(r"50%_a\b").into_expr());
        assert_eq!(
            statement.params,
            vec![Value::Text(r"%50\%\_a\\b%".to_string())]
        );

        let statement = render(&username().starts_with("a_").into_expr());
        assert_eq!(statement.params, vec![Value::Text(r"a\_%".to_string())]);
    }

    #[test]
    fn comparisons_are_not_bracketed_under_logical_operators() {
        let condition = age().gt(1).and(age().between(2, 3)).or(username().is_null());
        assert_eq!(
            render(&condition.into_expr()).sql,
            "(\"member\".\"age\" > ? AND \"member\".\"age\" BETWEEN ? AND ?) OR \"member\".\"username\" IS NULL"
        );
    }

    #[test]
    fn equality_with_null_uses_is_null() {
        let statement = render(&username().eq(None::<String>).into_expr());
        assert_eq!(statement.sql, "\"member\".\"username\" IS NULL");
        assert!(statement.params.is_empty());

        let statement = render(&username().ne(None::<String>).into_expr());
        assert_eq!(statement.sql, "\"member\".\"username\" IS NOT NULL");

        let statement = render(&username().eq(Some("a".to_string())).into_expr());
        assert_eq!(statement.sql, "\"member\".\"username\" = ?");
    }

    #[test]
    fn concat_and_cast() {
        let expr = username().concat("_").concat(age().string_value());
        let statement = render(&expr.into_expr());
        assert_eq!(
            statement.sql,
            "\"member\".\"username\" || ? || CAST(\"member\".\"age\" AS TEXT)"
        );
    }

    #[test]
    fn simple_case_expands_to_searched_case() {
        let expr = age()
            .case::<String>()
            .when(10, "ten")
            .when(20, "twenty")
            .otherwise("other");
        let statement = render(&expr.into_expr());
        assert_eq!(
            statement.sql,
            "CASE WHEN \"member\".\"age\" = ? THEN ? WHEN \"member\".\"age\" = ? THEN ? ELSE ? END"
        );
        assert_eq!(statement.params.len(), 5);
    }

    #[test]
    fn null_checks_and_count() {
        assert_eq!(
            render(&username().is_null().into_expr()).sql,
            "\"member\".\"username\" IS NULL"
        );
        assert_eq!(render(&count_star().into_expr()).sql, "COUNT(*)");
    }

    #[test]
    fn visit_columns_skips_values() {
        let expr = Expr::binary(
            age().into_expr(),
            BinaryOp::Lt,
            Expr::Value(Value::Int(3)),
        );
        let mut seen = Vec::new();
        expr.visit_columns(&mut |c| seen.push(c.column_name().to_string()));
        assert_eq!(seen, vec!["age".to_string()]);
    }
}
