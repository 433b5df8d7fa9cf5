use std::marker::PhantomData;

use sqlx::any::AnyRow;
use tracing::trace;

use crate::{
    config::DbType,
    entity::{
        Entity,
        column::Column,
        relation::{InverseRelated, Related},
    },
    error::{Error, Result},
    session::Session,
};

use super::{
    PushToQuery, Statement, StatementBuilder,
    expr::{ColumnName, Expr, TypedExpr, count_star},
    fetch::{FetchPlan, parse_optional},
    join::{Join, JoinKind, JoinTarget},
    order::OrderSpec,
    pagination::{CountPolicy, Page, PageRequest, derive_total},
    parse::ParseFromRow,
    predicate::Condition,
    projection::{Projection, RowMapper, ScalarMapper, SelectItem, TupleMapper},
    push_conjunction,
    value::ColumnType,
};

/// What a statement selects from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Table { table: &'static str, alias: String },
    /// A derived table. Never translatable, kept so the rejection is explicit.
    Subquery {
        statement: Box<SelectStatement>,
        alias: String,
    },
}

impl Source {
    #[must_use]
    pub fn alias(&self) -> &str {
        match self {
            Self::Table { alias, .. } | Self::Subquery { alias, .. } => alias,
        }
    }
}

impl PushToQuery for Source {
    fn push_to(&self, builder: &mut StatementBuilder) -> Result<()> {
        match self {
            Self::Table { table, alias } => {
                builder.push_identifier(table);
                if alias != table {
                    builder.push(" AS ").push_identifier(alias);
                }
                Ok(())
            }
            Self::Subquery { alias, .. } => Err(Error::unsupported(format!(
                "subquery `{alias}` in FROM position"
            ))),
        }
    }
}

/// All columns of one entity occurrence, selected as `"alias"."column" AS "<prefix>column"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityColumns {
    alias: String,
    prefix: String,
    columns: &'static [&'static str],
}

impl EntityColumns {
    pub(crate) const fn new(
        alias: String,
        prefix: String,
        columns: &'static [&'static str],
    ) -> Self {
        Self {
            alias,
            prefix,
            columns,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectList {
    Entities(Vec<EntityColumns>),
    Items(Vec<SelectItem>),
}

impl PushToQuery for SelectList {
    fn push_to(&self, builder: &mut StatementBuilder) -> Result<()> {
        match self {
            Self::Entities(entities) => {
                let mut first = true;
                for entity in entities {
                    for column in entity.columns {
                        if !first {
                            builder.push(", ");
                        }
                        first = false;
                        ColumnName::new_with_table_or_alias(entity.alias.as_str(), *column)
                            .push_to(builder)?;
                        builder
                            .push(" AS ")
                            .push_identifier(&format!("{}{column}", entity.prefix));
                    }
                }
                if first {
                    return Err(Error::unsupported("entity without columns"));
                }
                Ok(())
            }
            Self::Items(items) if items.is_empty() => {
                Err(Error::unsupported("empty select list"))
            }
            Self::Items(items) => builder.push_separated(items, ", "),
        }
    }
}

/// The clause tree of one `SELECT`. Built up by [`Select`] and translated in one go.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub(crate) source: Source,
    pub(crate) select_list: SelectList,
    pub(crate) joins: Vec<Join>,
    pub(crate) conditions: Vec<Expr>,
    pub(crate) group_by: Vec<Expr>,
    pub(crate) having: Vec<Expr>,
    pub(crate) order_by: Vec<OrderSpec>,
    pub(crate) offset: Option<u64>,
    pub(crate) limit: Option<u64>,
}

impl SelectStatement {
    fn new(source: Source) -> Self {
        Self {
            source,
            select_list: SelectList::Items(vec![]),
            joins: vec![],
            conditions: vec![],
            group_by: vec![],
            having: vec![],
            order_by: vec![],
            offset: None,
            limit: None,
        }
    }

    #[must_use]
    pub const fn source(&self) -> &Source {
        &self.source
    }

    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    #[must_use]
    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }

    /// Translate into executable SQL for `db`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedQueryShape`] if some clause has no translation.
    pub fn to_statement(&self, db: DbType) -> Result<Statement> {
        let mut builder = StatementBuilder::new(db);
        self.push_to(&mut builder)?;
        Ok(builder.into_statement())
    }

    /// The total-count statement over the same rows: same source, joins and filters, no
    /// ordering or window, `COUNT(*)` in place of the select list.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedQueryShape`] for grouped statements.
    pub fn count_statement(&self, db: DbType) -> Result<Statement> {
        if self.is_grouped() {
            return Err(Error::unsupported("counting the rows of a grouped select"));
        }

        let mut count = self.clone();
        count.select_list = SelectList::Items(vec![count_star().item()]);
        count.order_by.clear();
        count.offset = None;
        count.limit = None;
        count.to_statement(db)
    }

    fn push_window(&self, builder: &mut StatementBuilder) {
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                builder.push(format_args!(" LIMIT {limit} OFFSET {offset}"));
            }
            (Some(limit), None) => {
                builder.push(format_args!(" LIMIT {limit}"));
            }
            (None, Some(offset)) => match builder.db() {
                DbType::Sqlite => {
                    builder.push(format_args!(" LIMIT -1 OFFSET {offset}"));
                }
                DbType::MySql => {
                    builder.push(format_args!(" LIMIT {} OFFSET {offset}", u64::MAX));
                }
                DbType::Postgres => {
                    builder.push(format_args!(" OFFSET {offset}"));
                }
            },
            (None, None) => {}
        }
    }
}

impl PushToQuery for SelectStatement {
    fn push_to(&self, builder: &mut StatementBuilder) -> Result<()> {
        builder.push("SELECT ");
        self.select_list.push_to(builder)?;

        builder.push(" FROM ");
        self.source.push_to(builder)?;
        for join in &self.joins {
            join.push_to(builder)?;
        }

        if !self.conditions.is_empty() {
            builder.push(" WHERE ");
            push_conjunction(builder, &self.conditions)?;
        }

        if !self.group_by.is_empty() {
            builder.push(" GROUP BY ");
            builder.push_separated(&self.group_by, ", ")?;
        }

        if !self.having.is_empty() {
            if self.group_by.is_empty() {
                return Err(Error::unsupported("HAVING without GROUP BY"));
            }
            builder.push(" HAVING ");
            push_conjunction(builder, &self.having)?;
        }

        if !self.order_by.is_empty() {
            builder.push(" ORDER BY ");
            builder.push_separated(&self.order_by, ", ")?;
        }

        self.push_window(builder);
        Ok(())
    }
}

/// A query over the entity `T`, optionally joined, filtered, grouped, ordered and windowed.
/// Nothing is translated until a terminal operation runs.
pub struct Select<T>
where
    T: Entity,
{
    statement: SelectStatement,
    fetch: FetchPlan<T>,
}

impl<T: Entity> Clone for Select<T> {
    fn clone(&self) -> Self {
        Self {
            statement: self.statement.clone(),
            fetch: self.fetch.clone(),
        }
    }
}

impl<T: Entity> std::fmt::Debug for Select<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Select")
            .field("statement", &self.statement)
            .field("fetch", &self.fetch)
            .finish()
    }
}

impl<T> Select<T>
where
    T: Entity,
{
    pub(crate) fn new() -> Self {
        Self::aliased(T::TABLE_NAME)
    }

    pub(crate) fn aliased(alias: impl Into<String>) -> Self {
        Self {
            statement: SelectStatement::new(Source::Table {
                table: T::TABLE_NAME,
                alias: alias.into(),
            }),
            fetch: FetchPlan::default(),
        }
    }

    /// Select `T` from a derived table. Such statements are never translated, every
    /// terminal operation fails with [`Error::UnsupportedQueryShape`].
    ///
    /// # Errors
    ///
    /// If `subquery` itself cannot be prepared.
    pub fn from_subquery<M: RowMapper>(
        subquery: ProjectedSelect<M>,
        alias: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            statement: SelectStatement::new(Source::Subquery {
                statement: Box::new(subquery.into_statement()?),
                alias: alias.into(),
            }),
            fetch: FetchPlan::default(),
        })
    }

    /// The alias `T` is referred to by in this statement.
    #[must_use]
    pub fn alias(&self) -> &str {
        self.statement.source.alias()
    }

    /// Append a new `WHERE` condition using an `AND` statement as glue. The passed condition is
    /// wrapped in `()` brackets.
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.statement.conditions.push(condition.into_expr());
        self
    }

    /// Like [`Select::filter`]; `None` leaves the statement untouched.
    #[must_use]
    pub fn filter_opt(self, condition: Option<Condition>) -> Self {
        match condition {
            Some(condition) => self.filter(condition),
            None => self,
        }
    }

    /// Append every present condition; absent ones are skipped.
    #[must_use]
    pub fn filter_all(mut self, conditions: impl IntoIterator<Item = Option<Condition>>) -> Self {
        self.statement
            .conditions
            .extend(conditions.into_iter().flatten().map(Condition::into_expr));
        self
    }

    /// Append an arbitrary join.
    #[must_use]
    pub fn push_join(mut self, join: Join) -> Self {
        self.statement.joins.push(join);
        self
    }

    fn relation_target<R>(&self) -> JoinTarget
    where
        T: Related<R>,
        R: Entity,
    {
        JoinTarget::Relation {
            table: R::TABLE_NAME,
            alias: R::TABLE_NAME.to_string(),
            local: <T::FkColumn as Column>::aliased_column_name(self.alias()),
            remote: <R::PrimaryKeyColumn as Column>::full_column_name(),
        }
    }

    fn inverse_target<R>(&self) -> JoinTarget
    where
        T: InverseRelated<R>,
        R: Related<T>,
    {
        JoinTarget::Relation {
            table: R::TABLE_NAME,
            alias: R::TABLE_NAME.to_string(),
            local: <T::PrimaryKeyColumn as Column>::aliased_column_name(self.alias()),
            remote: <R::FkColumn as Column>::full_column_name(),
        }
    }

    fn unrelated<R: Entity>(kind: JoinKind, on: Option<Condition>) -> Join {
        Join::new(
            kind,
            JoinTarget::Unrelated {
                table: R::TABLE_NAME,
                alias: R::TABLE_NAME.to_string(),
            },
            on.map(Condition::into_expr),
        )
    }

    /// `INNER JOIN` the entity `T` refers to through its foreign key.
    #[must_use]
    pub fn join<R>(self) -> Self
    where
        T: Related<R>,
        R: Entity,
    {
        let target = self.relation_target::<R>();
        self.push_join(Join::new(JoinKind::Inner, target, None))
    }

    /// `LEFT JOIN` the entity `T` refers to through its foreign key.
    #[must_use]
    pub fn left_join<R>(self) -> Self
    where
        T: Related<R>,
        R: Entity,
    {
        let target = self.relation_target::<R>();
        self.push_join(Join::new(JoinKind::Left, target, None))
    }

    /// `LEFT JOIN` over the declared relationship, refined by an extra predicate in the `ON`
    /// clause, e.g. only teams named `teamA`.
    #[must_use]
    pub fn left_join_on<R>(self, condition: Condition) -> Self
    where
        T: Related<R>,
        R: Entity,
    {
        let target = self.relation_target::<R>();
        self.push_join(Join::new(
            JoinKind::Left,
            target,
            Some(condition.into_expr()),
        ))
    }

    /// `INNER JOIN` the entities referring to `T`, e.g. the members of a team.
    #[must_use]
    pub fn join_inverse<R>(self) -> Self
    where
        T: InverseRelated<R>,
        R: Related<T>,
    {
        let target = self.inverse_target::<R>();
        self.push_join(Join::new(JoinKind::Inner, target, None))
    }

    /// `LEFT JOIN` the entities referring to `T`.
    #[must_use]
    pub fn left_join_inverse<R>(self) -> Self
    where
        T: InverseRelated<R>,
        R: Related<T>,
    {
        let target = self.inverse_target::<R>();
        self.push_join(Join::new(JoinKind::Left, target, None))
    }

    /// Add `R` without any relationship (theta join). Rows are paired by the conditions passed
    /// to [`Select::filter`], e.g. `member.username = team.name`.
    #[must_use]
    pub fn theta_join<R: Entity>(self) -> Self {
        self.push_join(Self::unrelated::<R>(JoinKind::Inner, None))
    }

    /// `INNER JOIN` an unrelated entity on an arbitrary predicate.
    #[must_use]
    pub fn join_on<R: Entity>(self, condition: Condition) -> Self {
        self.push_join(Self::unrelated::<R>(JoinKind::Inner, Some(condition)))
    }

    /// `LEFT JOIN` an unrelated entity on an arbitrary predicate. Rows of `T` without a match
    /// are kept with an empty `R` side.
    #[must_use]
    pub fn left_join_unrelated<R: Entity>(self, condition: Condition) -> Self {
        self.push_join(Self::unrelated::<R>(JoinKind::Left, Some(condition)))
    }

    /// Eagerly resolve the relationship towards `R` in the same statement.
    #[must_use]
    pub fn fetch<R>(mut self) -> Self
    where
        T: Related<R>,
        R: Entity,
    {
        self.fetch = self.fetch.with::<R>();
        self
    }

    /// Replace the fetch plan.
    #[must_use]
    pub fn with_fetch_plan(mut self, plan: FetchPlan<T>) -> Self {
        self.fetch = plan;
        self
    }

    /// Append an ordering key. Keys apply in the order they are added.
    #[must_use]
    pub fn order_by(mut self, order: OrderSpec) -> Self {
        self.statement.order_by.push(order);
        self
    }

    #[must_use]
    pub fn group_by<V>(mut self, expr: TypedExpr<V>) -> Self {
        self.statement.group_by.push(expr.into_expr());
        self
    }

    #[must_use]
    pub fn having(mut self, condition: Condition) -> Self {
        self.statement.having.push(condition.into_expr());
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.statement.offset = Some(offset);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.statement.limit = Some(limit);
        self
    }

    fn into_projected<M: RowMapper>(self, mapper: M) -> ProjectedSelect<M> {
        ProjectedSelect {
            statement: self.statement,
            mapper,
        }
    }

    fn into_entities(self) -> ProjectedSelect<EntityMapper<T>> {
        let Self { statement, fetch } = self;
        ProjectedSelect {
            statement,
            mapper: EntityMapper { fetch },
        }
    }

    /// Select into a projection shape.
    #[must_use]
    pub fn project<D>(self, projection: Projection<D>) -> ProjectedSelect<Projection<D>> {
        self.into_projected(projection)
    }

    /// Select a flat tuple of expressions.
    #[must_use]
    pub fn select_tuple(
        self,
        items: impl IntoIterator<Item = SelectItem>,
    ) -> ProjectedSelect<TupleMapper> {
        self.into_projected(TupleMapper::new(items))
    }

    /// Select a single expression.
    #[must_use]
    pub fn select_scalar<V: ColumnType>(
        self,
        expr: TypedExpr<V>,
    ) -> ProjectedSelect<ScalarMapper<V>> {
        self.into_projected(ScalarMapper::new(expr))
    }

    /// Select `T` together with the joined entity `R`. With an outer join, the `R` side is
    /// `None` for rows without a match.
    #[must_use]
    pub fn with_joined<R: Entity>(self) -> ProjectedSelect<PairMapper<T, R>> {
        let Self { statement, fetch } = self;
        ProjectedSelect {
            statement,
            mapper: PairMapper {
                root: EntityMapper { fetch },
                marker: PhantomData,
            },
        }
    }

    /// The translated entity statement.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedQueryShape`] if some clause has no translation.
    pub fn statement(&self, db: DbType) -> Result<Statement> {
        self.clone().into_entities().statement(db)
    }

    /// Return the raw SQL query of this statement, rendered for SQLite.
    ///
    /// This is mainly useful for debugging purposes, and not intended to produce queries to be run
    /// on an actual database.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedQueryShape`] if some clause has no translation.
    pub fn query(&self) -> Result<String> {
        Ok(self.statement(DbType::default())?.sql)
    }

    /// Execute the query, returning all results.
    ///
    /// # Errors
    ///
    /// If the statement cannot be translated or executed.
    pub async fn all(self, session: &mut Session) -> Result<Vec<T::Model>> {
        self.into_entities().all(session).await
    }

    /// Execute the query, returning exactly one result.
    ///
    /// # Errors
    ///
    /// [`sqlx::Error::RowNotFound`] if nothing matched, [`Error::UnsupportedQueryShape`] if more
    /// than one row did.
    pub async fn one(self, session: &mut Session) -> Result<T::Model> {
        self.into_entities().one(session).await
    }

    /// Execute the query, returning the first result if there is one.
    ///
    /// # Errors
    ///
    /// If the statement cannot be translated or executed.
    pub async fn first(self, session: &mut Session) -> Result<Option<T::Model>> {
        self.into_entities().first(session).await
    }

    /// Count the matching rows.
    ///
    /// # Errors
    ///
    /// If the statement cannot be translated or executed.
    pub async fn count(self, session: &mut Session) -> Result<u64> {
        self.into_entities().count(session).await
    }

    /// One page of entities; the count statement is skipped when the page proves the total.
    ///
    /// # Errors
    ///
    /// If a statement cannot be translated or executed.
    pub async fn page(self, session: &mut Session, request: PageRequest) -> Result<Page<T::Model>> {
        self.into_entities().page(session, request).await
    }

    /// One page of entities, always running the count statement.
    ///
    /// # Errors
    ///
    /// If a statement cannot be translated or executed.
    pub async fn page_with_count(
        self,
        session: &mut Session,
        request: PageRequest,
    ) -> Result<Page<T::Model>> {
        self.into_entities().page_with_count(session, request).await
    }
}

/// Materializes whole entities, including fetched relationships.
pub struct EntityMapper<T: Entity> {
    fetch: FetchPlan<T>,
}

impl<T: Entity> RowMapper for EntityMapper<T> {
    type Output = T::Model;

    fn prepare(&self, statement: &mut SelectStatement) -> Result<()> {
        let root = statement.source.alias().to_string();
        let fetched = self.fetch.apply(statement, &root);

        let mut entities = vec![EntityColumns::new(root, String::new(), T::COLUMN_NAMES)];
        entities.extend(fetched);
        statement.select_list = SelectList::Entities(entities);
        Ok(())
    }

    fn map_row(&self, row: &AnyRow) -> Result<T::Model> {
        let mut model = T::Model::parse_from_row(row, "")?;
        self.fetch.load(row, &mut model)?;
        Ok(model)
    }

    fn remember(&self, output: &T::Model, session: &mut Session) {
        session.remember::<T>(output.clone());
    }
}

/// Materializes `T` and an explicitly joined `R` from the same row.
pub struct PairMapper<T: Entity, R: Entity> {
    root: EntityMapper<T>,
    marker: PhantomData<fn() -> R>,
}

impl<T: Entity, R: Entity> PairMapper<T, R> {
    fn joined_alias(statement: &SelectStatement) -> Result<String> {
        statement
            .joins
            .iter()
            .find(|e| e.target.table() == R::TABLE_NAME)
            .map(|e| e.target.alias().to_string())
            .ok_or_else(|| {
                Error::unsupported(format!(
                    "`{}` must be joined before it can be selected",
                    R::TABLE_NAME
                ))
            })
    }

    fn prefix() -> String {
        format!("joined__{}__", R::TABLE_NAME)
    }
}

impl<T: Entity, R: Entity> RowMapper for PairMapper<T, R> {
    type Output = (T::Model, Option<R::Model>);

    fn prepare(&self, statement: &mut SelectStatement) -> Result<()> {
        let alias = Self::joined_alias(statement)?;
        self.root.prepare(statement)?;
        if let SelectList::Entities(entities) = &mut statement.select_list {
            entities.push(EntityColumns::new(alias, Self::prefix(), R::COLUMN_NAMES));
        }
        Ok(())
    }

    fn map_row(&self, row: &AnyRow) -> Result<Self::Output> {
        Ok((
            self.root.map_row(row)?,
            parse_optional::<R>(row, &Self::prefix())?,
        ))
    }

    fn remember(&self, output: &Self::Output, session: &mut Session) {
        self.root.remember(&output.0, session);
        if let Some(joined) = &output.1 {
            session.remember::<R>(joined.clone());
        }
    }
}

/// A query whose rows are turned into outputs by the row mapper `M`.
pub struct ProjectedSelect<M> {
    statement: SelectStatement,
    mapper: M,
}

impl<M: RowMapper> ProjectedSelect<M> {
    fn prepared(&self) -> Result<SelectStatement> {
        let mut statement = self.statement.clone();
        self.mapper.prepare(&mut statement)?;
        Ok(statement)
    }

    /// The clause tree with the select list filled in.
    ///
    /// # Errors
    ///
    /// If the mapper rejects the shape.
    pub fn into_statement(self) -> Result<SelectStatement> {
        self.prepared()
    }

    /// The translated statement.
    ///
    /// # Errors
    ///
    /// [`Error::ProjectionBinding`] or [`Error::UnsupportedQueryShape`].
    pub fn statement(&self, db: DbType) -> Result<Statement> {
        self.prepared()?.to_statement(db)
    }

    async fn run(
        &self,
        session: &mut Session,
        statement: &SelectStatement,
    ) -> Result<Vec<M::Output>> {
        let rows = session
            .fetch_all(&statement.to_statement(session.db_type())?)
            .await?;
        let outputs = rows
            .iter()
            .map(|row| self.mapper.map_row(row))
            .collect::<Result<Vec<_>>>()?;
        for output in &outputs {
            self.mapper.remember(output, session);
        }
        Ok(outputs)
    }

    /// # Errors
    ///
    /// If the statement cannot be translated or executed, or a row cannot be mapped.
    pub async fn all(self, session: &mut Session) -> Result<Vec<M::Output>> {
        let statement = self.prepared()?;
        self.run(session, &statement).await
    }

    /// # Errors
    ///
    /// [`sqlx::Error::RowNotFound`] if nothing matched, [`Error::UnsupportedQueryShape`] if more
    /// than one row did.
    pub async fn one(self, session: &mut Session) -> Result<M::Output> {
        let mut statement = self.prepared()?;
        statement.limit = Some(statement.limit.map_or(2, |e| e.min(2)));

        let mut outputs = self.run(session, &statement).await?;
        match outputs.len() {
            0 => Err(sqlx::Error::RowNotFound.into()),
            1 => outputs.pop().ok_or_else(|| sqlx::Error::RowNotFound.into()),
            _ => Err(Error::unsupported("expected exactly one row, found several")),
        }
    }

    /// # Errors
    ///
    /// If the statement cannot be translated or executed, or the row cannot be mapped.
    pub async fn first(self, session: &mut Session) -> Result<Option<M::Output>> {
        let mut statement = self.prepared()?;
        statement.limit = Some(1);
        Ok(self.run(session, &statement).await?.into_iter().next())
    }

    /// # Errors
    ///
    /// If the count statement cannot be translated or executed.
    pub async fn count(self, session: &mut Session) -> Result<u64> {
        let statement = self.prepared()?.count_statement(session.db_type())?;
        session.fetch_count(&statement).await
    }

    /// # Errors
    ///
    /// If a statement cannot be translated or executed.
    pub async fn page(self, session: &mut Session, request: PageRequest) -> Result<Page<M::Output>> {
        self.page_with_policy(session, request, CountPolicy::SkipWhenComplete)
            .await
    }

    /// # Errors
    ///
    /// If a statement cannot be translated or executed.
    pub async fn page_with_count(
        self,
        session: &mut Session,
        request: PageRequest,
    ) -> Result<Page<M::Output>> {
        self.page_with_policy(session, request, CountPolicy::Always)
            .await
    }

    /// Fetch the window `request`, and the total either counted or derived per `policy`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedQueryShape`] for grouped statements, or if a statement cannot be
    /// translated or executed.
    pub async fn page_with_policy(
        self,
        session: &mut Session,
        request: PageRequest,
        policy: CountPolicy,
    ) -> Result<Page<M::Output>> {
        let mut content = self.prepared()?;
        if content.is_grouped() {
            return Err(Error::unsupported("paging a grouped select"));
        }
        content.offset = Some(request.offset());
        content.limit = Some(request.limit());

        let items = self.run(session, &content).await?;
        let returned = u64::try_from(items.len()).unwrap_or(u64::MAX);

        let derived = match policy {
            CountPolicy::Always => None,
            CountPolicy::SkipWhenComplete => derive_total(request, returned),
        };

        let (total, count_executed) = if let Some(total) = derived {
            trace!(
                offset = request.offset(),
                limit = request.limit(),
                returned,
                "page is complete, skipping count statement"
            );
            (total, false)
        } else {
            let count = content.count_statement(session.db_type())?;
            (session.fetch_count(&count).await?, true)
        };

        Ok(Page {
            items,
            total,
            offset: request.offset(),
            limit: request.limit(),
            count_executed,
        })
    }
}

impl<V: ColumnType> ProjectedSelect<ScalarMapper<V>> {
    /// Use this single-column query as a subquery expression, e.g. in
    /// `age = (SELECT MAX(age) ...)` or as an aliased select item.
    #[must_use]
    pub fn into_subquery(self) -> TypedExpr<V> {
        let mut statement = self.statement;
        statement.select_list = SelectList::Items(vec![self.mapper.item]);
        TypedExpr::new(Expr::Subquery(Box::new(statement)))
    }
}
