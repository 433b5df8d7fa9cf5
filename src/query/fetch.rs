use std::collections::HashMap;

use itertools::Itertools;
use sqlx::{Row, ValueRef, any::AnyRow};
use tracing::debug;

use crate::{
    entity::{
        Entity,
        column::Column,
        model::Model,
        relation::{HasMany, Loaded, Related},
    },
    error::Result,
    session::Session,
};

use super::{
    expr::{BinaryOp, ColumnName, Expr},
    join::{Join, JoinKind, JoinTarget},
    parse::ParseFromRow,
    predicate::Condition,
    select::{EntityColumns, SelectStatement},
    value::Value,
};

type Loader<M> = fn(&AnyRow, &str, &mut M) -> Result<()>;

struct FetchPath<T: Entity> {
    path: &'static str,
    table: &'static str,
    fk: &'static str,
    pk: &'static str,
    columns: &'static [&'static str],
    loader: Loader<T::Model>,
}

impl<T: Entity> Clone for FetchPath<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path,
            table: self.table,
            fk: self.fk,
            pk: self.pk,
            columns: self.columns,
            loader: self.loader,
        }
    }
}

impl<T: Entity> FetchPath<T> {
    fn prefix(&self) -> String {
        format!("fetch__{}__", self.path)
    }
}

/// The relationship paths of `T` that are populated in the same statement as `T` itself.
/// Everything else stays [`Loaded::Unresolved`].
pub struct FetchPlan<T: Entity> {
    paths: Vec<FetchPath<T>>,
}

impl<T: Entity> Clone for FetchPlan<T> {
    fn clone(&self) -> Self {
        Self {
            paths: self.paths.clone(),
        }
    }
}

impl<T: Entity> Default for FetchPlan<T> {
    fn default() -> Self {
        Self { paths: vec![] }
    }
}

impl<T: Entity> std::fmt::Debug for FetchPlan<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.paths.iter().map(|e| e.path))
            .finish()
    }
}

impl<T: Entity> FetchPlan<T> {
    /// Eagerly resolve the to-one relationship towards `R`.
    #[must_use]
    pub fn with<R>(mut self) -> Self
    where
        T: Related<R>,
        R: Entity,
    {
        if !self.contains(<T as Related<R>>::PATH) {
            self.paths.push(FetchPath {
                path: <T as Related<R>>::PATH,
                table: R::TABLE_NAME,
                fk: <T::FkColumn as Column>::NAME,
                pk: <R::PrimaryKeyColumn as Column>::NAME,
                columns: R::COLUMN_NAMES,
                loader: load_relation::<T, R>,
            });
        }
        self
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|e| e.path == path)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Join every path into `statement` and return the columns to select for them. An
    /// explicit join over the same relationship is reused instead of joining twice.
    pub(crate) fn apply(
        &self,
        statement: &mut SelectStatement,
        root_alias: &str,
    ) -> Vec<EntityColumns> {
        self.paths
            .iter()
            .map(|path| {
                let existing = statement.joins.iter().find_map(|join| match &join.target {
                    JoinTarget::Relation {
                        table,
                        alias,
                        local,
                        ..
                    } if *table == path.table && local.column_name() == path.fk => {
                        Some(alias.clone())
                    }
                    _ => None,
                });

                let alias = existing.unwrap_or_else(|| {
                    statement.joins.push(Join::new(
                        JoinKind::Left,
                        JoinTarget::Relation {
                            table: path.table,
                            alias: path.path.to_string(),
                            local: ColumnName::new_with_table_or_alias(root_alias, path.fk),
                            remote: ColumnName::new_with_table_or_alias(path.path, path.pk),
                        },
                        None,
                    ));
                    path.path.to_string()
                });

                EntityColumns::new(alias, path.prefix(), path.columns)
            })
            .collect()
    }

    /// Populate every fetched relationship of `model` from `row`.
    pub(crate) fn load(&self, row: &AnyRow, model: &mut T::Model) -> Result<()> {
        self.paths
            .iter()
            .try_for_each(|path| (path.loader)(row, &path.prefix(), model))
    }
}

/// Parse `R` from the columns starting with `prefix`, or `None` if the outer join found no
/// match (the primary key is `NULL`).
pub(crate) fn parse_optional<R: Entity>(row: &AnyRow, prefix: &str) -> Result<Option<R::Model>> {
    let key = format!("{prefix}{}", <R::PrimaryKeyColumn as Column>::NAME);
    if row.try_get_raw(key.as_str())?.is_null() {
        Ok(None)
    } else {
        R::Model::parse_from_row(row, prefix).map(Some)
    }
}

fn load_relation<T, R>(row: &AnyRow, prefix: &str, model: &mut T::Model) -> Result<()>
where
    T: Related<R>,
    R: Entity,
{
    *T::relation_mut(model) = Loaded::Resolved(parse_optional::<R>(row, prefix)?);
    Ok(())
}

/// Whether the relationship field `path` of `model` has been resolved.
pub fn is_resolved<M: Model>(model: &M, path: &str) -> bool {
    model.is_resolved(path)
}

fn key_condition(column: ColumnName, keys: Vec<Value>) -> Condition {
    Condition::from_expr(Expr::binary(
        Expr::Column(column),
        BinaryOp::In,
        Expr::List(keys.into_iter().map(Expr::Value).collect()),
    ))
}

/// Resolve the to-one relationship towards `R` on every model with a single `IN` query.
///
/// # Errors
///
/// If the query fails.
pub async fn resolve<T, R>(session: &mut Session, models: &mut [T::Model]) -> Result<()>
where
    T: Related<R>,
    R: Entity,
{
    let fk = <T::FkColumn as Column>::NAME;
    let keys = models
        .iter()
        .filter_map(|e| e.value_of(fk))
        .filter(|e| !e.is_null())
        .unique_by(Value::identity_key)
        .collect::<Vec<_>>();

    let mut related: HashMap<String, R::Model> = HashMap::new();
    if !keys.is_empty() {
        let relation = <T as Related<R>>::PATH;
        debug!(relation, keys = keys.len(), "resolving relationship");

        related = R::find()
            .filter(key_condition(
                <R::PrimaryKeyColumn as Column>::full_column_name(),
                keys,
            ))
            .all(session)
            .await?
            .into_iter()
            .map(|e| (e.primary_key().identity_key(), e))
            .collect();
    }

    for model in models.iter_mut() {
        let target = model
            .value_of(fk)
            .and_then(|key| related.get(&key.identity_key()).cloned());
        *T::relation_mut(model) = Loaded::Resolved(target);
    }

    Ok(())
}

/// Resolve the collection of `R` pointing at every model with a single `IN` query. Members
/// of each collection are ordered by primary key.
///
/// # Errors
///
/// If the query fails.
pub async fn resolve_many<T, R>(session: &mut Session, models: &mut [T::Model]) -> Result<()>
where
    T: HasMany<R>,
    R: Related<T>,
{
    let keys = models
        .iter()
        .map(Model::primary_key)
        .filter(|e| !e.is_null())
        .unique_by(Value::identity_key)
        .collect::<Vec<_>>();

    let fk = <R::FkColumn as Column>::NAME;
    let mut groups: HashMap<String, Vec<R::Model>> = HashMap::new();
    if !keys.is_empty() {
        let relation = <T as HasMany<R>>::PATH;
        debug!(relation, keys = keys.len(), "resolving collection");

        groups = R::find()
            .filter(key_condition(
                <R::FkColumn as Column>::full_column_name(),
                keys,
            ))
            .order_by(<R::PrimaryKeyColumn as Column>::expr().asc())
            .all(session)
            .await?
            .into_iter()
            .into_group_map_by(|e| e.value_of(fk).unwrap_or(Value::Null).identity_key());
    }

    for model in models.iter_mut() {
        let members = groups
            .remove(&model.primary_key().identity_key())
            .unwrap_or_default();
        *T::collection_mut(model) = Loaded::Resolved(members);
    }

    Ok(())
}
