use std::{any::Any as StdAny, collections::HashMap};

use futures::TryStreamExt;
use sqlx::{AnyConnection, Connection, Row, any::AnyRow};
use tracing::debug;

use crate::{
    config::{DbType, IN_MEMORY_URL, get_database_url},
    entity::{Entity, column::Column, model::Model},
    error::{Error, Result},
    query::{
        Statement,
        predicate::Condition,
        value::{ColumnType, Value},
    },
};

type IdentityKey = (&'static str, String);

/// A unit of work: one connection, the dialect spoken on it, and the identity map of every
/// entity materialized through it.
///
/// Statements run strictly in the order they are submitted. Reads refresh the identity map,
/// bulk mutations clear it.
pub struct Session {
    conn: AnyConnection,
    db: DbType,
    identity_map: HashMap<IdentityKey, Box<dyn StdAny + Send + Sync>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("db", &self.db)
            .field("cached", &self.identity_map.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a session on `url`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedQueryShape`] for connection strings of unknown databases, or
    /// whatever the driver reports when connecting.
    pub async fn connect(url: &str) -> Result<Self> {
        let db = DbType::from_connection_string(url)
            .ok_or_else(|| Error::unsupported(format!("unknown database in `{url}`")))?;

        sqlx::any::install_default_drivers();
        let conn = AnyConnection::connect(url).await?;
        debug!(?db, "session opened");

        Ok(Self {
            conn,
            db,
            identity_map: HashMap::new(),
        })
    }

    /// Open a session on `DATABASE_URL`, or on a fresh in-memory SQLite database when it is
    /// not configured.
    ///
    /// # Errors
    ///
    /// See [`Session::connect`].
    pub async fn from_env() -> Result<Self> {
        let url = get_database_url().unwrap_or_else(|| IN_MEMORY_URL.to_string());
        Self::connect(&url).await
    }

    #[must_use]
    pub const fn db_type(&self) -> DbType {
        self.db
    }

    /// The underlying connection, e.g. for schema setup. Writes through it bypass the identity
    /// map.
    pub fn connection(&mut self) -> &mut AnyConnection {
        &mut self.conn
    }

    /// # Errors
    ///
    /// Whatever the driver reports.
    pub async fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<AnyRow>> {
        debug!(sql = %statement.sql, params = statement.params.len(), "fetch");
        Ok(statement.query().fetch(&mut self.conn).try_collect().await?)
    }

    /// Run a `COUNT(*)` statement.
    ///
    /// # Errors
    ///
    /// Whatever the driver reports.
    pub async fn fetch_count(&mut self, statement: &Statement) -> Result<u64> {
        debug!(sql = %statement.sql, params = statement.params.len(), "count");
        let row = statement.query().fetch_one(&mut self.conn).await?;
        let count = row.try_get::<i64, _>(0)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Run a statement without result rows and return the number of affected rows.
    ///
    /// # Errors
    ///
    /// Whatever the driver reports.
    pub async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        debug!(sql = %statement.sql, params = statement.params.len(), "execute");
        Ok(statement.query().execute(&mut self.conn).await?.rows_affected())
    }

    fn key_of<E: Entity>(id: &Value) -> IdentityKey {
        (E::TABLE_NAME, id.identity_key())
    }

    /// The entity with primary key `id`, served from the identity map when present.
    ///
    /// # Errors
    ///
    /// If the lookup statement fails.
    pub async fn find<E: Entity>(
        &mut self,
        id: <E::PrimaryKeyColumn as Column>::Type,
    ) -> Result<Option<E::Model>> {
        let key = Self::key_of::<E>(&id.clone().into_value());
        if let Some(cached) = self.lookup::<E>(&key) {
            return Ok(Some(cached));
        }

        let condition: Condition = <E::PrimaryKeyColumn as Column>::expr().eq(id);
        E::find().filter(condition).first(self).await
    }

    /// The cached copy of the entity with primary key `id`, without touching the database.
    pub fn find_cached<E: Entity>(
        &self,
        id: <E::PrimaryKeyColumn as Column>::Type,
    ) -> Option<E::Model> {
        self.lookup::<E>(&Self::key_of::<E>(&id.into_value()))
    }

    fn lookup<E: Entity>(&self, key: &IdentityKey) -> Option<E::Model> {
        self.identity_map
            .get(key)
            .and_then(|e| e.downcast_ref::<E::Model>())
            .cloned()
    }

    /// Store `model` in the identity map, replacing any previous copy.
    pub fn remember<E: Entity>(&mut self, model: E::Model) {
        let key = Self::key_of::<E>(&model.primary_key());
        self.identity_map.insert(key, Box::new(model));
    }

    /// Drop every cached copy of `E`.
    pub fn invalidate<E: Entity>(&mut self) {
        let before = self.identity_map.len();
        self.identity_map.retain(|(table, _), _| *table != E::TABLE_NAME);
        debug!(
            table = E::TABLE_NAME,
            dropped = before - self.identity_map.len(),
            "identity map invalidated"
        );
    }

    /// Drop every cached entity.
    pub fn clear(&mut self) {
        debug!(dropped = self.identity_map.len(), "identity map cleared");
        self.identity_map.clear();
    }

    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.identity_map.len()
    }
}
