use crate::query::{parse::ParseFromRow, value::Value};

use super::{Entity, column::Column};

/// A materialized row of an entity, as produced by `#[derive(DatabaseModel)]`.
pub trait Model: ParseFromRow + Clone + Send + Sync + 'static {
    type Entity: Entity<Model = Self>;

    /// The current value of the column named `column`, or `None` if the entity has no such
    /// column.
    fn value_of(&self, column: &str) -> Option<Value>;

    /// Whether the relationship field named `path` has been resolved. Always `false` for
    /// names that are not relationship fields.
    fn is_resolved(&self, path: &str) -> bool;

    /// The value of the primary key column.
    fn primary_key(&self) -> Value {
        self.value_of(<<Self::Entity as Entity>::PrimaryKeyColumn as Column>::NAME)
            .unwrap_or(Value::Null)
    }
}
