pub mod column;
pub mod model;
pub mod relation;

use column::Column;
use model::Model;

use crate::query::{
    mutation::{Delete, Update},
    select::Select,
};

pub trait Entity: Sized + Send + Sync + 'static {
    type PrimaryKeyColumn: Column<Entity = Self>;

    type Model: Model<Entity = Self>;

    /// The name of this entity's table in the database.
    const TABLE_NAME: &'static str;

    /// Every column of the table, in declaration order.
    const COLUMN_NAMES: &'static [&'static str];

    fn find() -> Select<Self> {
        Select::<Self>::new()
    }

    /// Like [`Entity::find`], but the table is referred to as `alias`. Needed whenever the
    /// same table appears twice, e.g. in a subquery over the outer entity.
    fn find_as(alias: impl Into<String>) -> Select<Self> {
        Select::<Self>::aliased(alias)
    }

    /// A set-based `UPDATE` over every row matching its filters.
    fn update() -> Update<Self> {
        Update::<Self>::new()
    }

    /// A set-based `DELETE` over every row matching its filters.
    fn delete() -> Delete<Self> {
        Delete::<Self>::new()
    }
}
