extern crate self as strata_orm;

pub mod config;
pub mod entity;
pub mod error;
pub mod query;
pub mod session;

pub use error::{Error, Result};
pub use session::Session;

/// Derive macro implementing [`Model`](entity::model::Model) and generating the `Entity` and
/// `columns` items next to the annotated struct.
pub use strata_orm_macros::DatabaseModel;
/// Derive macro implementing the projection target traits of
/// [`projection`](query::projection).
pub use strata_orm_macros::Projection;

pub use sqlx;
