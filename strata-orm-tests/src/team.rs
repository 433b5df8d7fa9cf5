use strata_orm::{
    DatabaseModel,
    entity::relation::{HasMany, Loaded},
};

use crate::member;

#[derive(Debug, Clone, PartialEq, DatabaseModel)]
#[strata_orm(table = "team", primary_key = "id")]
pub struct Model {
    pub id: i64,
    pub name: String,
    #[strata_orm(relation)]
    pub members: Loaded<Vec<member::Model>>,
}

impl HasMany<member::Entity> for Entity {
    const PATH: &'static str = "members";

    fn collection_mut(model: &mut Model) -> &mut Loaded<Vec<member::Model>> {
        &mut model.members
    }
}
