use strata_orm::{
    DatabaseModel,
    entity::relation::{Loaded, ManyToOne, Related},
};

use crate::team;

#[derive(Debug, Clone, PartialEq, DatabaseModel)]
#[strata_orm(table = "member", primary_key = "id")]
pub struct Model {
    pub id: i64,
    pub username: Option<String>,
    pub age: i64,
    pub team_id: Option<i64>,
    #[strata_orm(relation)]
    pub team: Loaded<Option<team::Model>>,
}

impl Related<team::Entity> for Entity {
    type FkColumn = columns::TeamId;

    type RelationType = ManyToOne;

    const PATH: &'static str = "team";

    fn relation_mut(model: &mut Model) -> &mut Loaded<Option<team::Model>> {
        &mut model.team
    }
}
