use serde::Serialize;
use strata_orm::Projection;

/// A member reduced to username and age. Bindable through every strategy, so the three can
/// be compared against each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Projection)]
#[strata_orm(fields, setters, constructor = "new")]
pub struct MemberDto {
    pub username: Option<String>,
    pub age: i64,
}

impl MemberDto {
    #[must_use]
    pub const fn new(username: Option<String>, age: i64) -> Self {
        Self { username, age }
    }

    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    pub const fn set_age(&mut self, age: i64) {
        self.age = age;
    }
}

/// Field names differ from the member columns, so every item has to be aliased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Projection)]
#[strata_orm(fields, constructor = "new")]
pub struct UserDto {
    pub name: Option<String>,
    pub age: i64,
}

impl UserDto {
    #[must_use]
    pub const fn new(name: Option<String>, age: i64) -> Self {
        Self { name, age }
    }
}

/// A member together with its team, as returned by the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Projection)]
#[strata_orm(fields, constructor = "new")]
pub struct MemberTeamDto {
    pub member_id: i64,
    pub username: Option<String>,
    pub age: i64,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
}

impl MemberTeamDto {
    #[must_use]
    pub const fn new(
        member_id: i64,
        username: Option<String>,
        age: i64,
        team_id: Option<i64>,
        team_name: Option<String>,
    ) -> Self {
        Self {
            member_id,
            username,
            age,
            team_id,
            team_name,
        }
    }
}
