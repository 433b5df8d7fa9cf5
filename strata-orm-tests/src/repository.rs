use strata_orm::{
    Result, Session,
    entity::{
        Entity as _,
        column::{Column, ComparableColumn, RangeColumn},
    },
    query::{
        mutation::Update,
        pagination::{Page, PageRequest},
        predicate::Condition,
        projection::Projection,
        select::Select,
    },
};
use tracing::debug;

use crate::{dto::MemberTeamDto, member, team};

/// Optional search criteria over members. An absent field places no constraint; a present
/// one always does, even when it is an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberSearchCondition {
    pub username: Option<String>,
    pub team_name: Option<String>,
    pub age_goe: Option<i64>,
    pub age_loe: Option<i64>,
}

impl MemberSearchCondition {
    /// One condition per present field.
    ///
    /// # Errors
    ///
    /// [`strata_orm::Error::InvalidCondition`] if `age_goe > age_loe`.
    pub fn conditions(&self) -> Result<Vec<Option<Condition>>> {
        Ok(vec![
            self.username
                .as_deref()
                .map(member::columns::Username::eq),
            self.team_name.as_deref().map(team::columns::Name::eq),
            member::columns::Age::within(self.age_goe, self.age_loe)?,
        ])
    }
}

/// Search, paging and bulk mutation over members and their teams.
pub struct MemberRepository<'s> {
    session: &'s mut Session,
}

impl<'s> MemberRepository<'s> {
    pub const fn new(session: &'s mut Session) -> Self {
        Self { session }
    }

    fn projection() -> Projection<MemberTeamDto> {
        Projection::constructor([
            member::columns::Id::expr().alias("member_id"),
            member::columns::Username::expr().item(),
            member::columns::Age::expr().item(),
            team::columns::Id::expr().nullable().alias("team_id"),
            team::columns::Name::expr().nullable().alias("team_name"),
        ])
    }

    fn select(condition: &MemberSearchCondition) -> Result<Select<member::Entity>> {
        Ok(member::Entity::find()
            .left_join::<team::Entity>()
            .filter_all(condition.conditions()?))
    }

    /// Every member matching `condition`, ordered by id.
    ///
    /// # Errors
    ///
    /// If the condition is invalid or a statement fails.
    pub async fn search(&mut self, condition: &MemberSearchCondition) -> Result<Vec<MemberTeamDto>> {
        Self::select(condition)?
            .order_by(member::columns::Id::expr().asc())
            .project(Self::projection())
            .all(self.session)
            .await
    }

    /// One page of [`MemberRepository::search`], always running the count statement.
    ///
    /// # Errors
    ///
    /// If the condition is invalid or a statement fails.
    pub async fn search_page_simple(
        &mut self,
        condition: &MemberSearchCondition,
        request: PageRequest,
    ) -> Result<Page<MemberTeamDto>> {
        Self::select(condition)?
            .order_by(member::columns::Id::expr().asc())
            .project(Self::projection())
            .page_with_count(self.session, request)
            .await
    }

    /// One page of [`MemberRepository::search`]; the count statement only runs when the
    /// content page does not already prove the total.
    ///
    /// # Errors
    ///
    /// If the condition is invalid or a statement fails.
    pub async fn search_page_complex(
        &mut self,
        condition: &MemberSearchCondition,
        request: PageRequest,
    ) -> Result<Page<MemberTeamDto>> {
        let page = Self::select(condition)?
            .order_by(member::columns::Id::expr().asc())
            .project(Self::projection())
            .page(self.session, request)
            .await?;
        debug!(
            total = page.total,
            counted = page.count_executed,
            "member page"
        );
        Ok(page)
    }

    /// Apply `assignments` to every member matching `condition` in one statement. An absent
    /// condition updates every member.
    ///
    /// # Errors
    ///
    /// If the statement fails.
    pub async fn bulk_update(
        &mut self,
        condition: Option<Condition>,
        assignments: impl FnOnce(Update<member::Entity>) -> Update<member::Entity>,
    ) -> Result<u64> {
        assignments(member::Entity::update())
            .filter_opt(condition)
            .execute(self.session)
            .await
    }

    /// Delete every member matching `condition`. An absent condition deletes every member.
    ///
    /// # Errors
    ///
    /// If the statement fails.
    pub async fn bulk_delete(&mut self, condition: Option<Condition>) -> Result<u64> {
        member::Entity::delete()
            .filter_opt(condition)
            .execute(self.session)
            .await
    }
}
