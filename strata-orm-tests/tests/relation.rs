mod common;

use strata_orm::{
    Error, Result,
    entity::{
        Entity as _,
        column::{Column, ComparableColumn},
        relation::Loaded,
    },
    query::{
        fetch::{self, FetchPlan},
        select::Select,
    },
};
use strata_orm_tests::{insert_member, member, team};

#[tokio::test]
async fn relationships_start_unresolved() -> Result<()> {
    let mut session = common::session().await?;

    let members = member::Entity::find().all(&mut session).await?;
    assert!(members.iter().all(|e| !fetch::is_resolved(e, "team")));
    assert!(members.iter().all(|e| e.team == Loaded::Unresolved));
    Ok(())
}

#[tokio::test]
async fn fetch_join_resolves_in_the_same_statement() -> Result<()> {
    let mut session = common::session().await?;
    insert_member(&mut session, 5, Some("loner"), 50, None).await?;

    let members = member::Entity::find()
        .fetch::<team::Entity>()
        .order_by(member::columns::Id::expr().asc())
        .all(&mut session)
        .await?;

    assert_eq!(members.len(), 5);
    assert!(members.iter().all(|e| fetch::is_resolved(e, "team")));
    assert_eq!(
        members[0].team.get().and_then(Option::as_ref).map(|e| e.name.as_str()),
        Some("teamA")
    );
    assert_eq!(members[4].team, Loaded::Resolved(None));
    Ok(())
}

#[tokio::test]
async fn fetch_plan_reuses_an_explicit_join() -> Result<()> {
    let mut session = common::session().await?;

    let members = member::Entity::find()
        .join::<team::Entity>()
        .filter(team::columns::Name::eq("teamB"))
        .with_fetch_plan(FetchPlan::default().with::<team::Entity>())
        .all(&mut session)
        .await?;

    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|e| {
        e.team
            .get()
            .and_then(Option::as_ref)
            .is_some_and(|team| team.name == "teamB")
    }));
    Ok(())
}

#[tokio::test]
async fn explicit_resolution_of_both_sides() -> Result<()> {
    let mut session = common::session().await?;

    let mut members = member::Entity::find()
        .order_by(member::columns::Id::expr().asc())
        .all(&mut session)
        .await?;
    fetch::resolve::<member::Entity, team::Entity>(&mut session, &mut members).await?;
    assert!(members.iter().all(|e| e.team.is_resolved()));
    assert_eq!(
        members[3].team.get().and_then(Option::as_ref).map(|e| e.id),
        Some(2)
    );

    let mut teams = team::Entity::find()
        .order_by(team::columns::Id::expr().asc())
        .all(&mut session)
        .await?;
    fetch::resolve_many::<team::Entity, member::Entity>(&mut session, &mut teams).await?;
    let names = teams
        .iter()
        .map(|e| {
            e.members
                .get()
                .map(|members| members.iter().filter_map(|m| m.username.clone()).collect())
                .unwrap_or_default()
        })
        .collect::<Vec<Vec<String>>>();
    assert_eq!(
        names,
        vec![
            vec!["member1".to_string(), "member2".to_string()],
            vec!["member3".to_string(), "member4".to_string()],
        ]
    );
    Ok(())
}

#[tokio::test]
async fn inverse_join_from_the_collection_side() -> Result<()> {
    let mut session = common::session().await?;

    let teams = team::Entity::find()
        .join_inverse::<member::Entity>()
        .filter(member::columns::Age::expr().gt(25))
        .all(&mut session)
        .await?;
    assert_eq!(teams.len(), 2);
    assert!(teams.iter().all(|e| e.name == "teamB"));
    Ok(())
}

#[tokio::test]
async fn theta_join_drops_unmatched_rows() -> Result<()> {
    let mut session = common::session().await?;
    insert_member(&mut session, 5, Some("teamA"), 0, None).await?;
    insert_member(&mut session, 6, Some("teamB"), 0, None).await?;
    insert_member(&mut session, 7, Some("teamC"), 0, None).await?;

    let pairs = member::Entity::find()
        .theta_join::<team::Entity>()
        .filter(member::columns::Username::expr().eq(team::columns::Name::expr()))
        .order_by(member::columns::Id::expr().asc())
        .with_joined::<team::Entity>()
        .all(&mut session)
        .await?;

    assert_eq!(pairs.len(), 2);
    assert!(pairs.iter().all(|(m, t)| {
        t.as_ref().map(|e| Some(e.name.as_str())) == Some(m.username.as_deref())
    }));
    Ok(())
}

#[tokio::test]
async fn outer_join_without_relationship_keeps_every_member() -> Result<()> {
    let mut session = common::session().await?;
    insert_member(&mut session, 5, Some("teamA"), 0, None).await?;
    insert_member(&mut session, 6, Some("teamB"), 0, None).await?;
    insert_member(&mut session, 7, Some("teamC"), 0, None).await?;

    let pairs = member::Entity::find()
        .left_join_unrelated::<team::Entity>(
            member::columns::Username::expr().eq(team::columns::Name::expr()),
        )
        .order_by(member::columns::Id::expr().asc())
        .with_joined::<team::Entity>()
        .all(&mut session)
        .await?;

    assert_eq!(pairs.len(), 7);
    let teams = pairs
        .iter()
        .map(|(_, t)| t.as_ref().map(|e| e.name.clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        teams,
        vec![
            None,
            None,
            None,
            None,
            Some("teamA".to_string()),
            Some("teamB".to_string()),
            None,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn outer_join_over_relationship_with_refinement() -> Result<()> {
    let mut session = common::session().await?;

    let pairs = member::Entity::find()
        .left_join_on::<team::Entity>(team::columns::Name::eq("teamA"))
        .order_by(member::columns::Id::expr().asc())
        .with_joined::<team::Entity>()
        .all(&mut session)
        .await?;

    assert_eq!(pairs.len(), 4);
    assert_eq!(
        pairs
            .iter()
            .map(|(_, t)| t.as_ref().map(|e| e.id))
            .collect::<Vec<_>>(),
        vec![Some(1), Some(1), None, None]
    );
    Ok(())
}

#[tokio::test]
async fn nulls_sort_last_when_requested() -> Result<()> {
    let mut session = common::session().await?;
    insert_member(&mut session, 5, None, 100, None).await?;
    insert_member(&mut session, 6, Some("member5"), 100, None).await?;
    insert_member(&mut session, 7, Some("member6"), 100, None).await?;

    let result = member::Entity::find()
        .filter(member::columns::Age::expr().eq(100))
        .order_by(member::columns::Age::expr().desc())
        .order_by(member::columns::Username::expr().asc().nulls_last())
        .all(&mut session)
        .await?;

    assert_eq!(
        result
            .iter()
            .map(|e| e.username.as_deref())
            .collect::<Vec<_>>(),
        vec![Some("member5"), Some("member6"), None]
    );
    Ok(())
}

#[tokio::test]
async fn subquery_in_from_is_rejected() -> Result<()> {
    let mut session = common::session().await?;

    let inner = member::Entity::find().select_scalar(member::columns::Age::expr());
    let outer = Select::<member::Entity>::from_subquery(inner, "m")?;
    assert!(matches!(
        outer.all(&mut session).await,
        Err(Error::UnsupportedQueryShape(_))
    ));
    Ok(())
}
