mod common;

use strata_orm::{
    Error, Result,
    config::DbType,
    entity::{Entity as _, column::Column},
    query::{
        expr::{CaseBuilder, constant, count_star},
        projection::{Projection, SelectItem},
    },
};
use strata_orm_tests::{
    dto::{MemberDto, UserDto},
    member, team,
};

fn member_items() -> [SelectItem; 2] {
    [
        member::columns::Username::expr().item(),
        member::columns::Age::expr().item(),
    ]
}

#[tokio::test]
async fn binding_strategies_are_equivalent() -> Result<()> {
    let mut session = common::session().await?;
    let query = member::Entity::find().order_by(member::columns::Id::expr().asc());

    let by_fields = query
        .clone()
        .project(Projection::<MemberDto>::fields(member_items()))
        .all(&mut session)
        .await?;
    let by_setters = query
        .clone()
        .project(Projection::<MemberDto>::setters(member_items()))
        .all(&mut session)
        .await?;
    let by_constructor = query
        .project(Projection::<MemberDto>::constructor(member_items()))
        .all(&mut session)
        .await?;

    assert_eq!(by_fields.len(), 4);
    assert_eq!(by_fields[0], MemberDto::new(Some("member1".to_string()), 10));
    assert_eq!(by_fields, by_setters);
    assert_eq!(by_fields, by_constructor);
    Ok(())
}

#[tokio::test]
async fn aliased_subquery_binds_to_a_field() -> Result<()> {
    let mut session = common::session().await?;

    let oldest = member::Entity::find_as("member_sub")
        .select_scalar(member::columns::Age::of("member_sub").max())
        .into_subquery();

    let users = member::Entity::find()
        .order_by(member::columns::Id::expr().asc())
        .project(Projection::<UserDto>::fields([
            member::columns::Username::expr().alias("name"),
            oldest.alias("age"),
        ]))
        .all(&mut session)
        .await?;

    assert_eq!(users.len(), 4);
    assert!(users.iter().all(|e| e.age == 40));
    assert_eq!(users[0].name.as_deref(), Some("member1"));
    Ok(())
}

#[tokio::test]
async fn binding_errors_are_raised_before_execution() {
    let unaliased = member::Entity::find()
        .project(Projection::<UserDto>::fields(member_items()))
        .statement(DbType::Sqlite);
    assert!(matches!(unaliased, Err(Error::ProjectionBinding(_))));

    let computed = member::Entity::find()
        .project(Projection::<MemberDto>::fields([
            member::columns::Username::expr().item(),
            member::columns::Age::expr().add(1).item(),
        ]))
        .statement(DbType::Sqlite);
    assert!(matches!(computed, Err(Error::ProjectionBinding(_))));

    let arity = member::Entity::find()
        .project(Projection::<MemberDto>::constructor([
            member::columns::Username::expr().item(),
        ]))
        .statement(DbType::Sqlite);
    assert!(matches!(arity, Err(Error::ProjectionBinding(_))));
}

#[tokio::test]
async fn scalar_and_tuple_projections() -> Result<()> {
    let mut session = common::session().await?;

    let usernames = member::Entity::find()
        .order_by(member::columns::Id::expr().asc())
        .select_scalar(member::columns::Username::expr())
        .all(&mut session)
        .await?;
    assert_eq!(
        usernames,
        vec![
            Some("member1".to_string()),
            Some("member2".to_string()),
            Some("member3".to_string()),
            Some("member4".to_string()),
        ]
    );

    let username = member::columns::Username::expr();
    let tuples = member::Entity::find()
        .filter(member::columns::Age::expr().gt(25))
        .order_by(member::columns::Id::expr().asc())
        .select_tuple([
            username.clone().item(),
            member::columns::Age::expr().alias("years"),
        ])
        .all(&mut session)
        .await?;
    assert_eq!(tuples.len(), 2);
    assert_eq!(tuples[0].get_by(&username)?, Some("member3".to_string()));
    assert_eq!(tuples[0].get_named::<i64>("years")?, 30);
    assert_eq!(tuples[1].get::<i64>(1)?, 40);
    Ok(())
}

#[tokio::test]
async fn aggregates_and_grouping() -> Result<()> {
    let mut session = common::session().await?;

    let summary = member::Entity::find()
        .select_tuple([
            count_star().alias("count"),
            member::columns::Age::expr().sum().alias("sum"),
            member::columns::Age::expr().avg().alias("avg"),
            member::columns::Age::expr().max().alias("max"),
            member::columns::Age::expr().min().alias("min"),
        ])
        .one(&mut session)
        .await?;
    assert_eq!(summary.get_named::<i64>("count")?, 4);
    assert_eq!(summary.get_named::<i64>("sum")?, 100);
    assert!((summary.get_named::<f64>("avg")? - 25.0).abs() < f64::EPSILON);
    assert_eq!(summary.get_named::<i64>("max")?, 40);
    assert_eq!(summary.get_named::<i64>("min")?, 10);

    let per_team = member::Entity::find()
        .join::<team::Entity>()
        .group_by(team::columns::Name::expr())
        .having(member::columns::Age::expr().avg().gt(20.0))
        .order_by(team::columns::Name::expr().asc())
        .select_tuple([
            team::columns::Name::expr().item(),
            member::columns::Age::expr().avg().alias("avg_age"),
        ])
        .all(&mut session)
        .await?;
    assert_eq!(per_team.len(), 1);
    assert_eq!(per_team[0].get::<String>(0)?, "teamB");
    assert!((per_team[0].get::<f64>(1)? - 35.0).abs() < f64::EPSILON);
    Ok(())
}

#[tokio::test]
async fn aggregates_over_no_rows_are_null() -> Result<()> {
    let mut session = common::session().await?;

    let oldest = member::Entity::find()
        .filter(member::columns::Age::expr().gt(1000))
        .select_scalar(member::columns::Age::expr().max())
        .one(&mut session)
        .await?;
    assert_eq!(oldest, None);

    let summary = member::Entity::find()
        .filter(member::columns::Age::expr().gt(1000))
        .select_tuple([
            count_star().alias("count"),
            member::columns::Age::expr().sum().alias("sum"),
            member::columns::Age::expr().avg().alias("avg"),
            member::columns::Age::expr().min().alias("min"),
        ])
        .one(&mut session)
        .await?;
    assert_eq!(summary.get_named::<i64>("count")?, 0);
    assert_eq!(summary.get_named::<Option<i64>>("sum")?, None);
    assert_eq!(summary.get_named::<Option<f64>>("avg")?, None);
    assert_eq!(summary.get_named::<Option<i64>>("min")?, None);
    Ok(())
}

#[tokio::test]
async fn subqueries_in_where() -> Result<()> {
    let mut session = common::session().await?;

    let oldest = member::Entity::find_as("member_sub")
        .select_scalar(member::columns::Age::of("member_sub").max())
        .into_subquery();
    let result = member::Entity::find()
        .filter(member::columns::Age::expr().eq(oldest))
        .all(&mut session)
        .await?;
    assert_eq!(result.iter().map(|e| e.age).collect::<Vec<_>>(), vec![40]);

    let average = member::Entity::find_as("member_sub")
        .select_scalar(member::columns::Age::of("member_sub").avg())
        .into_subquery();
    let result = member::Entity::find()
        .filter(member::columns::Age::expr().cast::<f64>().goe(average))
        .order_by(member::columns::Age::expr().asc())
        .all(&mut session)
        .await?;
    assert_eq!(result.iter().map(|e| e.age).collect::<Vec<_>>(), vec![30, 40]);

    let older = member::Entity::find_as("member_sub")
        .filter(member::columns::Age::of("member_sub").gt(10))
        .select_scalar(member::columns::Age::of("member_sub"))
        .into_subquery();
    let result = member::Entity::find()
        .filter(member::columns::Age::expr().in_subquery(older))
        .count(&mut session)
        .await?;
    assert_eq!(result, 3);
    Ok(())
}

#[tokio::test]
async fn case_constant_and_string_functions() -> Result<()> {
    let mut session = common::session().await?;

    let simple = member::columns::Age::expr()
        .case::<String>()
        .when(10, "ten")
        .when(20, "twenty")
        .otherwise("other");
    let searched = CaseBuilder::<String>::new()
        .when(member::columns::Age::expr().between(0, 20), "0~20")
        .when(member::columns::Age::expr().between(21, 30), "21~30")
        .otherwise("etc");
    let label = member::columns::Username::expr()
        .concat("_")
        .concat(member::columns::Age::expr().string_value());

    let rows = member::Entity::find()
        .order_by(member::columns::Id::expr().asc())
        .select_tuple([
            simple.alias("simple"),
            searched.alias("searched"),
            constant("A".to_string()).alias("constant"),
            label.alias("label"),
            member::columns::Username::expr()
                .replace("member", "M")
                .alias("replaced"),
        ])
        .all(&mut session)
        .await?;

    let column = |name: &str| -> Result<Vec<String>> {
        rows.iter().map(|e| e.get_named::<String>(name)).collect()
    };
    assert_eq!(column("simple")?, ["ten", "twenty", "other", "other"]);
    assert_eq!(column("searched")?, ["0~20", "0~20", "21~30", "etc"]);
    assert_eq!(column("constant")?, ["A", "A", "A", "A"]);
    assert_eq!(
        column("label")?,
        ["member1_10", "member2_20", "member3_30", "member4_40"]
    );
    assert_eq!(column("replaced")?, ["M1", "M2", "M3", "M4"]);

    let lowered = member::Entity::find()
        .filter(
            member::columns::Username::expr()
                .eq(member::columns::Username::expr().lower()),
        )
        .count(&mut session)
        .await?;
    assert_eq!(lowered, 4);
    Ok(())
}
