mod common;

use strata_orm::{
    Result,
    entity::{Entity as _, column::Column},
    query::pagination::PageRequest,
};
use strata_orm_tests::{
    insert_member,
    member,
    repository::{MemberRepository, MemberSearchCondition},
};

#[tokio::test]
async fn simple_paging_always_counts() -> Result<()> {
    let mut session = common::session().await?;
    let page = MemberRepository::new(&mut session)
        .search_page_simple(&MemberSearchCondition::default(), PageRequest::new(0, 3)?)
        .await?;

    assert_eq!(page.items.len(), 3);
    assert_eq!(page.total, 4);
    assert_eq!(page.offset, 0);
    assert_eq!(page.limit, 3);
    assert!(page.count_executed);
    Ok(())
}

#[tokio::test]
async fn complex_paging_skips_count_on_a_short_first_page() -> Result<()> {
    let mut session = common::session().await?;
    let page = MemberRepository::new(&mut session)
        .search_page_complex(&MemberSearchCondition::default(), PageRequest::new(0, 10)?)
        .await?;

    assert_eq!(page.items.len(), 4);
    assert_eq!(page.total, 4);
    assert!(!page.count_executed);
    Ok(())
}

#[tokio::test]
async fn pages_partition_the_ordered_result() -> Result<()> {
    let mut session = common::empty_session().await?;
    for id in 1..=7 {
        insert_member(&mut session, id, Some(format!("member{id}").as_str()), id * 10, None).await?;
    }

    let full = MemberRepository::new(&mut session)
        .search(&MemberSearchCondition::default())
        .await?;

    for limit in 1..=8 {
        let mut request = PageRequest::new(0, limit)?;
        let mut pages = vec![];
        loop {
            let page = MemberRepository::new(&mut session)
                .search_page_complex(&MemberSearchCondition::default(), request)
                .await?;
            assert_eq!(page.total, 7);
            let has_next = page.has_next();
            pages.push(page);
            if !has_next {
                break;
            }
            request = request.next();
        }

        assert_eq!(u64::try_from(pages.len()).ok(), Some(7_u64.div_ceil(limit)));
        assert_eq!(
            pages
                .into_iter()
                .flat_map(|e| e.items)
                .collect::<Vec<_>>(),
            full
        );
    }
    Ok(())
}

#[tokio::test]
async fn derived_totals_match_counted_totals() -> Result<()> {
    let mut session = common::empty_session().await?;

    for size in 0..=5 {
        if size > 0 {
            insert_member(&mut session, size, None, size, None).await?;
        }
        for limit in 1..=6 {
            for offset in 0..=6 {
                let request = PageRequest::new(offset, limit)?;
                let condition = MemberSearchCondition::default();
                let counted = MemberRepository::new(&mut session)
                    .search_page_simple(&condition, request)
                    .await?;
                let optimized = MemberRepository::new(&mut session)
                    .search_page_complex(&condition, request)
                    .await?;

                assert_eq!(optimized.total, counted.total, "{size} rows, {request:?}");
                assert_eq!(optimized.items, counted.items);
            }
        }
    }
    Ok(())
}

#[tokio::test]
async fn paging_entities_and_first_and_one() -> Result<()> {
    let mut session = common::session().await?;

    let page = member::Entity::find()
        .order_by(member::columns::Age::expr().desc())
        .page(&mut session, PageRequest::of_page(1, 3)?)
        .await?;
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].age, 10);
    assert_eq!(page.total, 4);
    assert!(!page.count_executed);
    assert_eq!(page.total_pages(), 2);

    let first = member::Entity::find()
        .order_by(member::columns::Age::expr().desc())
        .first(&mut session)
        .await?;
    assert_eq!(first.map(|e| e.age), Some(40));

    let one = member::Entity::find()
        .filter(member::columns::Username::expr().eq("member2"))
        .one(&mut session)
        .await?;
    assert_eq!(one.age, 20);

    assert!(
        member::Entity::find()
            .one(&mut session)
            .await
            .is_err()
    );
    Ok(())
}

#[tokio::test]
async fn pages_serialize() -> Result<()> {
    let mut session = common::session().await?;
    let page = MemberRepository::new(&mut session)
        .search_page_complex(&MemberSearchCondition::default(), PageRequest::new(2, 2)?)
        .await?;

    let Ok(json) = serde_json::to_value(&page) else {
        panic!("page serializes");
    };
    assert_eq!(json["total"], 4);
    assert_eq!(json["offset"], 2);
    assert_eq!(json["items"].as_array().map(Vec::len), Some(2));
    Ok(())
}
