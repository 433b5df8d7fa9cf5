#![allow(dead_code)]

use std::sync::Once;

use strata_orm::{Result, Session, config::IN_MEMORY_URL};
use strata_orm_tests::{create_schema, insert_member, insert_team};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    fmt::{format, layer},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(LevelFilter::DEBUG)
            .with(
                layer()
                    .with_test_writer()
                    .event_format(format().without_time().with_target(false).compact()),
            )
            .try_init();
    });
}

/// An in-memory database with the schema but no rows.
pub async fn empty_session() -> Result<Session> {
    init_tracing();
    let mut session = Session::connect(IN_MEMORY_URL).await?;
    create_schema(&mut session).await?;
    Ok(session)
}

/// `teamA` with `member1` (10) and `member2` (20), `teamB` with `member3` (30) and
/// `member4` (40).
pub async fn session() -> Result<Session> {
    let mut session = empty_session().await?;

    insert_team(&mut session, 1, "teamA").await?;
    insert_team(&mut session, 2, "teamB").await?;

    insert_member(&mut session, 1, Some("member1"), 10, Some(1)).await?;
    insert_member(&mut session, 2, Some("member2"), 20, Some(1)).await?;
    insert_member(&mut session, 3, Some("member3"), 30, Some(2)).await?;
    insert_member(&mut session, 4, Some("member4"), 40, Some(2)).await?;

    Ok(session)
}
