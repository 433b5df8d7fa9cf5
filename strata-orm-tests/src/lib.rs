//! The Member/Team demo corpus: two entities, the projection shapes read from them and a
//! repository exposing search, paging and bulk mutation over members.

pub mod dto;
pub mod member;
pub mod repository;
pub mod team;

use strata_orm::{Result, Session, sqlx};

const SCHEMA: &[&str] = &[
    "CREATE TABLE team (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
    "CREATE TABLE member (
        id INTEGER PRIMARY KEY,
        username TEXT,
        age INTEGER NOT NULL,
        team_id INTEGER REFERENCES team (id)
    )",
];

/// Create the `team` and `member` tables.
///
/// # Errors
///
/// Whatever the driver reports.
pub async fn create_schema(session: &mut Session) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(session.connection()).await?;
    }
    Ok(())
}

/// Insert a team row. Inserts go straight to the connection, the engine only reads and
/// bulk-mutates.
///
/// # Errors
///
/// Whatever the driver reports.
pub async fn insert_team(session: &mut Session, id: i64, name: &str) -> Result<()> {
    sqlx::query("INSERT INTO team (id, name) VALUES (?, ?)")
        .bind(id)
        .bind(name.to_string())
        .execute(session.connection())
        .await?;
    Ok(())
}

/// Insert a member row.
///
/// # Errors
///
/// Whatever the driver reports.
pub async fn insert_member(
    session: &mut Session,
    id: i64,
    username: Option<&str>,
    age: i64,
    team_id: Option<i64>,
) -> Result<()> {
    sqlx::query("INSERT INTO member (id, username, age, team_id) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(username.map(str::to_string))
        .bind(age)
        .bind(team_id)
        .execute(session.connection())
        .await?;
    Ok(())
}
