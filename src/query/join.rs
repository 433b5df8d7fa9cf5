use crate::error::{Error, Result};

use super::{
    PushToQuery, StatementBuilder,
    expr::{ColumnName, Expr},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// What a join attaches to the statement.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinTarget {
    /// A declared relationship: the join condition is `local = remote`, optionally refined by
    /// an extra predicate.
    Relation {
        table: &'static str,
        alias: String,
        local: ColumnName,
        remote: ColumnName,
    },
    /// A table with no declared relationship to the root (theta join). The condition, if any,
    /// is entirely caller supplied.
    Unrelated { table: &'static str, alias: String },
}

impl JoinTarget {
    #[must_use]
    pub fn alias(&self) -> &str {
        match self {
            Self::Relation { alias, .. } | Self::Unrelated { alias, .. } => alias,
        }
    }

    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Relation { table, .. } | Self::Unrelated { table, .. } => table,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub(crate) kind: JoinKind,
    pub(crate) target: JoinTarget,
    pub(crate) on: Option<Expr>,
}

impl Join {
    #[must_use]
    pub const fn new(kind: JoinKind, target: JoinTarget, on: Option<Expr>) -> Self {
        Self { kind, target, on }
    }

    #[must_use]
    pub const fn kind(&self) -> JoinKind {
        self.kind
    }

    #[must_use]
    pub const fn target(&self) -> &JoinTarget {
        &self.target
    }

    fn push_table(&self, builder: &mut StatementBuilder) {
        let table = self.target.table();
        let alias = self.target.alias();
        builder.push_identifier(table);
        if alias != table {
            builder.push(" AS ").push_identifier(alias);
        }
    }
}

impl PushToQuery for Join {
    fn push_to(&self, builder: &mut StatementBuilder) -> Result<()> {
        let keyword = match self.kind {
            JoinKind::Inner => " INNER JOIN ",
            JoinKind::Left => " LEFT JOIN ",
        };

        match (&self.target, &self.on) {
            (JoinTarget::Relation { local, remote, .. }, on) => {
                builder.push(keyword);
                self.push_table(builder);
                builder.push(" ON ");
                local.push_to(builder)?;
                builder.push(" = ");
                remote.push_to(builder)?;
                if let Some(on) = on {
                    builder.push(" AND (");
                    on.push_to(builder)?;
                    builder.push(")");
                }
            }
            (JoinTarget::Unrelated { .. }, Some(on)) => {
                builder.push(keyword);
                self.push_table(builder);
                builder.push(" ON ");
                on.push_to(builder)?;
            }
            (JoinTarget::Unrelated { .. }, None) if self.kind == JoinKind::Inner => {
                builder.push(" CROSS JOIN ");
                self.push_table(builder);
            }
            (JoinTarget::Unrelated { table, .. }, None) => {
                return Err(Error::unsupported(format!(
                    "outer join of `{table}` needs a declared relationship or a join predicate"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{Join, JoinKind, JoinTarget};
    use crate::{
        config::DbType,
        error::{Error, Result},
        query::{
            PushToQuery, StatementBuilder,
            expr::{BinaryOp, ColumnName, Expr},
            value::Value,
        },
    };

    fn render(join: &Join) -> Result<String> {
        let mut builder = StatementBuilder::new(DbType::Sqlite);
        join.push_to(&mut builder)?;
        Ok(builder.into_statement().sql)
    }

    fn team_relation() -> JoinTarget {
        JoinTarget::Relation {
            table: "team",
            alias: "t".to_string(),
            local: ColumnName::new_with_table_or_alias("member", "team_id"),
            remote: ColumnName::new_with_table_or_alias("t", "id"),
        }
    }

    fn unrelated_team() -> JoinTarget {
        JoinTarget::Unrelated {
            table: "team",
            alias: "team".to_string(),
        }
    }

    fn name_matches() -> Expr {
        Expr::binary(
            Expr::Column(ColumnName::new_with_table_or_alias("member", "username")),
            BinaryOp::Equals,
            Expr::Column(ColumnName::new_with_table_or_alias("team", "name")),
        )
    }

    #[test]
    fn relation_join_with_refinement() {
        let on = Expr::binary(
            Expr::Column(ColumnName::new_with_table_or_alias("t", "name")),
            BinaryOp::Equals,
            Expr::Value(Value::Text("teamA".to_string())),
        );
        let join = Join::new(JoinKind::Left, team_relation(), Some(on));
        assert_eq!(
            render(&join).ok().as_deref(),
            Some(
                " LEFT JOIN \"team\" AS \"t\" ON \"member\".\"team_id\" = \"t\".\"id\" AND (\"t\".\"name\" = ?)"
            )
        );
    }

    #[test]
    fn theta_joins() {
        let cross = Join::new(JoinKind::Inner, unrelated_team(), None);
        assert_eq!(render(&cross).ok().as_deref(), Some(" CROSS JOIN \"team\""));

        let left = Join::new(JoinKind::Left, unrelated_team(), Some(name_matches()));
        assert_eq!(
            render(&left).ok().as_deref(),
            Some(" LEFT JOIN \"team\" ON \"member\".\"username\" = \"team\".\"name\"")
        );
    }

    #[test]
    fn outer_theta_join_without_predicate_is_rejected() {
        let join = Join::new(JoinKind::Left, unrelated_team(), None);
        assert!(matches!(
            render(&join),
            Err(Error::UnsupportedQueryShape(_))
        ));
    }
}
