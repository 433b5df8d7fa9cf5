use dotenvy::dotenv;

/// The database flavour behind a connection. Also selects the SQL dialect the translator
/// renders for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbType {
    MySql,
    Postgres,
    #[default]
    Sqlite,
}

impl DbType {
    #[must_use]
    pub fn from_connection_string(input: &str) -> Option<Self> {
        let lower = input.to_lowercase();

        if lower.starts_with("postgres") {
            Some(Self::Postgres)
        } else if lower.starts_with("sqlite") {
            Some(Self::Sqlite)
        } else if lower.starts_with("mysql") || lower.starts_with("mariadb") {
            Some(Self::MySql)
        } else {
            None
        }
    }

    /// Whether `ORDER BY ... NULLS FIRST | LAST` is understood natively.
    #[must_use]
    pub const fn supports_nulls_ordering(self) -> bool {
        !matches!(self, Self::MySql)
    }

    /// Whether bind parameters are numbered (`$1`, `$2`, ...) instead of `?`.
    #[must_use]
    pub const fn numbered_placeholders(self) -> bool {
        matches!(self, Self::Postgres)
    }
}

/// Connection string used when `DATABASE_URL` is not configured.
pub const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Attempt to retrieve the database URL from the `DATABASE_URL` environment variable, or from a
/// corresponding `.env` file.
///
/// Returns `None` when the variable is unset or not valid UTF-8.
#[must_use]
pub fn get_database_url() -> Option<String> {
    let _ = dotenv();

    std::env::var("DATABASE_URL").ok()
}

#[cfg(test)]
mod test {
    use super::DbType;

    #[test]
    fn detects_database_from_url() {
        assert_eq!(
            DbType::from_connection_string("postgres://localhost/app"),
            Some(DbType::Postgres)
        );
        assert_eq!(
            DbType::from_connection_string("SQLITE::memory:"),
            Some(DbType::Sqlite)
        );
        assert_eq!(
            DbType::from_connection_string("mysql://root@localhost"),
            Some(DbType::MySql)
        );
        assert_eq!(DbType::from_connection_string("oracle://x"), None);
    }

    #[test]
    fn dialect_capabilities() {
        assert!(DbType::Postgres.numbered_placeholders());
        assert!(!DbType::Sqlite.numbered_placeholders());
        assert!(!DbType::MySql.supports_nulls_ordering());
        assert!(DbType::Sqlite.supports_nulls_ordering());
    }
}
