//! Store connections.
//!
//! File-backed SQLite stores get WAL journaling, a 5 s busy timeout and
//! `synchronous=NORMAL` on connect. In-memory stores are left as they are.

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};

const SQLITE_PRAGMAS: [&str; 3] = [
    "PRAGMA journal_mode=WAL",
    "PRAGMA busy_timeout=5000",
    "PRAGMA synchronous=NORMAL",
];

async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    for pragma in SQLITE_PRAGMAS {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }
    Ok(())
}

/// Open the store at `database_url`, e.g. `sqlite:///var/lib/gitrank/gitrank.db?mode=rwc`
/// or `sqlite::memory:`.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;
    if database_url.starts_with("sqlite://") {
        configure_sqlite(&db).await?;
    }
    Ok(db)
}

/// [`connect`], then bring the schema up to date.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established or a migration fails.
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect(database_url).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// On-disk size of a SQLite database, `page_count * page_size`.
///
/// Returns `None` for other backends.
pub async fn database_size_bytes(db: &DatabaseConnection) -> Result<Option<u64>, DbErr> {
    if db.get_database_backend() != DatabaseBackend::Sqlite {
        return Ok(None);
    }

    let page_count = pragma_u64(db, "page_count").await?;
    let page_size = pragma_u64(db, "page_size").await?;
    Ok(Some(page_count * page_size))
}

async fn pragma_u64(db: &DatabaseConnection, name: &str) -> Result<u64, DbErr> {
    let stmt = Statement::from_string(DatabaseBackend::Sqlite, format!("PRAGMA {name}"));
    let value: i64 = match db.query_one(stmt).await? {
        Some(row) => row.try_get_by_index(0)?,
        None => 0,
    };
    Ok(u64::try_from(value).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_every_pragma_is_issued() {
        let done = MockExecResult {
            rows_affected: 0,
            last_insert_id: 0,
        };
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results(vec![done; SQLITE_PRAGMAS.len()])
            .into_connection();

        configure_sqlite(&db).await.expect("pragmas");

        let log = db.into_transaction_log();
        assert_eq!(log.len(), SQLITE_PRAGMAS.len());
    }

    #[tokio::test]
    async fn test_unknown_scheme_is_rejected() {
        assert!(connect("postgresql-ish:/nowhere").await.is_err());
    }

    #[cfg(all(feature = "sqlite", feature = "migrate"))]
    #[tokio::test]
    async fn test_size_is_whole_pages() {
        let db = connect_and_migrate("sqlite::memory:")
            .await
            .expect("test db should migrate");
        let size = database_size_bytes(&db)
            .await
            .expect("pragmas should run")
            .expect("sqlite reports a size");
        assert!(size > 0);
        assert_eq!(size % 512, 0);
    }
}
