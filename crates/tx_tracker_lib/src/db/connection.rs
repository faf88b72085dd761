use crate::err_from;
use crate::error::TrackerError;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::ConnectOptions;
use sqlx::SqliteConnection;
use std::str::FromStr;
use std::time::Duration;

static MIGRATOR: Migrator = sqlx::migrate!();

// the engine writes while the status server reads the same file
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn connect_options(file_name: Option<&str>) -> Result<SqliteConnectOptions, TrackerError> {
    match file_name {
        Some(file_name) => Ok(SqliteConnectOptions::from_str(&format!("sqlite://{}", file_name))
            .map_err(err_from!())?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)),
        // private to this connection, nothing else can open it
        None => SqliteConnectOptions::from_str("sqlite::memory:").map_err(err_from!()),
    }
}

/// Opens the tracker store in `file_name`, or a throwaway in-memory store when no file
/// is given. Pass `run_migrations` for the connection that owns the schema.
pub async fn create_sqlite_connection(
    file_name: Option<&str>,
    run_migrations: bool,
) -> Result<SqliteConnection, TrackerError> {
    let mut conn = connect_options(file_name)?
        .connect()
        .await
        .map_err(err_from!())?;

    if run_migrations {
        MIGRATOR.run(&mut conn).await.map_err(err_from!())?;
        log::debug!(
            "Store schema up to date ({})",
            file_name.unwrap_or("in-memory")
        );
    }

    Ok(conn)
}
