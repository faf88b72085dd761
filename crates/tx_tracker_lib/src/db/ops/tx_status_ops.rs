use crate::db::model::*;
use crate::status::TxStatus;
use sqlx::SqliteConnection;

pub const TX_FILTER_ALL: &str = "(id >= 0)";
pub const TX_FILTER_NOT_TERMINAL: &str = "(status IN ('Pending', 'Queued'))";
pub const TX_FILTER_TERMINAL: &str = "(status IN ('Confirmed', 'Cancelled', 'Failed'))";

pub fn tx_filter_status(status: TxStatus) -> String {
    format!("(status = '{}')", status.as_str())
}

/// Insert-or-update keyed by `tx_hash`, done in one statement.
///
/// A new row gets `identity` and `status`. An existing row only gets `status`.
pub async fn reconcile_tx_status(
    conn: &mut SqliteConnection,
    identity: &TxIdentity,
    status: TxStatus,
) -> Result<TxStatusDao, sqlx::Error> {
    let now = chrono::Utc::now();
    let res = sqlx::query_as::<_, TxStatusDao>(
        r"INSERT INTO tx_status
(tx_hash, from_addr, to_addr, value_ether, gas_price_gwei, gas_limit, gas_used, block_number, status, created_date, updated_date)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
ON CONFLICT(tx_hash) DO UPDATE SET
status = excluded.status,
updated_date = excluded.updated_date
RETURNING *;
",
    )
    .bind(&identity.tx_hash)
    .bind(&identity.from_addr)
    .bind(&identity.to_addr)
    .bind(&identity.value_ether)
    .bind(&identity.gas_price_gwei)
    .bind(identity.gas_limit)
    .bind(identity.gas_used)
    .bind(identity.block_number)
    .bind(status.as_str())
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(res)
}

/// Creates the record unless one already exists. `None` means the hash was already known.
pub async fn insert_tx_status_if_absent(
    conn: &mut SqliteConnection,
    identity: &TxIdentity,
    status: TxStatus,
) -> Result<Option<TxStatusDao>, sqlx::Error> {
    let now = chrono::Utc::now();
    let res = sqlx::query_as::<_, TxStatusDao>(
        r"INSERT INTO tx_status
(tx_hash, from_addr, to_addr, value_ether, gas_price_gwei, gas_limit, gas_used, block_number, status, created_date, updated_date)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
ON CONFLICT(tx_hash) DO NOTHING
RETURNING *;
",
    )
    .bind(&identity.tx_hash)
    .bind(&identity.from_addr)
    .bind(&identity.to_addr)
    .bind(&identity.value_ether)
    .bind(&identity.gas_price_gwei)
    .bind(identity.gas_limit)
    .bind(identity.gas_used)
    .bind(identity.block_number)
    .bind(status.as_str())
    .bind(now)
    .bind(now)
    .fetch_optional(conn)
    .await?;
    Ok(res)
}

/// Status-only update keyed by `tx_hash`. With a filter, rows not matching it are left
/// untouched. Returns whether a row changed.
pub async fn update_tx_status(
    conn: &mut SqliteConnection,
    tx_hash: &str,
    status: TxStatus,
    filter: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let filter = filter.unwrap_or(TX_FILTER_ALL);
    let res = sqlx::query(
        format!(
            r"UPDATE tx_status SET
status = $2,
updated_date = $3
WHERE tx_hash = $1 AND {}
",
            filter
        )
        .as_str(),
    )
    .bind(tx_hash)
    .bind(status.as_str())
    .bind(chrono::Utc::now())
    .execute(conn)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn get_tx_status(
    conn: &mut SqliteConnection,
    tx_hash: &str,
) -> Result<Option<TxStatusDao>, sqlx::Error> {
    let row = sqlx::query_as::<_, TxStatusDao>(r"SELECT * FROM tx_status WHERE tx_hash = $1")
        .bind(tx_hash)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn get_tx_statuses(
    conn: &mut SqliteConnection,
    filter: Option<&str>,
    limit: Option<i64>,
) -> Result<Vec<TxStatusDao>, sqlx::Error> {
    let limit = limit.unwrap_or(i64::MAX);
    let filter = filter.unwrap_or(TX_FILTER_ALL);
    let rows = sqlx::query_as::<_, TxStatusDao>(
        format!(
            r"SELECT * FROM tx_status WHERE {} ORDER BY updated_date DESC, id DESC LIMIT $1",
            filter
        )
        .as_str(),
    )
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn get_tx_status_count(
    conn: &mut SqliteConnection,
    filter: Option<&str>,
) -> Result<usize, sqlx::Error> {
    let filter = filter.unwrap_or(TX_FILTER_ALL);
    let count = sqlx::query_scalar::<_, i64>(
        format!(r"SELECT COUNT(*) FROM tx_status WHERE {}", filter).as_str(),
    )
    .fetch_one(conn)
    .await?;
    Ok(count as usize)
}
