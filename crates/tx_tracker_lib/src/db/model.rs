use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize, sqlx::FromRow, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TxStatusDao {
    #[serde(skip_serializing)]
    pub id: i64,
    pub tx_hash: String,
    pub from_addr: Option<String>,
    pub to_addr: Option<String>,
    pub value_ether: Option<String>,
    pub gas_price_gwei: Option<String>,
    pub gas_limit: Option<i64>,
    pub gas_used: Option<i64>,
    pub block_number: Option<i64>,
    pub status: String,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

/// Fields written only when the record is first created.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxIdentity {
    pub tx_hash: String,
    pub from_addr: Option<String>,
    pub to_addr: Option<String>,
    pub value_ether: Option<String>,
    pub gas_price_gwei: Option<String>,
    pub gas_limit: Option<i64>,
    pub gas_used: Option<i64>,
    pub block_number: Option<i64>,
}
