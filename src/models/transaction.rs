use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx;

/// Append-only ledger entry for a peer-to-peer transfer.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}
