use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
