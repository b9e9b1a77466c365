use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub points: f64,
    pub created_at: DateTime<Utc>,
}
