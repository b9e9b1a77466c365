use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    pub room_id: i64,
    pub user_id: i64,
    pub joined_at: DateTime<Utc>,
}
