use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx;

/// One member's guess for a round. Only the fields matching the round's
/// game mode are set; `is_correct` and `points_change` stay null until
/// settlement.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Guess {
    pub id: i64,
    pub round_id: i64,
    pub user_id: i64,

    pub guess_tags: Option<Vec<String>>,
    pub guess_rating_min: Option<i32>,
    pub guess_rating_max: Option<i32>,
    pub guess_pass_rate_min: Option<f64>,
    pub guess_pass_rate_max: Option<f64>,

    pub is_correct: Option<bool>,
    pub points_change: Option<f64>,
    pub submitted_at: DateTime<Utc>,
}
