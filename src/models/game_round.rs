use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx;

/// One round of "guess a property of a drawn problem". The problem fields
/// are a snapshot taken from the archive when the round starts and never
/// change afterwards.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GameRound {
    pub id: i64,
    pub room_id: i64,

    pub problem_id: String,
    pub problem_name: String,
    pub problem_tags: Vec<String>,
    pub problem_rating: i32,
    pub problem_solved_count: i64,
    pub actual_pass_rate: f64,

    pub game_mode: String,
    pub penalty_coefficient: f64,

    pub status: String,
    pub started_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}
