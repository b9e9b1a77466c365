use super::utils::AuthUser;

use crate::{
    models::Transaction,
    notify::GameEvent,
    result::{AppError, Result},
    AppState,
};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    return router
        .route("/api/leaderboard", get(get_leaderboard))
        .route("/api/transactions", post(create_transaction))
        .route("/api/transactions/history", get(get_history));
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostTransaction {
    to_user_id: i64,
    amount: f64,
}

#[derive(Serialize)]
struct TransactionResponse {
    transaction: Transaction,
}

#[derive(sqlx::FromRow)]
struct BalanceRow {
    id: i64,
    points: f64,
}

async fn create_transaction(
    user: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<PostTransaction>,
) -> Result<Response> {
    if !(body.amount > 0.0) {
        return Err(AppError::InvalidArgument(
            "Amount must be positive".to_string(),
        ));
    }

    if body.to_user_id == user.id {
        return Err(AppError::InvalidArgument(
            "Cannot transfer to yourself".to_string(),
        ));
    }

    // Balance check, both balance updates and the ledger insert are one
    // atomic unit. Both rows are locked in id order so two opposing
    // transfers cannot deadlock, and concurrent settlement of a round
    // serializes against the same row locks.
    let mut tx = state.db.begin().await?;

    let rows: Vec<BalanceRow> =
        sqlx::query_as("SELECT id, points FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(vec![user.id, body.to_user_id])
            .fetch_all(&mut *tx)
            .await?;

    let Some(sender) = rows.iter().find(|r| r.id == user.id) else {
        return Err(AppError::NotFound("User not found".to_string()));
    };

    if !rows.iter().any(|r| r.id == body.to_user_id) {
        return Err(AppError::NotFound("Recipient user not found".to_string()));
    }

    // Settlement penalties may have pushed the balance negative already;
    // the floor applies only to the balance at transfer time.
    if sender.points < body.amount {
        return Err(AppError::InsufficientFunds);
    }

    sqlx::query("UPDATE users SET points = points - $1 WHERE id = $2")
        .bind(body.amount)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE users SET points = points + $1 WHERE id = $2")
        .bind(body.amount)
        .bind(body.to_user_id)
        .execute(&mut *tx)
        .await?;

    let transaction: Transaction = sqlx::query_as(
        "INSERT INTO transactions (from_user_id, to_user_id, amount) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(user.id)
    .bind(body.to_user_id)
    .bind(body.amount)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    state.notifier.notify_user(
        body.to_user_id,
        GameEvent::PointsReceived {
            from_user_id: user.id,
            amount: body.amount,
        },
    );

    return Ok((StatusCode::CREATED, Json(TransactionResponse { transaction })).into_response());
}

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct LeaderboardEntry {
    id: i64,
    username: String,
    points: f64,
}

#[derive(Serialize)]
struct LeaderboardResponse {
    leaderboard: Vec<LeaderboardEntry>,
}

async fn get_leaderboard(State(state): State<AppState>) -> Result<Json<LeaderboardResponse>> {
    let leaderboard: Vec<LeaderboardEntry> =
        sqlx::query_as("SELECT id, username, points FROM users ORDER BY points DESC LIMIT 10")
            .fetch_all(&state.db)
            .await?;

    return Ok(Json(LeaderboardResponse { leaderboard }));
}

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionWithNames {
    id: i64,
    from_user_id: i64,
    from_username: String,
    to_user_id: i64,
    to_username: String,
    amount: f64,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct HistoryResponse {
    transactions: Vec<TransactionWithNames>,
}

async fn get_history(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>> {
    let transactions: Vec<TransactionWithNames> = sqlx::query_as(
        r#"
SELECT t.id, t.from_user_id, u1.username AS from_username,
       t.to_user_id, u2.username AS to_username, t.amount, t.created_at
FROM transactions t
JOIN users u1 ON t.from_user_id = u1.id
JOIN users u2 ON t.to_user_id = u2.id
WHERE t.from_user_id = $1 OR t.to_user_id = $1
ORDER BY t.created_at DESC
LIMIT 50
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    return Ok(Json(HistoryResponse { transactions }));
}
