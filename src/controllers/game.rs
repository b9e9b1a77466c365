use super::utils::AuthUser;

use crate::{
    codeforces,
    models::{GameRound, Guess, Room},
    notify::GameEvent,
    result::{AppError, Result},
    scoring::{self, GameMode, GuessPayload, ROUND_STATUS_ONGOING, ROUND_STATUS_SETTLED},
    AppState,
};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    return router
        .route("/api/rooms/:id/rounds", post(start_round))
        .route("/api/rooms/:id/rounds/current", get(get_current_round))
        .route("/api/rounds/:id/guess", post(submit_guess))
        .route("/api/rounds/:id/settle", post(settle_round));
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRound {
    game_mode: String,
    penalty_coefficient: f64,
}

/// Ongoing-round view served to members: no tag/rating/pass-rate snapshot,
/// only what is safe to show before settlement.
#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoundView {
    id: i64,
    problem_name: String,
    game_mode: String,
    penalty_coefficient: f64,
    status: String,
    started_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct RoundResponse {
    round: RoundView,
}

async fn start_round(
    user: AuthUser,
    Path(room_id): Path<i64>,
    State(state): State<AppState>,
    Json(body): Json<StartRound>,
) -> Result<Response> {
    let Some(game_mode) = GameMode::parse(&body.game_mode) else {
        return Err(AppError::InvalidArgument("Invalid game mode".to_string()));
    };

    if !(body.penalty_coefficient > 0.0) {
        return Err(AppError::InvalidArgument(
            "Penalty coefficient must be positive".to_string(),
        ));
    }

    let room: Option<Room> = sqlx::query_as("SELECT * FROM rooms WHERE id = $1 AND is_active = TRUE")
        .bind(room_id)
        .fetch_optional(&state.db)
        .await?;

    let Some(room) = room else {
        return Err(AppError::NotFound("Room not found or inactive".to_string()));
    };

    if room.owner_id != user.id {
        return Err(AppError::Forbidden(
            "Only the room owner can start a round".to_string(),
        ));
    }

    let ongoing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM game_rounds WHERE room_id = $1 AND status = $2")
            .bind(room_id)
            .bind(ROUND_STATUS_ONGOING)
            .fetch_optional(&state.db)
            .await?;

    if ongoing.is_some() {
        return Err(AppError::Conflict(
            "There is already an ongoing round".to_string(),
        ));
    }

    let problem = state.archive.random_problem().await?;
    let actual_pass_rate = codeforces::pass_rate(problem.solved_count);

    // The pre-check above is advisory; the partial unique index on
    // (room_id) WHERE status = 'ongoing' decides races between concurrent
    // starts, so the loser of the race lands here as a Conflict.
    let round: RoundView = sqlx::query_as(
        r#"
INSERT INTO game_rounds
    (room_id, problem_id, problem_name, problem_tags, problem_rating,
     problem_solved_count, actual_pass_rate, game_mode, penalty_coefficient)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
RETURNING id, problem_name, game_mode, penalty_coefficient, status, started_at
        "#,
    )
    .bind(room_id)
    .bind(&problem.id)
    .bind(&problem.name)
    .bind(&problem.tags)
    .bind(problem.rating)
    .bind(problem.solved_count)
    .bind(actual_pass_rate)
    .bind(game_mode.as_str())
    .bind(body.penalty_coefficient)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "There is already an ongoing round"))?;

    state.notifier.broadcast_to_room(
        room_id,
        GameEvent::RoundStarted {
            round_id: round.id,
            game_mode: round.game_mode.clone(),
        },
    );

    return Ok((StatusCode::CREATED, Json(RoundResponse { round })).into_response());
}

#[derive(Serialize)]
struct CurrentRoundResponse {
    round: Option<RoundView>,
}

async fn get_current_round(
    _user: AuthUser,
    Path(room_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<CurrentRoundResponse>> {
    let round: Option<RoundView> = sqlx::query_as(
        r#"
SELECT id, problem_name, game_mode, penalty_coefficient, status, started_at
FROM game_rounds
WHERE room_id = $1 AND status = $2
ORDER BY started_at DESC
LIMIT 1
        "#,
    )
    .bind(room_id)
    .bind(ROUND_STATUS_ONGOING)
    .fetch_optional(&state.db)
    .await?;

    return Ok(Json(CurrentRoundResponse { round }));
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitGuess {
    tags: Option<Vec<String>>,
    rating_min: Option<i32>,
    rating_max: Option<i32>,
    pass_rate_min: Option<f64>,
    pass_rate_max: Option<f64>,
}

#[derive(Serialize)]
struct GuessResponse {
    guess: Guess,
}

async fn submit_guess(
    user: AuthUser,
    Path(round_id): Path<i64>,
    State(state): State<AppState>,
    Json(body): Json<SubmitGuess>,
) -> Result<Response> {
    let round: Option<GameRound> =
        sqlx::query_as("SELECT * FROM game_rounds WHERE id = $1 AND status = $2")
            .bind(round_id)
            .bind(ROUND_STATUS_ONGOING)
            .fetch_optional(&state.db)
            .await?;

    let Some(round) = round else {
        return Err(AppError::NotFound(
            "Round not found or already settled".to_string(),
        ));
    };

    let member: Option<(i64,)> =
        sqlx::query_as("SELECT user_id FROM room_members WHERE room_id = $1 AND user_id = $2")
            .bind(round.room_id)
            .bind(user.id)
            .fetch_optional(&state.db)
            .await?;

    if member.is_none() {
        return Err(AppError::Forbidden(
            "You are not a member of this room".to_string(),
        ));
    }

    // A repeat submission is a duplicate before it is anything else, even
    // when its payload is malformed. The unique constraint below still
    // decides races between concurrent submissions.
    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM guesses WHERE round_id = $1 AND user_id = $2")
            .bind(round_id)
            .bind(user.id)
            .fetch_optional(&state.db)
            .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "You have already submitted a guess for this round".to_string(),
        ));
    }

    let game_mode = GameMode::parse(&round.game_mode)
        .ok_or_else(|| anyhow::anyhow!("round {} has unknown game mode {}", round.id, round.game_mode))?;

    let payload = GuessPayload::from_parts(
        game_mode,
        body.tags,
        body.rating_min,
        body.rating_max,
        body.pass_rate_min,
        body.pass_rate_max,
    )?;

    let (guess_tags, rating_min, rating_max, pass_rate_min, pass_rate_max) = match &payload {
        GuessPayload::Tags(tags) => (Some(tags.clone()), None, None, None, None),
        GuessPayload::Rating { min, max } => (None, Some(*min), Some(*max), None, None),
        GuessPayload::PassRate { min, max } => (None, None, None, Some(*min), Some(*max)),
    };

    // UNIQUE (round_id, user_id) closes the race between concurrent
    // duplicate submissions.
    let guess: Guess = sqlx::query_as(
        r#"
INSERT INTO guesses
    (round_id, user_id, guess_tags, guess_rating_min, guess_rating_max,
     guess_pass_rate_min, guess_pass_rate_max)
VALUES ($1, $2, $3, $4, $5, $6, $7)
RETURNING *
        "#,
    )
    .bind(round_id)
    .bind(user.id)
    .bind(guess_tags)
    .bind(rating_min)
    .bind(rating_max)
    .bind(pass_rate_min)
    .bind(pass_rate_max)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        AppError::conflict_on_unique(e, "You have already submitted a guess for this round")
    })?;

    state.notifier.broadcast_to_room(
        round.room_id,
        GameEvent::GuessSubmitted {
            round_id,
            user_id: user.id,
        },
    );

    return Ok((StatusCode::CREATED, Json(GuessResponse { guess })).into_response());
}

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct SettledGuess {
    #[sqlx(flatten)]
    #[serde(flatten)]
    guess: Guess,
    username: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettleResults {
    problem_id: String,
    problem_name: String,
    actual_tags: Vec<String>,
    actual_rating: i32,
    actual_pass_rate: f64,
    guesses: Vec<SettledGuess>,
}

#[derive(Serialize)]
struct SettleResponse {
    results: SettleResults,
}

async fn settle_round(
    user: AuthUser,
    Path(round_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<SettleResponse>> {
    // Everything from the status guard to the status flip runs in one
    // transaction; any failure leaves the round ongoing with no point
    // movement.
    let mut tx = state.db.begin().await?;

    let round: Option<GameRound> =
        sqlx::query_as("SELECT * FROM game_rounds WHERE id = $1 AND status = $2 FOR UPDATE")
            .bind(round_id)
            .bind(ROUND_STATUS_ONGOING)
            .fetch_optional(&mut *tx)
            .await?;

    let Some(round) = round else {
        return Err(AppError::NotFound(
            "Round not found or already settled".to_string(),
        ));
    };

    let (owner_id,): (i64,) = sqlx::query_as("SELECT owner_id FROM rooms WHERE id = $1")
        .bind(round.room_id)
        .fetch_one(&mut *tx)
        .await?;

    if owner_id != user.id {
        return Err(AppError::Forbidden(
            "Only the room owner can settle the round".to_string(),
        ));
    }

    let game_mode = GameMode::parse(&round.game_mode)
        .ok_or_else(|| anyhow::anyhow!("round {} has unknown game mode {}", round.id, round.game_mode))?;

    let guesses: Vec<Guess> = sqlx::query_as("SELECT * FROM guesses WHERE round_id = $1 ORDER BY id")
        .bind(round_id)
        .fetch_all(&mut *tx)
        .await?;

    let mut outcomes = Vec::with_capacity(guesses.len());
    for guess in &guesses {
        let payload = GuessPayload::from_parts(
            game_mode,
            guess.guess_tags.clone(),
            guess.guess_rating_min,
            guess.guess_rating_max,
            guess.guess_pass_rate_min,
            guess.guess_pass_rate_max,
        )
        .map_err(|_| {
            AppError::Internal(anyhow::anyhow!(
                "guess {} does not match the mode of round {}",
                guess.id,
                round.id
            ))
        })?;

        outcomes.push(payload.is_correct(
            &round.problem_tags,
            round.problem_rating,
            round.actual_pass_rate,
        ));
    }

    let deltas = scoring::settlement_deltas(&outcomes, round.penalty_coefficient);

    for ((guess, correct), delta) in guesses.iter().zip(&outcomes).zip(&deltas) {
        sqlx::query("UPDATE guesses SET is_correct = $1, points_change = $2 WHERE id = $3")
            .bind(correct)
            .bind(delta)
            .bind(guess.id)
            .execute(&mut *tx)
            .await?;

        if *delta != 0.0 {
            sqlx::query("UPDATE users SET points = points + $1 WHERE id = $2")
                .bind(delta)
                .bind(guess.user_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    sqlx::query("UPDATE game_rounds SET status = $1, settled_at = now() WHERE id = $2")
        .bind(ROUND_STATUS_SETTLED)
        .bind(round_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let settled: Vec<SettledGuess> = sqlx::query_as(
        r#"
SELECT g.*, u.username
FROM guesses g
JOIN users u ON g.user_id = u.id
WHERE g.round_id = $1
ORDER BY g.id
        "#,
    )
    .bind(round_id)
    .fetch_all(&state.db)
    .await?;

    state
        .notifier
        .broadcast_to_room(round.room_id, GameEvent::RoundSettled { round_id });

    return Ok(Json(SettleResponse {
        results: SettleResults {
            problem_id: round.problem_id,
            problem_name: round.problem_name,
            actual_tags: round.problem_tags,
            actual_rating: round.problem_rating,
            actual_pass_rate: round.actual_pass_rate,
            guesses: settled,
        },
    }));
}
