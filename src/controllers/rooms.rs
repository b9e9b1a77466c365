use super::utils::AuthUser;

use crate::{
    models::Room,
    notify::GameEvent,
    result::{AppError, Result},
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
        .route("/api/rooms", get(get_rooms).post(create_room))
        .route("/api/rooms/:id", get(get_room).delete(close_room))
        .route("/api/rooms/:id/join", post(join_room))
        .route("/api/rooms/:id/leave", post(leave_room));
}

#[derive(Debug, Deserialize)]
struct CreateRoom {
    name: String,
}

#[derive(Serialize)]
struct RoomResponse {
    room: Room,
}

async fn create_room(
    user: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateRoom>,
) -> Result<Response> {
    let name = body.name.trim();

    if name.is_empty() {
        return Err(AppError::InvalidArgument("Room name is required".to_string()));
    }

    // The owner becomes a member in the same transaction as the room insert.
    let mut tx = state.db.begin().await?;

    let room: Room = sqlx::query_as("INSERT INTO rooms (name, owner_id) VALUES ($1, $2) RETURNING *")
        .bind(name)
        .bind(user.id)
        .fetch_one(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO room_members (room_id, user_id) VALUES ($1, $2)")
        .bind(room.id)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    return Ok((StatusCode::CREATED, Json(RoomResponse { room })).into_response());
}

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomSummary {
    id: i64,
    name: String,
    owner_id: i64,
    owner_username: String,
    is_active: bool,
    member_count: i64,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct RoomsResponse {
    rooms: Vec<RoomSummary>,
}

async fn get_rooms(_user: AuthUser, State(state): State<AppState>) -> Result<Json<RoomsResponse>> {
    let rooms: Vec<RoomSummary> = sqlx::query_as(
        r#"
SELECT r.id, r.name, r.owner_id, u.username AS owner_username, r.is_active,
       COUNT(rm.user_id) AS member_count, r.created_at
FROM rooms r
JOIN users u ON r.owner_id = u.id
LEFT JOIN room_members rm ON r.id = rm.room_id
WHERE r.is_active = TRUE
GROUP BY r.id, u.username
ORDER BY r.created_at DESC
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    return Ok(Json(RoomsResponse { rooms }));
}

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct MemberInfo {
    id: i64,
    username: String,
    points: f64,
    joined_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct RoomDetailResponse {
    room: Room,
    members: Vec<MemberInfo>,
}

async fn get_room(
    _user: AuthUser,
    Path(room_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<RoomDetailResponse>> {
    let room: Option<Room> = sqlx::query_as("SELECT * FROM rooms WHERE id = $1")
        .bind(room_id)
        .fetch_optional(&state.db)
        .await?;

    let Some(room) = room else {
        return Err(AppError::NotFound("Room not found".to_string()));
    };

    let members: Vec<MemberInfo> = sqlx::query_as(
        r#"
SELECT u.id, u.username, u.points, rm.joined_at
FROM room_members rm
JOIN users u ON rm.user_id = u.id
WHERE rm.room_id = $1
ORDER BY rm.joined_at
        "#,
    )
    .bind(room_id)
    .fetch_all(&state.db)
    .await?;

    return Ok(Json(RoomDetailResponse { room, members }));
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn join_room(
    user: AuthUser,
    Path(room_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>> {
    let room: Option<Room> = sqlx::query_as("SELECT * FROM rooms WHERE id = $1 AND is_active = TRUE")
        .bind(room_id)
        .fetch_optional(&state.db)
        .await?;

    if room.is_none() {
        return Err(AppError::NotFound("Room not found or inactive".to_string()));
    }

    sqlx::query("INSERT INTO room_members (room_id, user_id) VALUES ($1, $2)")
        .bind(room_id)
        .bind(user.id)
        .execute(&state.db)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "Already in this room"))?;

    state
        .notifier
        .broadcast_to_room(room_id, GameEvent::MemberJoined { user_id: user.id });

    return Ok(Json(MessageResponse {
        message: "Joined room successfully",
    }));
}

async fn leave_room(
    user: AuthUser,
    Path(room_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>> {
    let room: Option<Room> = sqlx::query_as("SELECT * FROM rooms WHERE id = $1")
        .bind(room_id)
        .fetch_optional(&state.db)
        .await?;

    let Some(room) = room else {
        return Err(AppError::NotFound("Room not found".to_string()));
    };

    if room.owner_id == user.id {
        return Err(AppError::InvalidArgument(
            "Room owner cannot leave. Close the room instead.".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM room_members WHERE room_id = $1 AND user_id = $2")
        .bind(room_id)
        .bind(user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::InvalidArgument("Not in this room".to_string()));
    }

    state
        .notifier
        .broadcast_to_room(room_id, GameEvent::MemberLeft { user_id: user.id });

    return Ok(Json(MessageResponse {
        message: "Left room successfully",
    }));
}

async fn close_room(
    user: AuthUser,
    Path(room_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>> {
    let room: Option<Room> = sqlx::query_as("SELECT * FROM rooms WHERE id = $1")
        .bind(room_id)
        .fetch_optional(&state.db)
        .await?;

    let Some(room) = room else {
        return Err(AppError::NotFound("Room not found".to_string()));
    };

    if room.owner_id != user.id {
        return Err(AppError::Forbidden(
            "Only the room owner can close the room".to_string(),
        ));
    }

    // Closing is terminal and does not settle an ongoing round; a round left
    // ongoing here can still be settled afterwards.
    sqlx::query("UPDATE rooms SET is_active = FALSE WHERE id = $1")
        .bind(room_id)
        .execute(&state.db)
        .await?;

    state
        .notifier
        .broadcast_to_room(room_id, GameEvent::RoomClosed);

    return Ok(Json(MessageResponse {
        message: "Room closed successfully",
    }));
}
