use super::utils::{self, AuthUser};

use crate::{
    models::User,
    result::{AppError, Result},
    AppState,
};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    return router
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me));
}

#[derive(Debug, Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct AuthResponse {
    token: String,
    user: User,
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Response> {
    let username_len = body.username.chars().count();
    if username_len < 3 || username_len > 50 {
        return Err(AppError::InvalidArgument(
            "Username must be between 3 and 50 characters".to_string(),
        ));
    }

    if body.password.len() < 6 {
        return Err(AppError::InvalidArgument(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(body.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?
        .to_string();

    let user: User = sqlx::query_as(
        "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING *",
    )
    .bind(&body.username)
    .bind(&password_hash)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "Username already exists"))?;

    let token = utils::sign_token(user.id, &user.username, &state.cfg.jwt_secret)?;

    return Ok((StatusCode::CREATED, Json(AuthResponse { token, user })).into_response());
}

async fn login(State(state): State<AppState>, Json(body): Json<Credentials>) -> Result<Response> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(&body.username)
        .fetch_optional(&state.db)
        .await?;

    // Same error for unknown user and bad password.
    let Some(user) = user else {
        return Err(AppError::Forbidden("Invalid credentials".to_string()));
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    if Argon2::default()
        .verify_password(body.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Forbidden("Invalid credentials".to_string()));
    }

    let token = utils::sign_token(user.id, &user.username, &state.cfg.jwt_secret)?;

    return Ok(Json(AuthResponse { token, user }).into_response());
}

#[derive(Serialize)]
struct MeResponse {
    user: User,
}

async fn me(user: AuthUser, State(state): State<AppState>) -> Result<Json<MeResponse>> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_optional(&state.db)
        .await?;

    let Some(user) = user else {
        return Err(AppError::NotFound("User not found".to_string()));
    };

    return Ok(Json(MeResponse { user }));
}
