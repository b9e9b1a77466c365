use crate::{
    result::{AppError, Result},
    AppState,
};

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    headers::{authorization::Bearer, Authorization},
    http::request::Parts,
    RequestPartsExt, TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub uid: i64,    // user id
    pub exp: usize,  // expiration timestamp
}

pub fn sign_token(user_id: i64, username: &str, secret: &str) -> Result<String> {
    let expiration = Utc::now() + Duration::days(TOKEN_TTL_DAYS);

    let claims = Claims {
        sub: username.to_owned(),
        uid: user_id,
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    return Ok(token);
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Forbidden("Invalid or expired token".to_string()))?;

    return Ok(data.claims);
}

/// Authenticated caller, extracted from the `Authorization: Bearer` header.
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Forbidden("Authentication required".to_string()))?;

        let claims = verify_token(bearer.token(), &state.cfg.jwt_secret)?;

        return Ok(AuthUser {
            id: claims.uid,
            username: claims.sub,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let token = sign_token(42, "alice", "test-secret").unwrap();
        let claims = verify_token(&token, "test-secret").unwrap();

        assert_eq!(claims.uid, 42);
        assert_eq!(claims.sub, "alice");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_token(42, "alice", "test-secret").unwrap();
        let err = verify_token(&token, "other-secret").unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: "alice".to_string(),
            uid: 42,
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let err = verify_token(&token, "test-secret").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
