// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration and login routes.
//!
//! Issues HS256 session JWTs; the token is returned in the body and also set
//! as an HttpOnly cookie so browser clients need no token plumbing.

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::models::User;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use validator::Validate;

const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => unreachable!(),
};
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user/register", post(register))
        .route("/api/user/login", post(login))
        .route("/api/user/logout", post(logout))
}

// ─── Credential Hashing ──────────────────────────────────────

/// Hash a password with PBKDF2-HMAC-SHA256 and a random salt.
/// Stored as "salt_hex$hash_hex".
fn hash_password(password: &str) -> Result<String> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to generate salt")))?;

    let mut hash = [0u8; HASH_LEN];
    ring::pbkdf2::derive(
        ring::pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        &salt,
        password.as_bytes(),
        &mut hash,
    );

    Ok(format!("{}${}", hex::encode(salt), hex::encode(hash)))
}

/// Verify a password against a stored "salt_hex$hash_hex" value.
fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, hash_hex)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (hex::decode(salt_hex), hex::decode(hash_hex)) else {
        return false;
    };

    ring::pbkdf2::verify(
        ring::pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        &salt,
        password.as_bytes(),
        &hash,
    )
    .is_ok()
}

// ─── Register ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub password2: String,
    #[validate(length(min = 3, max = 40, message = "Display name must be 3-40 characters"))]
    pub user_name: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if payload.password != payload.password2 {
        return Err(AppError::BadRequest("Passwords do not match".to_string()));
    }

    if state.db.get_user_by_email(&payload.email).await?.is_some() {
        return Err(AppError::Conflict("Email already taken".to_string()));
    }
    if state
        .db
        .get_user_by_username(&payload.user_name)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Display name already taken".to_string()));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: payload.email.clone(),
        password_hash: hash_password(&payload.password)?,
        user_name: payload.user_name,
        bio: None,
        location: None,
        visited_places: vec![],
        favorites: vec![],
        created_at: now_rfc3339(),
    };

    state.db.create_user(&user).await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok(Json(MessageResponse {
        message: format!("User {} successfully registered", payload.email),
    }))
}

// ─── Login ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginUser {
    pub id: String,
    pub email: String,
    pub user_name: String,
    pub favorites: Vec<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: LoginUser,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let user = state
        .db
        .get_user_by_email(&payload.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&payload.password, &user.password_hash) {
        tracing::warn!(email = %payload.email, "Failed login attempt");
        return Err(AppError::Unauthorized);
    }

    let token = create_jwt(&user.id, &user.email, &state.config.jwt_signing_key)?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            message: "login successful".to_string(),
            token,
            user: LoginUser {
                id: user.id,
                email: user.email,
                user_name: user.user_name,
                favorites: user.favorites,
            },
        }),
    ))
}

// ─── Logout ──────────────────────────────────────────────────

async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    (
        jar,
        Json(MessageResponse {
            message: "logged out".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_rejects_malformed_stored_value() {
        assert!(!verify_password("anything", "not-a-valid-record"));
        assert!(!verify_password("anything", "zz$zz"));
    }
}
