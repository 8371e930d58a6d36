// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Saved-attraction routes: a per-user bookmark list, kept separate from the
//! shared attraction catalog.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Attraction, SavedAttraction};
use crate::routes::itineraries::AttractionPayload;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Authenticated saved-attraction routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/attractions/save", post(save_attraction))
        .route("/api/attractions/saved", get(list_saved))
        .route(
            "/api/attractions/saved/{attraction_id}",
            delete(remove_saved),
        )
}

#[derive(Serialize)]
pub struct SaveResponse {
    pub message: String,
    pub attraction: Attraction,
}

/// Save an attraction for the caller. Saving the same attraction twice just
/// refreshes the stored copy.
async fn save_attraction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AttractionPayload>,
) -> Result<(StatusCode, Json<SaveResponse>)> {
    if payload.id.is_empty() {
        return Err(AppError::BadRequest(
            "Attraction ID is required".to_string(),
        ));
    }

    let attraction = Attraction::from(payload);
    let saved = SavedAttraction {
        user_id: user.user_id.clone(),
        attraction: attraction.clone(),
        saved_at: now_rfc3339(),
    };

    state.db.save_attraction(&saved).await?;

    Ok((
        StatusCode::CREATED,
        Json(SaveResponse {
            message: "Attraction saved".to_string(),
            attraction,
        }),
    ))
}

async fn list_saved(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<SavedAttraction>>> {
    let saved = state.db.saved_attractions_for_user(&user.user_id).await?;
    Ok(Json(saved))
}

#[derive(Serialize)]
pub struct RemoveSavedResponse {
    pub message: String,
}

/// Remove a saved attraction. Removing one that was never saved is a quiet
/// success.
async fn remove_saved(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(attraction_id): Path<String>,
) -> Result<Json<RemoveSavedResponse>> {
    state
        .db
        .remove_saved_attraction(&user.user_id, &attraction_id)
        .await?;

    Ok(Json(RemoveSavedResponse {
        message: "Attraction removed from saved".to_string(),
    }))
}
