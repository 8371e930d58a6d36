// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Review routes: create, list per attraction, update, delete.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Review;
use crate::services::enrich::{enrich_reviews, EnrichedReview};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Authenticated review routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reviews", post(create_review))
        .route(
            "/api/reviews/{review_id}",
            put(update_review).delete(delete_review),
        )
}

/// Public review routes (no auth).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/attractions/{attraction_id}/reviews",
        get(reviews_for_attraction),
    )
}

// ─── Create ──────────────────────────────────────────────────

/// Create-review payload. Snapshot fields are optional denormalized copies
/// of attraction metadata, captured so the review stays readable even if
/// the catalog entry later changes or disappears.
#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub attraction_id: Option<String>,
    pub rating: Option<u32>,
    pub comment: Option<String>,
    pub attraction_name: Option<String>,
    pub attraction_address: Option<String>,
    pub attraction_image: Option<String>,
}

async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    let attraction_id = payload
        .attraction_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            AppError::BadRequest("Attraction ID and rating are required".to_string())
        })?;
    let rating = payload.rating.ok_or_else(|| {
        AppError::BadRequest("Attraction ID and rating are required".to_string())
    })?;
    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    let review = Review {
        id: Review::document_id(&user.user_id, &attraction_id),
        attraction_id,
        author_id: user.user_id.clone(),
        rating,
        comment: payload.comment,
        attraction_name: payload.attraction_name,
        attraction_address: payload.attraction_address,
        attraction_image: payload.attraction_image,
        created_at: now_rfc3339(),
    };

    // The composite document id enforces one review per (author, attraction);
    // a duplicate insert surfaces as Conflict straight from the store.
    state.db.insert_review(&review).await?;

    tracing::info!(
        review_id = %review.id,
        attraction_id = %review.attraction_id,
        "Review created"
    );

    Ok((StatusCode::CREATED, Json(review)))
}

// ─── List ────────────────────────────────────────────────────

async fn reviews_for_attraction(
    State(state): State<Arc<AppState>>,
    Path(attraction_id): Path<String>,
) -> Result<Json<Vec<EnrichedReview>>> {
    let reviews = state.db.reviews_for_attraction(&attraction_id).await?;
    let enriched = enrich_reviews(&state.db, reviews).await?;
    Ok(Json(enriched))
}

// ─── Update ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<u32>,
    pub comment: Option<String>,
}

/// Author-only edit of rating and comment. The review keeps its identity:
/// neither the attraction nor the author can change.
async fn update_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(review_id): Path<String>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<Json<Review>> {
    let mut review = state
        .db
        .get_review(&review_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

    if review.author_id != user.user_id {
        return Err(AppError::Forbidden(
            "Not authorized to edit this review".to_string(),
        ));
    }

    if let Some(rating) = payload.rating {
        if !(1..=5).contains(&rating) {
            return Err(AppError::BadRequest(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
        review.rating = rating;
    }
    if let Some(comment) = payload.comment {
        review.comment = Some(comment);
    }

    state.db.update_review(&review).await?;

    Ok(Json(review))
}

// ─── Delete ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct DeleteReviewResponse {
    pub message: String,
}

async fn delete_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(review_id): Path<String>,
) -> Result<Json<DeleteReviewResponse>> {
    let deleted = state.db.remove_review(&review_id, &user.user_id).await?;
    if !deleted {
        // Fail closed: missing review and non-author look the same.
        return Err(AppError::NotFound(
            "Review not found or unauthorized".to_string(),
        ));
    }

    Ok(Json(DeleteReviewResponse {
        message: "Review deleted".to_string(),
    }))
}
