// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile routes and paginated review listings.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Itinerary, PublicProfile, User};
use crate::services::enrich::{enrich_reviews, EnrichedReview};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How many reviews a profile page shows inline.
const RECENT_REVIEWS_LIMIT: u32 = 5;

const DEFAULT_PAGE_LIMIT: u32 = 10;
/// Server-side cap on page size, regardless of what the client asks for.
const MAX_PAGE_LIMIT: u32 = 50;

/// Authenticated user routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user/profile", get(get_profile).put(update_profile))
        .route("/api/user/reviews", get(my_reviews))
}

/// Public profile routes (no auth).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/user/profile/username/{username}",
            get(public_profile),
        )
        .route("/api/user/{username}/reviews", get(reviews_by_username))
}

// ─── Pagination helpers ──────────────────────────────────────

#[derive(Deserialize)]
struct PageQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

/// Clamp client paging input: pages are 1-indexed, limit is bounded.
fn clamp_paging(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    (page, limit)
}

fn page_count(total: usize, limit: u32) -> u32 {
    total.div_ceil(limit as usize) as u32
}

/// Store offset for a 1-indexed page. Widened to u64 so an absurd page
/// number cannot overflow; saturates at the store's offset ceiling, where
/// the query simply returns an empty page.
fn page_offset(page: u32, limit: u32) -> u32 {
    let offset = (page as u64 - 1) * limit as u64;
    u32::try_from(offset).unwrap_or(u32::MAX)
}

#[derive(Serialize)]
pub struct ReviewsPageResponse {
    pub reviews: Vec<EnrichedReview>,
    pub total: usize,
    pub page: u32,
    pub page_count: u32,
    pub limit: u32,
}

/// Fetch one page of a user's reviews plus the total, then enrich.
/// Enrichment never changes order or the pagination numbers.
async fn fetch_review_page(
    db: &FirestoreDb,
    user_id: &str,
    page: u32,
    limit: u32,
) -> Result<ReviewsPageResponse> {
    let reviews = db
        .reviews_by_user(user_id, limit, page_offset(page, limit))
        .await?;
    let total = db.count_reviews_by_user(user_id).await?;
    let enriched = enrich_reviews(db, reviews).await?;

    Ok(ReviewsPageResponse {
        reviews: enriched,
        total,
        page,
        page_count: page_count(total, limit),
        limit,
    })
}

// ─── Own profile ─────────────────────────────────────────────

/// Profile view of the authenticated user (no credential hash).
#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    pub user_name: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub visited_places: Vec<String>,
    pub favorites: Vec<String>,
    pub created_at: String,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            user_name: user.user_name.clone(),
            bio: user.bio.clone(),
            location: user.location.clone(),
            visited_places: user.visited_places.clone(),
            favorites: user.favorites.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct OwnProfileResponse {
    pub user: ProfileResponse,
    pub recent_reviews: Vec<EnrichedReview>,
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<OwnProfileResponse>> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let recent = state
        .db
        .reviews_by_user(&auth.user_id, RECENT_REVIEWS_LIMIT, 0)
        .await?;
    let recent_reviews = enrich_reviews(&state.db, recent).await?;

    Ok(Json(OwnProfileResponse {
        user: ProfileResponse::from(&user),
        recent_reviews,
    }))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub user_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub visited_places: Option<Vec<String>>,
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    let mut user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Some(user_name) = payload.user_name {
        if user_name != user.user_name {
            if state
                .db
                .get_user_by_username(&user_name)
                .await?
                .is_some()
            {
                return Err(AppError::Conflict(
                    "Display name already taken".to_string(),
                ));
            }
            user.user_name = user_name;
        }
    }
    if let Some(bio) = payload.bio {
        user.bio = Some(bio);
    }
    if let Some(location) = payload.location {
        user.location = Some(location);
    }
    if let Some(visited) = payload.visited_places {
        user.visited_places = visited;
    }

    state.db.update_user(&user).await?;

    Ok(Json(ProfileResponse::from(&user)))
}

// ─── Public profile ──────────────────────────────────────────

#[derive(Serialize)]
pub struct PublicProfileResponse {
    pub user: PublicProfile,
    pub itineraries: Vec<Itinerary>,
    pub recent_reviews: Vec<EnrichedReview>,
}

async fn public_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<PublicProfileResponse>> {
    let user = state
        .db
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let itineraries = state.db.public_itineraries_for_user(&user.id).await?;
    let recent = state
        .db
        .reviews_by_user(&user.id, RECENT_REVIEWS_LIMIT, 0)
        .await?;
    let recent_reviews = enrich_reviews(&state.db, recent).await?;

    Ok(Json(PublicProfileResponse {
        user: PublicProfile::from(&user),
        itineraries,
        recent_reviews,
    }))
}

// ─── Review listings ─────────────────────────────────────────

async fn my_reviews(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<PageQuery>,
) -> Result<Json<ReviewsPageResponse>> {
    let (page, limit) = clamp_paging(params.page, params.limit);
    let response = fetch_review_page(&state.db, &auth.user_id, page, limit).await?;
    Ok(Json(response))
}

async fn reviews_by_username(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Query(params): Query<PageQuery>,
) -> Result<Json<ReviewsPageResponse>> {
    let user = state
        .db
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let (page, limit) = clamp_paging(params.page, params.limit);
    let response = fetch_review_page(&state.db, &user.id, page, limit).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_paging_defaults() {
        assert_eq!(clamp_paging(None, None), (1, DEFAULT_PAGE_LIMIT));
    }

    #[test]
    fn test_clamp_paging_floors_page() {
        assert_eq!(clamp_paging(Some(0), Some(10)), (1, 10));
    }

    #[test]
    fn test_clamp_paging_caps_limit() {
        assert_eq!(clamp_paging(Some(2), Some(500)), (2, MAX_PAGE_LIMIT));
        assert_eq!(clamp_paging(Some(2), Some(0)), (2, 1));
    }

    #[test]
    fn test_page_offset_math() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
        assert_eq!(page_offset(2, MAX_PAGE_LIMIT), 50);
    }

    #[test]
    fn test_page_offset_saturates_on_huge_page() {
        // u32::MAX * 50 would overflow u32; the offset must clamp, not wrap.
        assert_eq!(page_offset(u32::MAX, MAX_PAGE_LIMIT), u32::MAX);
        assert_eq!(page_offset(u32::MAX, 1), u32::MAX - 1);
    }

    #[test]
    fn test_page_count_math() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(101, 50), 3);
    }
}
