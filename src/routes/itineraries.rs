// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Itinerary routes: CRUD, collaborators, attached attractions, sharing,
//! and calendar sync.
//!
//! Every mutating handler classifies the caller through
//! [`Itinerary::classify`] before acting; a `None` classification is a hard
//! `Forbidden`, never a silent no-op.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Attraction, CalendarProvider, Itinerary, ItineraryAccess, SyncState};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Authenticated itinerary routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/itineraries", post(create_itinerary).get(list_itineraries))
        .route(
            "/api/itineraries/{id}",
            get(get_itinerary)
                .put(update_itinerary)
                .delete(delete_itinerary),
        )
        .route(
            "/api/itineraries/{id}/collaborators",
            post(add_collaborator),
        )
        .route(
            "/api/itineraries/{id}/collaborators/{user_id}",
            delete(remove_collaborator),
        )
        .route(
            "/api/itineraries/{id}/attractions",
            post(add_attraction).get(list_attractions),
        )
        .route(
            "/api/itineraries/{id}/attractions/{attraction_id}",
            delete(remove_attraction),
        )
        .route("/api/itineraries/{id}/share", post(share_itinerary))
        .route("/api/itineraries/{id}/sync", post(sync_itinerary))
}

/// Public itinerary routes (no auth).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/itineraries/shared/{id}", get(get_shared_itinerary))
        .route("/api/itineraries/google/callback", get(google_callback))
}

/// Fetch an itinerary and classify the caller, rejecting `None`.
async fn load_classified(
    state: &AppState,
    itinerary_id: &str,
    caller_id: &str,
) -> Result<(Itinerary, ItineraryAccess)> {
    let itinerary = state
        .db
        .get_itinerary(itinerary_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Itinerary not found".to_string()))?;

    match itinerary.classify(caller_id) {
        ItineraryAccess::None => Err(AppError::Forbidden(
            "You are not authorized to access this itinerary".to_string(),
        )),
        access => Ok((itinerary, access)),
    }
}

// ─── Create / List ───────────────────────────────────────────

/// Attraction payload as supplied by the frontend. `id` is the external id
/// from the originating source.
#[derive(Debug, Deserialize)]
pub struct AttractionPayload {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub url: Option<String>,
}

impl From<AttractionPayload> for Attraction {
    fn from(payload: AttractionPayload) -> Self {
        Attraction {
            external_id: payload.id,
            name: payload.name,
            image: payload.image,
            address: payload.address,
            description: payload.description,
            rating: payload.rating,
            url: payload.url,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateItineraryRequest {
    pub name: String,
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(default)]
    pub attractions: Vec<AttractionPayload>,
}

async fn create_itinerary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateItineraryRequest>,
) -> Result<(StatusCode, Json<Itinerary>)> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    // Deduplicate seed attractions by external id, keeping first occurrence.
    let mut seen = BTreeSet::new();
    let attractions: Vec<Attraction> = payload
        .attractions
        .into_iter()
        .map(Attraction::from)
        .filter(|a| !a.external_id.is_empty() && seen.insert(a.external_id.clone()))
        .collect();

    let now = now_rfc3339();
    let itinerary = Itinerary {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: user.user_id.clone(),
        name: payload.name,
        from: payload.from,
        to: payload.to,
        attractions,
        collaborators: vec![],
        public: false,
        sync_state: SyncState::None,
        created_at: now.clone(),
        updated_at: now,
    };

    state.db.create_itinerary(&itinerary).await?;

    tracing::info!(itinerary_id = %itinerary.id, "Itinerary created");

    Ok((StatusCode::CREATED, Json(itinerary)))
}

/// Collaborator entry expanded to a displayable shape.
#[derive(Serialize)]
pub struct CollaboratorInfo {
    pub id: String,
    pub user_name: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct ItineraryResponse {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub attractions: Vec<Attraction>,
    pub collaborators: Vec<CollaboratorInfo>,
    pub public: bool,
    pub sync_state: SyncState,
    pub created_at: String,
    pub updated_at: String,
}

/// List itineraries the caller owns or collaborates on, with collaborator
/// ids expanded to user info via one batched lookup.
async fn list_itineraries(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ItineraryResponse>>> {
    let itineraries = state.db.itineraries_for_user(&user.user_id).await?;

    let collaborator_ids: BTreeSet<String> = itineraries
        .iter()
        .flat_map(|i| i.collaborators.iter().cloned())
        .collect();
    let users = state.db.find_users(&collaborator_ids).await?;

    let responses = itineraries
        .into_iter()
        .map(|itinerary| {
            let collaborators = itinerary
                .collaborators
                .iter()
                .filter_map(|id| users.get(id))
                .map(|u| CollaboratorInfo {
                    id: u.id.clone(),
                    user_name: u.user_name.clone(),
                    email: u.email.clone(),
                })
                .collect();

            ItineraryResponse {
                id: itinerary.id,
                owner_id: itinerary.owner_id,
                name: itinerary.name,
                from: itinerary.from,
                to: itinerary.to,
                attractions: itinerary.attractions,
                collaborators,
                public: itinerary.public,
                sync_state: itinerary.sync_state,
                created_at: itinerary.created_at,
                updated_at: itinerary.updated_at,
            }
        })
        .collect();

    Ok(Json(responses))
}

// ─── Get / Update / Delete ───────────────────────────────────

async fn get_itinerary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Itinerary>> {
    let (itinerary, _) = load_classified(&state, &id, &user.user_id).await?;
    Ok(Json(itinerary))
}

/// Update payload. Deliberately has no `public` field: publishing is
/// one-way and goes through the share endpoint.
#[derive(Deserialize)]
pub struct UpdateItineraryRequest {
    pub name: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

async fn update_itinerary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateItineraryRequest>,
) -> Result<Json<Itinerary>> {
    let (mut itinerary, _) = load_classified(&state, &id, &user.user_id).await?;

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty".to_string()));
        }
        itinerary.name = name;
    }
    if let Some(from) = payload.from {
        itinerary.from = Some(from);
    }
    if let Some(to) = payload.to {
        itinerary.to = Some(to);
    }
    itinerary.updated_at = now_rfc3339();

    state.db.update_itinerary(&itinerary).await?;

    Ok(Json(itinerary))
}

#[derive(Serialize)]
pub struct DeleteItineraryResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itinerary: Option<Itinerary>,
}

/// Role-dependent delete: the owner destroys the itinerary; a collaborator
/// "deleting" it just leaves the collaborator set.
async fn delete_itinerary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<DeleteItineraryResponse>> {
    let (itinerary, access) = load_classified(&state, &id, &user.user_id).await?;

    if access == ItineraryAccess::Owner {
        state.db.delete_itinerary(&itinerary.id).await?;
        tracing::info!(itinerary_id = %itinerary.id, "Itinerary deleted by owner");
        Ok(Json(DeleteItineraryResponse {
            message: "Itinerary deleted".to_string(),
            itinerary: None,
        }))
    } else {
        // Collaborators "deleting" an itinerary leave its collaborator set.
        let updated = state
            .db
            .remove_collaborator(&itinerary.id, &user.user_id)
            .await?;
        tracing::info!(itinerary_id = %itinerary.id, "Collaborator left itinerary");
        Ok(Json(DeleteItineraryResponse {
            message: "Removed from collaborators".to_string(),
            itinerary: updated,
        }))
    }
}

// ─── Collaborators ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct AddCollaboratorRequest {
    pub collaborator_email: String,
}

#[derive(Serialize)]
pub struct CollaboratorChangeResponse {
    pub message: String,
    pub itinerary: Itinerary,
}

async fn add_collaborator(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<AddCollaboratorRequest>,
) -> Result<Json<CollaboratorChangeResponse>> {
    let (itinerary, access) = load_classified(&state, &id, &user.user_id).await?;
    if access != ItineraryAccess::Owner {
        return Err(AppError::Forbidden(
            "Only the owner can add collaborators".to_string(),
        ));
    }

    let collaborator = state
        .db
        .get_user_by_email(&payload.collaborator_email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if collaborator.id == itinerary.owner_id {
        return Err(AppError::BadRequest(
            "The owner cannot be added as a collaborator".to_string(),
        ));
    }

    // Idempotent set insert: adding an existing collaborator succeeds
    // without changing anything.
    let updated = state
        .db
        .add_collaborator(&itinerary.id, &collaborator.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Itinerary not found".to_string()))?;

    Ok(Json(CollaboratorChangeResponse {
        message: "Collaborator added".to_string(),
        itinerary: updated,
    }))
}

async fn remove_collaborator(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, collaborator_id)): Path<(String, String)>,
) -> Result<Json<CollaboratorChangeResponse>> {
    let (itinerary, access) = load_classified(&state, &id, &user.user_id).await?;
    if access != ItineraryAccess::Owner {
        return Err(AppError::Forbidden(
            "Only the owner can remove collaborators".to_string(),
        ));
    }

    // Removing a user who was never a collaborator is a quiet no-op.
    let updated = state
        .db
        .remove_collaborator(&itinerary.id, &collaborator_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Itinerary not found".to_string()))?;

    Ok(Json(CollaboratorChangeResponse {
        message: "Collaborator removed".to_string(),
        itinerary: updated,
    }))
}

// ─── Attractions ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct AttractionChangeResponse {
    pub message: String,
    pub itinerary: Itinerary,
}

async fn add_attraction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<AttractionPayload>,
) -> Result<Json<AttractionChangeResponse>> {
    if payload.id.is_empty() {
        return Err(AppError::BadRequest(
            "Attraction ID is required".to_string(),
        ));
    }

    let (itinerary, _) = load_classified(&state, &id, &user.user_id).await?;

    // Resolve the shared catalog entry first (lazy, race-safe create), then
    // attach the resolved record so every itinerary references the same
    // catalog identity.
    let attraction = state
        .db
        .resolve_or_create_attraction(&Attraction::from(payload))
        .await?;

    let updated = state
        .db
        .add_attraction_if_absent(&itinerary.id, attraction)
        .await?
        .ok_or_else(|| AppError::NotFound("Itinerary not found".to_string()))?;

    Ok(Json(AttractionChangeResponse {
        message: "Attraction added".to_string(),
        itinerary: updated,
    }))
}

async fn remove_attraction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, attraction_id)): Path<(String, String)>,
) -> Result<Json<AttractionChangeResponse>> {
    let (itinerary, _) = load_classified(&state, &id, &user.user_id).await?;

    let updated = state
        .db
        .remove_attraction(&itinerary.id, &attraction_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Itinerary not found".to_string()))?;

    Ok(Json(AttractionChangeResponse {
        message: "Attraction removed".to_string(),
        itinerary: updated,
    }))
}

async fn list_attractions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Attraction>>> {
    let (itinerary, _) = load_classified(&state, &id, &user.user_id).await?;
    Ok(Json(itinerary.attractions))
}

// ─── Sharing ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ShareResponse {
    pub itinerary_id: String,
}

/// One-way publish; the frontend builds the share URL from the id.
async fn share_itinerary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ShareResponse>> {
    let (itinerary, access) = load_classified(&state, &id, &user.user_id).await?;
    if access != ItineraryAccess::Owner {
        return Err(AppError::Forbidden(
            "Only the owner can share an itinerary".to_string(),
        ));
    }

    let updated = state
        .db
        .set_public(&itinerary.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Itinerary not found".to_string()))?;

    Ok(Json(ShareResponse {
        itinerary_id: updated.id,
    }))
}

/// Public read of a shared itinerary. A private itinerary looks exactly
/// like a missing one here.
async fn get_shared_itinerary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Itinerary>> {
    let itinerary = state
        .db
        .get_itinerary(&id)
        .await?
        .filter(|i| i.public)
        .ok_or_else(|| AppError::NotFound("Public itinerary not found".to_string()))?;

    Ok(Json(itinerary))
}

// ─── Calendar Sync ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct SyncRequest {
    pub provider: CalendarProvider,
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub provider: CalendarProvider,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
}

async fn sync_itinerary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<SyncRequest>,
) -> Result<Json<SyncResponse>> {
    let (itinerary, _) = load_classified(&state, &id, &user.user_id).await?;

    // Re-sync with the same provider is a no-op success.
    if itinerary.sync_state
        == (SyncState::Synced {
            provider: payload.provider,
        })
    {
        return Ok(Json(SyncResponse {
            provider: payload.provider,
            message: "Already synced with this calendar.".to_string(),
            auth_url: None,
        }));
    }

    match payload.provider {
        CalendarProvider::Google => {
            // Sync completes in the OAuth callback once consent is granted.
            let auth_url = state.calendar.auth_url(&itinerary.id);
            Ok(Json(SyncResponse {
                provider: CalendarProvider::Google,
                message: "Redirecting to Google Calendar authorization...".to_string(),
                auth_url: Some(auth_url),
            }))
        }
        CalendarProvider::Ical => {
            state
                .db
                .set_sync_state(&itinerary.id, CalendarProvider::Ical)
                .await?
                .ok_or_else(|| AppError::NotFound("Itinerary not found".to_string()))?;

            tracing::info!(itinerary_id = %itinerary.id, "Itinerary synced to iCal");

            Ok(Json(SyncResponse {
                provider: CalendarProvider::Ical,
                message: "Itinerary synced".to_string(),
                auth_url: None,
            }))
        }
    }
}

#[derive(Deserialize)]
pub struct GoogleCallbackParams {
    pub code: Option<String>,
    /// Itinerary id, carried through the OAuth round-trip.
    pub state: Option<String>,
}

/// Google OAuth callback: exchange the code, insert the event, record the
/// sync, and bounce back to the frontend.
async fn google_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GoogleCallbackParams>,
) -> Result<Redirect> {
    let code = params.code.ok_or_else(|| {
        AppError::BadRequest("Missing authorization code or itinerary ID".to_string())
    })?;
    let itinerary_id = params.state.ok_or_else(|| {
        AppError::BadRequest("Missing authorization code or itinerary ID".to_string())
    })?;

    let itinerary = state
        .db
        .get_itinerary(&itinerary_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Itinerary not found after auth".to_string()))?;

    let access_token = state.calendar.exchange_code(&code).await?;
    let event_link = state.calendar.insert_event(&access_token, &itinerary).await?;

    // The itinerary may have been deleted while the user was on Google's
    // consent screen; a redirect claiming success would be a lie.
    state
        .db
        .set_sync_state(&itinerary.id, CalendarProvider::Google)
        .await?
        .ok_or_else(|| AppError::NotFound("Itinerary not found after auth".to_string()))?;

    tracing::info!(
        itinerary_id = %itinerary.id,
        event_link = ?event_link,
        "Itinerary synced to Google Calendar"
    );

    Ok(Redirect::temporary(&format!(
        "{}/itineraries/{}?synced=google",
        state.config.frontend_url, itinerary.id
    )))
}
