// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with: ./scripts/test-with-emulator.sh
//!
//! The emulator provides a clean state for each test run.

use trava_api::error::AppError;
use trava_api::models::{Attraction, CalendarProvider, Itinerary, Review, SyncState, User};

mod common;
use common::test_db;

/// Generate a unique suffix for test isolation.
fn unique_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        .to_string()
}

fn test_user(suffix: &str) -> User {
    User {
        id: format!("user-{}", suffix),
        email: format!("test-{}@example.com", suffix),
        password_hash: "salt$hash".to_string(),
        user_name: format!("traveler-{}", suffix),
        bio: None,
        location: None,
        visited_places: vec![],
        favorites: vec![],
        created_at: "2026-01-15T10:00:00Z".to_string(),
    }
}

fn test_itinerary(suffix: &str, owner_id: &str) -> Itinerary {
    Itinerary {
        id: format!("it-{}", suffix),
        owner_id: owner_id.to_string(),
        name: "Kyoto in spring".to_string(),
        from: Some("2026-04-01T00:00:00Z".to_string()),
        to: Some("2026-04-08T00:00:00Z".to_string()),
        attractions: vec![],
        collaborators: vec![],
        public: false,
        sync_state: SyncState::None,
        created_at: "2026-01-15T10:00:00Z".to_string(),
        updated_at: "2026-01-15T10:00:00Z".to_string(),
    }
}

fn test_attraction(external_id: &str) -> Attraction {
    Attraction {
        external_id: external_id.to_string(),
        name: Some("Fushimi Inari".to_string()),
        image: None,
        address: Some("Kyoto".to_string()),
        description: None,
        rating: Some(4.7),
        url: None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_creation_and_lookup() {
    require_emulator!();

    let db = test_db().await;
    let suffix = unique_suffix();
    let user = test_user(&suffix);

    let before = db.get_user(&user.id).await.unwrap();
    assert!(before.is_none(), "User should not exist before creation");

    db.create_user(&user).await.unwrap();

    let fetched = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(fetched.email, user.email);
    assert_eq!(fetched.user_name, user.user_name);

    let by_email = db.get_user_by_email(&user.email).await.unwrap().unwrap();
    assert_eq!(by_email.id, user.id);

    let by_name = db
        .get_user_by_username(&user.user_name)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_name.id, user.id);
}

#[tokio::test]
async fn test_duplicate_user_id_conflicts() {
    require_emulator!();

    let db = test_db().await;
    let user = test_user(&unique_suffix());

    db.create_user(&user).await.unwrap();
    let err = db.create_user(&user).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
}

// ═══════════════════════════════════════════════════════════════════════════
// REVIEW TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_one_review_per_author_and_attraction() {
    require_emulator!();

    let db = test_db().await;
    let suffix = unique_suffix();
    let author_id = format!("user-{}", suffix);
    let attraction_id = format!("poi-{}", suffix);

    let review = Review {
        id: Review::document_id(&author_id, &attraction_id),
        attraction_id: attraction_id.clone(),
        author_id: author_id.clone(),
        rating: 5,
        comment: Some("Unmissable".to_string()),
        attraction_name: Some("Fushimi Inari".to_string()),
        attraction_address: None,
        attraction_image: None,
        created_at: "2026-01-15T10:00:00Z".to_string(),
    };

    db.insert_review(&review).await.unwrap();

    // Second review for the same pair must fail, even with different content.
    let mut second = review.clone();
    second.rating = 1;
    second.comment = Some("Changed my mind".to_string());
    let err = db.insert_review(&second).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);

    let listed = db.reviews_for_attraction(&attraction_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].rating, 5);
}

#[tokio::test]
async fn test_review_removal_is_author_only() {
    require_emulator!();

    let db = test_db().await;
    let suffix = unique_suffix();
    let author_id = format!("user-{}", suffix);
    let attraction_id = format!("poi-{}", suffix);

    let review = Review {
        id: Review::document_id(&author_id, &attraction_id),
        attraction_id,
        author_id: author_id.clone(),
        rating: 3,
        comment: None,
        attraction_name: None,
        attraction_address: None,
        attraction_image: None,
        created_at: "2026-01-15T10:00:00Z".to_string(),
    };
    db.insert_review(&review).await.unwrap();

    // A different caller cannot remove it, and the failure is quiet.
    let removed = db.remove_review(&review.id, "someone-else").await.unwrap();
    assert!(!removed);

    let removed = db.remove_review(&review.id, &author_id).await.unwrap();
    assert!(removed);

    // Removing an already-removed review reports false, not an error.
    let removed = db.remove_review(&review.id, &author_id).await.unwrap();
    assert!(!removed);
}

// ═══════════════════════════════════════════════════════════════════════════
// CATALOG TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_catalog_resolve_returns_existing_entry() {
    require_emulator!();

    let db = test_db().await;
    let external_id = format!("poi-{}", unique_suffix());

    let first = db
        .resolve_or_create_attraction(&test_attraction(&external_id))
        .await
        .unwrap();
    assert_eq!(first.name.as_deref(), Some("Fushimi Inari"));

    // Resolving again with different metadata keeps the original record.
    let mut variant = test_attraction(&external_id);
    variant.name = Some("Renamed".to_string());
    let second = db.resolve_or_create_attraction(&variant).await.unwrap();
    assert_eq!(second.name.as_deref(), Some("Fushimi Inari"));
}

// ═══════════════════════════════════════════════════════════════════════════
// ITINERARY MEMBERSHIP TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_collaborator_add_is_idempotent() {
    require_emulator!();

    let db = test_db().await;
    let suffix = unique_suffix();
    let owner = format!("owner-{}", suffix);
    let collaborator = format!("collab-{}", suffix);
    let itinerary = test_itinerary(&suffix, &owner);

    db.create_itinerary(&itinerary).await.unwrap();

    let updated = db
        .add_collaborator(&itinerary.id, &collaborator)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.collaborators, vec![collaborator.clone()]);

    // Adding again changes nothing.
    let updated = db
        .add_collaborator(&itinerary.id, &collaborator)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.collaborators.len(), 1);

    // The owner is never added to the collaborator set.
    let updated = db
        .add_collaborator(&itinerary.id, &owner)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.collaborators.len(), 1);
}

#[tokio::test]
async fn test_attraction_attach_dedupes_by_external_id() {
    require_emulator!();

    let db = test_db().await;
    let suffix = unique_suffix();
    let itinerary = test_itinerary(&suffix, &format!("owner-{}", suffix));
    let external_id = format!("poi-{}", suffix);

    db.create_itinerary(&itinerary).await.unwrap();

    let updated = db
        .add_attraction_if_absent(&itinerary.id, test_attraction(&external_id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.attractions.len(), 1);

    // Attaching a duplicate is a benign no-op, not an error.
    let updated = db
        .add_attraction_if_absent(&itinerary.id, test_attraction(&external_id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.attractions.len(), 1);

    let updated = db
        .remove_attraction(&itinerary.id, &external_id)
        .await
        .unwrap()
        .unwrap();
    assert!(updated.attractions.is_empty());
}

#[tokio::test]
async fn test_concurrent_membership_mutations_keep_both_effects() {
    require_emulator!();

    let db = test_db().await;
    let suffix = unique_suffix();
    let itinerary = test_itinerary(&suffix, &format!("owner-{}", suffix));
    let collaborator = format!("collab-{}", suffix);
    let external_id = format!("poi-{}", suffix);

    db.create_itinerary(&itinerary).await.unwrap();

    // Race two different mutations of the same document. The transactional
    // read means a conflicting commit aborts rather than blind-writing over
    // the other side's update; the aborted side is retried below.
    let (added_collab, added_attraction) = tokio::join!(
        db.add_collaborator(&itinerary.id, &collaborator),
        db.add_attraction_if_absent(&itinerary.id, test_attraction(&external_id)),
    );

    if added_collab.is_err() {
        db.add_collaborator(&itinerary.id, &collaborator)
            .await
            .unwrap();
    }
    if added_attraction.is_err() {
        db.add_attraction_if_absent(&itinerary.id, test_attraction(&external_id))
            .await
            .unwrap();
    }

    // Neither update may be lost.
    let final_doc = db.get_itinerary(&itinerary.id).await.unwrap().unwrap();
    assert_eq!(final_doc.collaborators, vec![collaborator]);
    assert!(final_doc.has_attraction(&external_id));
}

#[tokio::test]
async fn test_sync_state_for_missing_itinerary_is_none() {
    require_emulator!();

    let db = test_db().await;
    let missing_id = format!("it-missing-{}", unique_suffix());

    let result = db
        .set_sync_state(&missing_id, CalendarProvider::Google)
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_share_publishes_once() {
    require_emulator!();

    let db = test_db().await;
    let suffix = unique_suffix();
    let itinerary = test_itinerary(&suffix, &format!("owner-{}", suffix));

    db.create_itinerary(&itinerary).await.unwrap();

    let updated = db.set_public(&itinerary.id).await.unwrap().unwrap();
    assert!(updated.public);

    // Sharing again is a no-op success.
    let updated = db.set_public(&itinerary.id).await.unwrap().unwrap();
    assert!(updated.public);
}
