// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage, display-name lookups)
//! - Itineraries (membership mutations as atomic conditional updates)
//! - Attractions (deduplicated catalog + per-user saved copies)
//! - Reviews (uniqueness enforced by the document id)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    Attraction, CalendarProvider, Itinerary, Review, SavedAttraction, SyncState, User,
};
use crate::time_utils::now_rfc3339;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};

/// Firestore caps `in` filters; keep batches under the limit.
const IN_QUERY_CHUNK: usize = 10;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Row shape for count aggregations.
#[derive(Debug, Deserialize)]
struct CountRow {
    total: usize,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Document id for a catalog attraction. External ids may contain
    /// arbitrary bytes, so they are urlencoded.
    fn attraction_doc_id(external_id: &str) -> String {
        urlencoding::encode(external_id).into_owned()
    }

    /// Document id for a user's saved copy of an attraction.
    fn saved_attraction_doc_id(user_id: &str, external_id: &str) -> String {
        format!("{}_{}", user_id, urlencoding::encode(external_id))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by id.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user by email (unique).
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("email").eq(email.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.into_iter().next())
    }

    /// Get a user by display name (unique, used for public profile URLs).
    pub async fn get_user_by_username(&self, user_name: &str) -> Result<Option<User>, AppError> {
        let user_name = user_name.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("user_name").eq(user_name.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.into_iter().next())
    }

    /// Create a user. Fails with `Conflict` if the id is already taken.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| Self::map_insert_err(e, "User already exists"))?;
        Ok(())
    }

    /// Update a user profile (whole-document write).
    pub async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Batch user lookup: user id -> user record.
    ///
    /// One `in` query per chunk; absent ids are simply omitted.
    pub async fn find_users(
        &self,
        user_ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, User>, AppError> {
        let ids: Vec<String> = user_ids.iter().cloned().collect();
        let mut found = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(IN_QUERY_CHUNK) {
            let chunk = chunk.to_vec();
            let users: Vec<User> = self
                .get_client()?
                .fluent()
                .select()
                .from(collections::USERS)
                .filter(move |q| q.field("id").is_in(chunk.clone()))
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            for user in users {
                found.insert(user.id.clone(), user);
            }
        }

        Ok(found)
    }

    /// Batch display-name lookup: user id -> user_name.
    pub async fn user_display_names(
        &self,
        user_ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, String>, AppError> {
        let users = self.find_users(user_ids).await?;
        Ok(users
            .into_iter()
            .map(|(id, user)| (id, user.user_name))
            .collect())
    }

    // ─── Itinerary Operations ────────────────────────────────────

    /// Create an itinerary.
    pub async fn create_itinerary(&self, itinerary: &Itinerary) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::ITINERARIES)
            .document_id(&itinerary.id)
            .object(itinerary)
            .execute()
            .await
            .map_err(|e| Self::map_insert_err(e, "Itinerary already exists"))?;
        Ok(())
    }

    /// Get an itinerary by id.
    pub async fn get_itinerary(&self, itinerary_id: &str) -> Result<Option<Itinerary>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ITINERARIES)
            .obj()
            .one(itinerary_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All itineraries a user can see: owned plus collaborating.
    pub async fn itineraries_for_user(&self, user_id: &str) -> Result<Vec<Itinerary>, AppError> {
        let owner = user_id.to_string();
        let mut owned: Vec<Itinerary> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ITINERARIES)
            .filter(move |q| q.field("owner_id").eq(owner.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let member = user_id.to_string();
        let collaborating: Vec<Itinerary> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ITINERARIES)
            .filter(move |q| q.field("collaborators").array_contains(member.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        owned.extend(collaborating);
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(owned)
    }

    /// Public itineraries owned by a user (for public profile pages).
    pub async fn public_itineraries_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Itinerary>, AppError> {
        let owner = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ITINERARIES)
            .filter(move |q| {
                q.for_all([
                    q.field("owner_id").eq(owner.clone()),
                    q.field("public").eq(true),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace an itinerary document (non-membership field updates).
    pub async fn update_itinerary(&self, itinerary: &Itinerary) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ITINERARIES)
            .document_id(&itinerary.id)
            .object(itinerary)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete an itinerary (owner-only check happens in the handler).
    pub async fn delete_itinerary(&self, itinerary_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::ITINERARIES)
            .document_id(itinerary_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomic conditional update of one itinerary document.
    ///
    /// Runs `mutate` against the current document inside a transaction. The
    /// closure returns `false` to signal a no-op (condition already holds),
    /// in which case nothing is written and the unchanged document comes
    /// back. Returns `None` when the itinerary does not exist.
    ///
    /// The read registers with the transaction, so a concurrent mutation of
    /// the same document aborts the commit instead of being overwritten.
    /// That is what keeps attach/collaborator/publish free of lost updates.
    async fn update_itinerary_atomic<F>(
        &self,
        itinerary_id: &str,
        mutate: F,
    ) -> Result<Option<Itinerary>, AppError>
    where
        F: FnOnce(&mut Itinerary) -> bool,
    {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // The read must register with the transaction; a plain select would
        // leave the commit with no read-set, turning it into a blind write
        // that can overwrite a concurrent mutation.
        let tx_client = client.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ),
        );
        let current: Option<Itinerary> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::ITINERARIES)
            .obj()
            .one(itinerary_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read itinerary in transaction: {}", e))
            })?;

        let Some(mut itinerary) = current else {
            let _ = transaction.rollback().await;
            return Ok(None);
        };

        if !mutate(&mut itinerary) {
            // Condition already satisfied; nothing to write.
            let _ = transaction.rollback().await;
            return Ok(Some(itinerary));
        }

        itinerary.updated_at = now_rfc3339();

        client
            .fluent()
            .update()
            .in_col(collections::ITINERARIES)
            .document_id(&itinerary.id)
            .object(&itinerary)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add itinerary to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(Some(itinerary))
    }

    /// Attach an attraction unless one with the same external id is present.
    ///
    /// Duplicate attach is a benign no-op: the unchanged itinerary comes
    /// back. `None` means the itinerary does not exist.
    pub async fn add_attraction_if_absent(
        &self,
        itinerary_id: &str,
        attraction: Attraction,
    ) -> Result<Option<Itinerary>, AppError> {
        self.update_itinerary_atomic(itinerary_id, |itinerary| {
            if itinerary.has_attraction(&attraction.external_id) {
                return false;
            }
            itinerary.attractions.push(attraction);
            true
        })
        .await
    }

    /// Remove an attraction by external id. Absent id is a quiet no-op.
    pub async fn remove_attraction(
        &self,
        itinerary_id: &str,
        external_id: &str,
    ) -> Result<Option<Itinerary>, AppError> {
        self.update_itinerary_atomic(itinerary_id, |itinerary| {
            let before = itinerary.attractions.len();
            itinerary.attractions.retain(|a| a.external_id != external_id);
            itinerary.attractions.len() != before
        })
        .await
    }

    /// Idempotent collaborator insert. The owner never enters the set.
    pub async fn add_collaborator(
        &self,
        itinerary_id: &str,
        user_id: &str,
    ) -> Result<Option<Itinerary>, AppError> {
        let user_id = user_id.to_string();
        self.update_itinerary_atomic(itinerary_id, move |itinerary| {
            if itinerary.owner_id == user_id
                || itinerary.collaborators.iter().any(|c| *c == user_id)
            {
                return false;
            }
            itinerary.collaborators.push(user_id);
            true
        })
        .await
    }

    /// Collaborator removal; removing an absent member is a quiet no-op.
    pub async fn remove_collaborator(
        &self,
        itinerary_id: &str,
        user_id: &str,
    ) -> Result<Option<Itinerary>, AppError> {
        let user_id = user_id.to_string();
        self.update_itinerary_atomic(itinerary_id, move |itinerary| {
            let before = itinerary.collaborators.len();
            itinerary.collaborators.retain(|c| *c != user_id);
            itinerary.collaborators.len() != before
        })
        .await
    }

    /// One-way publish. Already-public is a no-op.
    pub async fn set_public(&self, itinerary_id: &str) -> Result<Option<Itinerary>, AppError> {
        self.update_itinerary_atomic(itinerary_id, |itinerary| {
            if itinerary.public {
                return false;
            }
            itinerary.public = true;
            true
        })
        .await
    }

    /// Record a calendar sync. Re-sync with the same provider is a no-op
    /// success; a different provider overwrites the tag.
    pub async fn set_sync_state(
        &self,
        itinerary_id: &str,
        provider: CalendarProvider,
    ) -> Result<Option<Itinerary>, AppError> {
        self.update_itinerary_atomic(itinerary_id, move |itinerary| {
            let target = SyncState::Synced { provider };
            if itinerary.sync_state == target {
                return false;
            }
            itinerary.sync_state = target;
            true
        })
        .await
    }

    // ─── Attraction Catalog Operations ───────────────────────────

    /// Look up a catalog entry by external id, inserting it if absent.
    ///
    /// Insert uses create semantics, so concurrent first-writers cannot
    /// produce duplicates: the loser's AlreadyExists is treated as success
    /// and the existing record is returned.
    pub async fn resolve_or_create_attraction(
        &self,
        attraction: &Attraction,
    ) -> Result<Attraction, AppError> {
        let doc_id = Self::attraction_doc_id(&attraction.external_id);

        let insert = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::ATTRACTIONS)
            .document_id(&doc_id)
            .object(attraction)
            .execute::<()>()
            .await;

        match insert {
            Ok(()) => Ok(attraction.clone()),
            Err(firestore::errors::FirestoreError::DataConflictError(_)) => {
                let existing: Option<Attraction> = self
                    .get_client()?
                    .fluent()
                    .select()
                    .by_id_in(collections::ATTRACTIONS)
                    .obj()
                    .one(&doc_id)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                existing.ok_or_else(|| {
                    AppError::Database(format!(
                        "Catalog entry {} vanished after conflict",
                        attraction.external_id
                    ))
                })
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Batch catalog lookup: external id -> record.
    ///
    /// One `in` query per chunk of ids; absent ids are omitted from the map.
    pub async fn find_attractions(
        &self,
        external_ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, Attraction>, AppError> {
        let ids: Vec<String> = external_ids.iter().cloned().collect();
        let mut found = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(IN_QUERY_CHUNK) {
            let chunk = chunk.to_vec();
            let records: Vec<Attraction> = self
                .get_client()?
                .fluent()
                .select()
                .from(collections::ATTRACTIONS)
                .filter(move |q| q.field("external_id").is_in(chunk.clone()))
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            for record in records {
                found.insert(record.external_id.clone(), record);
            }
        }

        Ok(found)
    }

    // ─── Saved Attraction Operations ─────────────────────────────

    /// Save a per-user attraction copy (idempotent upsert).
    pub async fn save_attraction(&self, saved: &SavedAttraction) -> Result<(), AppError> {
        let doc_id =
            Self::saved_attraction_doc_id(&saved.user_id, &saved.attraction.external_id);
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SAVED_ATTRACTIONS)
            .document_id(&doc_id)
            .object(saved)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// All saved attractions for a user, newest first.
    pub async fn saved_attractions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<SavedAttraction>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SAVED_ATTRACTIONS)
            .filter(move |q| q.field("user_id").eq(user_id.clone()))
            .order_by([(
                "saved_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove a saved attraction. Quiet when absent.
    pub async fn remove_saved_attraction(
        &self,
        user_id: &str,
        external_id: &str,
    ) -> Result<(), AppError> {
        let doc_id = Self::saved_attraction_doc_id(user_id, external_id);
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::SAVED_ATTRACTIONS)
            .document_id(&doc_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Review Operations ───────────────────────────────────────

    /// Insert a review. The composite document id makes a duplicate
    /// (author, attraction) pair fail atomically with `Conflict` - there is
    /// no separate pre-check to race against.
    pub async fn insert_review(&self, review: &Review) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::REVIEWS)
            .document_id(&review.id)
            .object(review)
            .execute()
            .await
            .map_err(|e| Self::map_insert_err(e, "You have already reviewed this attraction"))?;
        Ok(())
    }

    /// Replace a review document (author-only edits, checked in the handler).
    pub async fn update_review(&self, review: &Review) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REVIEWS)
            .document_id(&review.id)
            .object(review)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a review by id.
    pub async fn get_review(&self, review_id: &str) -> Result<Option<Review>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REVIEWS)
            .obj()
            .one(review_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a review if it exists and the caller authored it.
    ///
    /// Fails closed and quiet: missing review and non-author both yield
    /// `false`, never an error the handler must special-case.
    pub async fn remove_review(&self, review_id: &str, caller_id: &str) -> Result<bool, AppError> {
        let Some(review) = self.get_review(review_id).await? else {
            return Ok(false);
        };

        if review.author_id != caller_id {
            tracing::warn!(
                review_id,
                caller_id,
                "Rejected review deletion by non-author"
            );
            return Ok(false);
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::REVIEWS)
            .document_id(review_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(true)
    }

    /// All reviews for an attraction, newest first.
    pub async fn reviews_for_attraction(
        &self,
        attraction_id: &str,
    ) -> Result<Vec<Review>, AppError> {
        let attraction_id = attraction_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::REVIEWS)
            .filter(move |q| q.field("attraction_id").eq(attraction_id.clone()))
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// A page of a user's reviews, newest first.
    pub async fn reviews_by_user(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Review>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::REVIEWS)
            .filter(move |q| q.field("author_id").eq(user_id.clone()))
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .offset(offset)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Total review count for a user (server-side aggregate, one read).
    pub async fn count_reviews_by_user(&self, user_id: &str) -> Result<usize, AppError> {
        let user_id = user_id.to_string();
        let rows: Vec<CountRow> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::REVIEWS)
            .filter(move |q| q.field("author_id").eq(user_id.clone()))
            .aggregate(|a| a.fields([a.field("total").count()]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    // ─── Helpers ─────────────────────────────────────────────────

    /// Map an insert failure: create-semantics conflict becomes `Conflict`,
    /// everything else is a store failure.
    fn map_insert_err(e: firestore::errors::FirestoreError, conflict_msg: &str) -> AppError {
        match e {
            firestore::errors::FirestoreError::DataConflictError(_) => {
                AppError::Conflict(conflict_msg.to_string())
            }
            other => AppError::Database(other.to_string()),
        }
    }
}
