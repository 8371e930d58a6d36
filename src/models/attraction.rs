// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attraction models: shared catalog entries and per-user saved copies.

use serde::{Deserialize, Serialize};

/// Catalog attraction record stored in Firestore.
///
/// Keyed by the external id supplied by the originating source. The external
/// id is stable but not necessarily human-readable (some sources hand us
/// hex- or base64-packed blobs). At most one catalog record exists per
/// external id; entries are created lazily on first reference and not
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attraction {
    /// External id from the originating source (also keys the document)
    pub external_id: String,
    /// Display name
    pub name: Option<String>,
    /// Image URL
    pub image: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Free-text description
    pub description: Option<String>,
    /// Source rating (0.0 - 5.0)
    pub rating: Option<f64>,
    /// Link back to the source listing
    pub url: Option<String>,
}

/// A user's saved copy of an attraction.
///
/// Separate document from the shared catalog entry, so edits and removals
/// never touch catalog data other users rely on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAttraction {
    /// Owning user id
    pub user_id: String,
    #[serde(flatten)]
    pub attraction: Attraction,
    /// When the user saved it
    pub saved_at: String,
}
