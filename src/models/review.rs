// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Review model for storage.

use serde::{Deserialize, Serialize};

/// Review stored in Firestore.
///
/// The document id is `{author_id}_{urlencoded attraction_id}`, which makes
/// the one-review-per-(author, attraction) invariant a property of the store:
/// a second insert for the same pair fails with AlreadyExists instead of
/// relying on a racy pre-check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Document id (composite, see above)
    pub id: String,
    /// External id of the reviewed attraction (opaque string)
    pub attraction_id: String,
    /// Author user id
    pub author_id: String,
    /// Rating, 1-5
    pub rating: u32,
    /// Free-text comment
    pub comment: Option<String>,
    /// Snapshot of the attraction name at write time
    pub attraction_name: Option<String>,
    /// Snapshot of the attraction address at write time
    pub attraction_address: Option<String>,
    /// Snapshot of the attraction image at write time
    pub attraction_image: Option<String>,
    /// Creation timestamp (RFC3339)
    pub created_at: String,
}

impl Review {
    /// Deterministic document id for an (author, attraction) pair.
    ///
    /// The attraction id may contain arbitrary bytes, so it is urlencoded
    /// to keep the document id Firestore-safe.
    pub fn document_id(author_id: &str, attraction_id: &str) -> String {
        format!("{}_{}", author_id, urlencoding::encode(attraction_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_is_deterministic() {
        let a = Review::document_id("u1", "poi/42 east");
        let b = Review::document_id("u1", "poi/42 east");
        assert_eq!(a, b);
        assert_eq!(a, "u1_poi%2F42%20east");
    }

    #[test]
    fn test_document_id_distinguishes_pairs() {
        assert_ne!(
            Review::document_id("u1", "abc"),
            Review::document_id("u2", "abc")
        );
        assert_ne!(
            Review::document_id("u1", "abc"),
            Review::document_id("u1", "abd")
        );
    }
}
