// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Review enrichment: join raw reviews with attraction metadata.
//!
//! A review read path fetches rows from the store, then runs them through
//! [`enrich`] to attach a human-readable attraction label. Field precedence:
//!
//! 1. the snapshot captured on the review at write time,
//! 2. the matching catalog record (one batched lookup, never per-review),
//! 3. for the name only, the id decoder ([`crate::services::decode`]),
//! 4. the literal `"Attraction"`.
//!
//! Enrichment is a pure post-processing stage: it never reorders rows or
//! touches pagination metadata.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{Attraction, Review};
use crate::services::decode::decode_title;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Label used when no source yields an attraction name.
pub const FALLBACK_ATTRACTION_NAME: &str = "Attraction";

/// Caller-facing review shape with attraction metadata flattened in.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedReview {
    pub id: String,
    pub attraction_id: String,
    pub author_id: String,
    /// Author display name, when the caller requested author attribution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub rating: u32,
    pub comment: Option<String>,
    pub created_at: String,
    pub attraction_name: String,
    pub attraction_address: Option<String>,
    pub attraction_image: Option<String>,
    pub attraction_url: Option<String>,
}

/// Treat empty snapshot strings the same as missing ones.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Join reviews with catalog records and author names. Pure.
pub fn enrich(
    reviews: Vec<Review>,
    catalog: &HashMap<String, Attraction>,
    authors: &HashMap<String, String>,
) -> Vec<EnrichedReview> {
    reviews
        .into_iter()
        .map(|review| {
            let record = catalog.get(&review.attraction_id);

            let mut name = non_empty(review.attraction_name)
                .or_else(|| record.and_then(|a| non_empty(a.name.clone())))
                .unwrap_or_default();
            if name.is_empty() {
                name = decode_title(&review.attraction_id);
            }
            if name.is_empty() {
                name = FALLBACK_ATTRACTION_NAME.to_string();
            }

            let address = non_empty(review.attraction_address)
                .or_else(|| record.and_then(|a| a.address.clone()));
            let image = non_empty(review.attraction_image)
                .or_else(|| record.and_then(|a| a.image.clone()));
            let url = record.and_then(|a| a.url.clone());

            EnrichedReview {
                id: review.id,
                author_name: authors.get(&review.author_id).cloned(),
                author_id: review.author_id,
                rating: review.rating,
                comment: review.comment,
                created_at: review.created_at,
                attraction_name: name,
                attraction_address: address,
                attraction_image: image,
                attraction_url: url,
                attraction_id: review.attraction_id,
            }
        })
        .collect()
}

/// Enrich a fetched review set: one batched catalog lookup, one batched
/// author lookup, then the pure join.
pub async fn enrich_reviews(
    db: &FirestoreDb,
    reviews: Vec<Review>,
) -> Result<Vec<EnrichedReview>, AppError> {
    if reviews.is_empty() {
        return Ok(vec![]);
    }

    let attraction_ids: BTreeSet<String> =
        reviews.iter().map(|r| r.attraction_id.clone()).collect();
    let author_ids: BTreeSet<String> = reviews.iter().map(|r| r.author_id.clone()).collect();

    let catalog = db.find_attractions(&attraction_ids).await?;
    let authors = db.user_display_names(&author_ids).await?;

    Ok(enrich(reviews, &catalog, &authors))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: &str, attraction_id: &str) -> Review {
        Review {
            id: id.to_string(),
            attraction_id: attraction_id.to_string(),
            author_id: "u1".to_string(),
            rating: 4,
            comment: Some("nice".to_string()),
            attraction_name: None,
            attraction_address: None,
            attraction_image: None,
            created_at: "2026-02-01T00:00:00Z".to_string(),
        }
    }

    fn catalog_entry(external_id: &str, name: &str) -> Attraction {
        Attraction {
            external_id: external_id.to_string(),
            name: Some(name.to_string()),
            image: Some("https://img.example/1.jpg".to_string()),
            address: Some("1 Main St".to_string()),
            description: None,
            rating: Some(4.5),
            url: Some("https://maps.example/1".to_string()),
        }
    }

    #[test]
    fn test_snapshot_wins_over_catalog() {
        let mut r = review("r1", "abc");
        r.attraction_name = Some("Snapshot Name".to_string());
        let catalog = HashMap::from([("abc".to_string(), catalog_entry("abc", "Catalog Name"))]);

        let enriched = enrich(vec![r], &catalog, &HashMap::new());
        assert_eq!(enriched[0].attraction_name, "Snapshot Name");
        // Address has no snapshot, so the catalog fills it.
        assert_eq!(enriched[0].attraction_address.as_deref(), Some("1 Main St"));
    }

    #[test]
    fn test_catalog_fills_missing_snapshot() {
        let catalog = HashMap::from([("abc".to_string(), catalog_entry("abc", "Catalog Name"))]);
        let enriched = enrich(vec![review("r1", "abc")], &catalog, &HashMap::new());
        assert_eq!(enriched[0].attraction_name, "Catalog Name");
        assert_eq!(
            enriched[0].attraction_url.as_deref(),
            Some("https://maps.example/1")
        );
    }

    #[test]
    fn test_decoder_fallback_for_name() {
        // "54657374" is hex for "Test"; no catalog match, no snapshot.
        let enriched = enrich(vec![review("r1", "54657374")], &HashMap::new(), &HashMap::new());
        assert_eq!(enriched[0].attraction_name, "Test");
        assert_eq!(enriched[0].attraction_address, None);
    }

    #[test]
    fn test_literal_fallback_when_nothing_decodes() {
        // Punctuation-only id sanitizes away to nothing usable.
        let enriched = enrich(vec![review("r1", "!?")], &HashMap::new(), &HashMap::new());
        assert_eq!(enriched[0].attraction_name, FALLBACK_ATTRACTION_NAME);
    }

    #[test]
    fn test_empty_snapshot_treated_as_missing() {
        let mut r = review("r1", "abc");
        r.attraction_name = Some(String::new());
        let catalog = HashMap::from([("abc".to_string(), catalog_entry("abc", "Catalog Name"))]);
        let enriched = enrich(vec![r], &catalog, &HashMap::new());
        assert_eq!(enriched[0].attraction_name, "Catalog Name");
    }

    #[test]
    fn test_order_preserved() {
        let reviews = vec![review("r1", "a"), review("r2", "b"), review("r3", "c")];
        let enriched = enrich(reviews, &HashMap::new(), &HashMap::new());
        let ids: Vec<&str> = enriched.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r1", "r2", "r3"]);
    }

    #[test]
    fn test_author_name_attached() {
        let authors = HashMap::from([("u1".to_string(), "alice".to_string())]);
        let enriched = enrich(vec![review("r1", "a")], &HashMap::new(), &authors);
        assert_eq!(enriched[0].author_name.as_deref(), Some("alice"));
    }
}
