// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Itinerary model, calendar sync state, and access classification.

use crate::models::Attraction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Itinerary stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Itinerary {
    /// Itinerary id (also used as document ID)
    pub id: String,
    /// Owning user id
    pub owner_id: String,
    /// Trip name
    pub name: String,
    /// Trip start date (RFC3339)
    pub from: Option<String>,
    /// Trip end date (RFC3339)
    pub to: Option<String>,
    /// Attached attractions, ordered, unique by external id
    pub attractions: Vec<Attraction>,
    /// Collaborator user ids. The owner is never listed here.
    pub collaborators: Vec<String>,
    /// Whether the itinerary is readable without authentication
    pub public: bool,
    /// Calendar sync state
    #[serde(default)]
    pub sync_state: SyncState,
    /// Creation timestamp (RFC3339)
    pub created_at: String,
    /// Last mutation timestamp (RFC3339)
    pub updated_at: String,
}

/// External calendar provider an itinerary can be synced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarProvider {
    Google,
    Ical,
}

impl fmt::Display for CalendarProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarProvider::Google => write!(f, "google"),
            CalendarProvider::Ical => write!(f, "ical"),
        }
    }
}

/// Calendar sync state: either never synced, or synced to one provider.
///
/// Re-syncing with a different provider overwrites the tag; re-syncing with
/// the same provider is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    None,
    Synced { provider: CalendarProvider },
}

/// Access level of a caller against an itinerary.
///
/// Produced by [`Itinerary::classify`]; handlers branch on this tag instead
/// of comparing id strings at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItineraryAccess {
    /// Full control: update, delete, manage collaborators and attractions.
    Owner,
    /// May read, update, and manage attractions. "Deleting" means leaving.
    Collaborator,
    /// No access to a private itinerary. Public itineraries are readable
    /// through the shared read path without classification.
    None,
}

impl Itinerary {
    /// Classify a caller against this itinerary.
    pub fn classify(&self, caller_id: &str) -> ItineraryAccess {
        if self.owner_id == caller_id {
            ItineraryAccess::Owner
        } else if self.collaborators.iter().any(|c| c == caller_id) {
            ItineraryAccess::Collaborator
        } else {
            ItineraryAccess::None
        }
    }

    /// Whether an attraction with this external id is already attached.
    pub fn has_attraction(&self, external_id: &str) -> bool {
        self.attractions.iter().any(|a| a.external_id == external_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn itinerary() -> Itinerary {
        Itinerary {
            id: "it-1".to_string(),
            owner_id: "u1".to_string(),
            name: "Tokyo".to_string(),
            from: None,
            to: None,
            attractions: vec![],
            collaborators: vec!["u2".to_string()],
            public: false,
            sync_state: SyncState::None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_classify_owner() {
        assert_eq!(itinerary().classify("u1"), ItineraryAccess::Owner);
    }

    #[test]
    fn test_classify_collaborator() {
        assert_eq!(itinerary().classify("u2"), ItineraryAccess::Collaborator);
    }

    #[test]
    fn test_classify_stranger() {
        assert_eq!(itinerary().classify("u3"), ItineraryAccess::None);
    }

    #[test]
    fn test_owner_wins_even_if_listed_as_collaborator() {
        // The invariant says the owner never appears in the collaborator set,
        // but classification must not depend on it.
        let mut it = itinerary();
        it.collaborators.push("u1".to_string());
        assert_eq!(it.classify("u1"), ItineraryAccess::Owner);
    }

    #[test]
    fn test_sync_state_roundtrip() {
        let synced = SyncState::Synced {
            provider: CalendarProvider::Google,
        };
        let json = serde_json::to_string(&synced).unwrap();
        assert_eq!(serde_json::from_str::<SyncState>(&json).unwrap(), synced);
    }
}
