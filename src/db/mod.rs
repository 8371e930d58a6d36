//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const ITINERARIES: &str = "itineraries";
    /// Shared attraction catalog (keyed by urlencoded external id)
    pub const ATTRACTIONS: &str = "attractions";
    /// Per-user saved attraction copies
    pub const SAVED_ATTRACTIONS: &str = "saved_attractions";
    /// Reviews (keyed by `{author_id}_{urlencoded attraction_id}`)
    pub const REVIEWS: &str = "reviews";
}
