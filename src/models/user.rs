//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User id (also used as document ID)
    pub id: String,
    /// Email address (unique across users)
    pub email: String,
    /// PBKDF2 credential hash, "salt_hex$hash_hex"
    pub password_hash: String,
    /// Display name (unique, used for public profile URLs)
    pub user_name: String,
    /// Short bio
    pub bio: Option<String>,
    /// Home location
    pub location: Option<String>,
    /// Places the user marked as visited
    pub visited_places: Vec<String>,
    /// External ids of favorite attractions
    pub favorites: Vec<String>,
    /// When the user registered
    pub created_at: String,
}

/// Public view of a user profile (no email, no credential hash).
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub id: String,
    pub user_name: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub visited_places: Vec<String>,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            user_name: user.user_name.clone(),
            bio: user.bio.clone(),
            location: user.location.clone(),
            visited_places: user.visited_places.clone(),
        }
    }
}
