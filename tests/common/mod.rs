// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::Arc;
use trava_api::config::Config;
use trava_api::db::FirestoreDb;
use trava_api::middleware::auth::create_jwt;
use trava_api::routes::create_router;
use trava_api::services::CalendarService;
use trava_api::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the JWT signing key.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Vec<u8>) {
    let config = Config::default();
    let signing_key = config.jwt_signing_key.clone();

    let db = test_db_offline();
    let calendar = CalendarService::new(&config);

    let state = Arc::new(AppState {
        config,
        db,
        calendar,
    });

    (create_router(state), signing_key)
}

/// Create a session token for a test user.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    create_jwt(user_id, "test@example.com", signing_key).expect("Failed to create test JWT")
}
