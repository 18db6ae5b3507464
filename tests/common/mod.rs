// SPDX-License-Identifier: MIT

use jsonwebtoken::DecodingKey;
use std::sync::Arc;
use tripspaces::config::Config;
use tripspaces::db::FirestoreDb;
use tripspaces::routes::create_router;
use tripspaces::services::{CollaborationService, IdentityVerifier, TripService};
use tripspaces::AppState;

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
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db_offline();

    // The static key is never exercised by offline tests; session JWTs
    // are minted directly with the config signing key.
    let identity = Arc::new(
        IdentityVerifier::new_with_static_key(
            &config.gcp_project_id,
            "test-kid",
            DecodingKey::from_secret(b"unused"),
        )
        .expect("static verifier"),
    );

    let collaboration = CollaborationService::new(db.clone());
    let trips = TripService::new(db.clone());

    let state = Arc::new(AppState {
        config,
        db,
        collaboration,
        trips,
        identity,
    });

    (create_router(state.clone()), state)
}

/// Unique-enough id for emulator test isolation.
#[allow(dead_code)]
pub fn unique(prefix: &str) -> String {
    format!(
        "{}-{:x}",
        prefix,
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}
