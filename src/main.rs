// SPDX-License-Identifier: MIT

//! Tripspaces API Server
//!
//! Serves profiles, collaborative spaces, invitations, and scope-resolved
//! trip data for the travel-planner frontend.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tripspaces::{
    config::Config,
    db::FirestoreDb,
    services::{CollaborationService, IdentityVerifier, TripService},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Tripspaces API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // ID-token verifier for session sign-in
    let identity = Arc::new(
        IdentityVerifier::new(&config.gcp_project_id)
            .expect("Failed to initialize ID-token verifier"),
    );

    let collaboration = CollaborationService::new(db.clone());
    let trips = TripService::new(db.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        collaboration,
        trips,
        identity,
    });

    // Build router
    let app = tripspaces::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tripspaces=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
