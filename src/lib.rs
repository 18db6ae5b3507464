// SPDX-License-Identifier: MIT

//! Tripspaces: backend for a collaborative travel planner.
//!
//! This crate owns the coordination layer: user profiles, pair-wise
//! collaborative spaces with an invitation mailbox, and scope-resolved
//! trip data (destinations with nested notes/events/expenses/files,
//! personal notes and docs) stored in Firestore.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scope;
pub mod services;

use config::Config;
use db::FirestoreDb;
use services::{CollaborationService, IdentityVerifier, TripService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub collaboration: CollaborationService,
    pub trips: TripService,
    pub identity: Arc<IdentityVerifier>,
}
