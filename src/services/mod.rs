// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod collaboration;
pub mod identity;
pub mod trips;

pub use collaboration::CollaborationService;
pub use identity::{IdentityVerifier, VerifiedIdentity};
pub use trips::TripService;
