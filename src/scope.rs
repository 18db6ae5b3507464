// SPDX-License-Identifier: MIT

//! Scope resolution: which physical path trip data lives under.
//!
//! Every trip-data operation resolves its scope fresh from the caller's
//! profile. The resolved value is threaded through the call, never cached
//! on a long-lived object, so a mode switch between two operations can
//! never write into a stale path.

use crate::error::AppError;
use crate::models::{TripMode, UserProfile};

/// Resolved data scope: the parent document all scoped collections
/// (destinations, personal notes/docs/tags) hang under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopePath {
    Personal { uid: String },
    Collaborative { space_id: String },
}

impl ScopePath {
    /// Root collection holding the scope's parent document.
    pub fn root_collection(&self) -> &'static str {
        match self {
            ScopePath::Personal { .. } => "users",
            ScopePath::Collaborative { .. } => "collaborativeSpaces",
        }
    }

    /// Document ID of the scope's parent document.
    pub fn document_id(&self) -> &str {
        match self {
            ScopePath::Personal { uid } => uid,
            ScopePath::Collaborative { space_id } => space_id,
        }
    }
}

impl std::fmt::Display for ScopePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.root_collection(), self.document_id())
    }
}

/// Compute the active scope for a profile. Pure, no I/O.
///
/// A profile claiming collaborative mode without a space id is
/// inconsistent; we fail closed with `ScopeUnavailable` rather than fall
/// back to the personal path, so collaborative-intended data can never
/// land in the wrong scope.
pub fn resolve_scope(profile: &UserProfile) -> Result<ScopePath, AppError> {
    match profile.current_mode {
        TripMode::Collaborative => match &profile.collaborative_space_id {
            Some(space_id) => Ok(ScopePath::Collaborative {
                space_id: space_id.clone(),
            }),
            None => Err(AppError::ScopeUnavailable),
        },
        TripMode::Individual => Ok(ScopePath::Personal {
            uid: profile.uid.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(mode: TripMode, space: Option<&str>) -> UserProfile {
        let mut p = UserProfile::new("u1", Some("u1@example.com"), Some("U One"));
        p.current_mode = mode;
        p.collaborative_space_id = space.map(|s| s.to_string());
        p
    }

    #[test]
    fn test_individual_resolves_to_personal_path() {
        let scope = resolve_scope(&profile(TripMode::Individual, None)).unwrap();
        assert_eq!(
            scope,
            ScopePath::Personal {
                uid: "u1".to_string()
            }
        );
        assert_eq!(scope.to_string(), "users/u1");
    }

    #[test]
    fn test_collaborative_resolves_to_space_path() {
        let scope = resolve_scope(&profile(TripMode::Collaborative, Some("s9"))).unwrap();
        assert_eq!(
            scope,
            ScopePath::Collaborative {
                space_id: "s9".to_string()
            }
        );
        assert_eq!(scope.to_string(), "collaborativeSpaces/s9");
    }

    #[test]
    fn test_collaborative_without_space_fails_closed() {
        let err = resolve_scope(&profile(TripMode::Collaborative, None)).unwrap_err();
        assert!(matches!(err, AppError::ScopeUnavailable));
    }

    #[test]
    fn test_individual_ignores_lingering_space_reference() {
        // A leftover space id with individual mode still resolves personal;
        // the space reference only matters in collaborative mode.
        let scope = resolve_scope(&profile(TripMode::Individual, Some("s9"))).unwrap();
        assert_eq!(scope.root_collection(), "users");
    }
}
