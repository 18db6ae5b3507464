//! User profile model for storage and API.

use serde::{Deserialize, Serialize};

/// Which data scope the user is currently working in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripMode {
    Individual,
    Collaborative,
}

impl Default for TripMode {
    fn default() -> Self {
        TripMode::Individual
    }
}

/// User profile stored in Firestore (`users/{uid}`).
///
/// Field names are camelCase on the wire to stay compatible with the
/// documents the web client reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Auth provider uid (also used as document ID)
    pub uid: String,
    /// Email address (may be missing on some auth providers)
    pub email: Option<String>,
    /// Display name from the auth provider
    pub display_name: Option<String>,
    /// Globally unique handle, lowercase; None until the user claims one
    pub username: Option<String>,
    /// Active scope selector
    #[serde(default)]
    pub current_mode: TripMode,
    /// Space this profile belongs to, when collaborating
    #[serde(default)]
    pub collaborative_space_id: Option<String>,
    /// When the profile was first created (RFC 3339)
    pub created_at: String,
}

impl UserProfile {
    /// Fresh profile for a first-time sign-in.
    pub fn new(uid: &str, email: Option<&str>, display_name: Option<&str>) -> Self {
        Self {
            uid: uid.to_string(),
            email: email.map(|e| e.to_string()),
            display_name: display_name.map(|n| n.to_string()),
            username: None,
            current_mode: TripMode::Individual,
            collaborative_space_id: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// True when the profile already belongs to some collaborative space.
    pub fn is_collaborating(&self) -> bool {
        self.collaborative_space_id.is_some()
    }
}

/// Claim on a username (`usernames/{username}`), written in the same
/// transaction as the profile stamp that takes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernameClaim {
    pub uid: String,
}
