//! Collaborative space model.

use serde::{Deserialize, Serialize};

/// Pair membership cap; a space never holds more than two users.
pub const MAX_SPACE_MEMBERS: usize = 2;

/// Lifecycle status of a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceStatus {
    /// Created (or reopened) while an invitation is outstanding
    Pending,
    /// Both members joined
    Active,
}

/// Shared container for two users' trip data (`collaborativeSpaces/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborativeSpace {
    /// Space ID (also the document ID)
    pub id: String,
    /// Uid of the user who created the space
    pub owner_id: String,
    /// Member uids; never more than [`MAX_SPACE_MEMBERS`]
    pub members: Vec<String>,
    pub status: SpaceStatus,
    pub created_at: String,
}

impl CollaborativeSpace {
    /// New pending space containing only its owner.
    pub fn new(id: &str, owner_id: &str) -> Self {
        Self {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            members: vec![owner_id.to_string()],
            status: SpaceStatus::Pending,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= MAX_SPACE_MEMBERS
    }

    pub fn has_member(&self, uid: &str) -> bool {
        self.members.iter().any(|m| m == uid)
    }
}
