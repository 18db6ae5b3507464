//! Invitation mailbox model.
//!
//! Each email address owns one inbox document (`invitations/{email}`)
//! holding an unordered append log of invitation entries. Entries are
//! removed on accept/decline rather than marked, so removal has to match
//! by value, not by index.

use serde::{Deserialize, Serialize};

/// Status of an invitation entry. Resolved entries are removed, never
/// re-stamped, so only `pending` ever appears in a stored inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
}

/// One pending invitation in an inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub from_uid: String,
    pub from_username: String,
    pub space_id: String,
    pub status: InvitationStatus,
    pub created_at: String,
}

impl Invitation {
    pub fn new(from_uid: &str, from_username: &str, space_id: &str) -> Self {
        Self {
            from_uid: from_uid.to_string(),
            from_username: from_username.to_string(),
            space_id: space_id.to_string(),
            status: InvitationStatus::Pending,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Same logical invitation, regardless of when it was sent.
    pub fn same_origin(&self, other: &Invitation) -> bool {
        self.from_uid == other.from_uid && self.space_id == other.space_id
    }
}

/// Inbox document for one email address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InviteInbox {
    #[serde(default)]
    pub invites: Vec<Invitation>,
}

impl InviteInbox {
    /// Entries still awaiting a decision.
    pub fn pending(&self) -> Vec<Invitation> {
        self.invites
            .iter()
            .filter(|inv| inv.status == InvitationStatus::Pending)
            .cloned()
            .collect()
    }

    /// Append an entry, dropping any earlier pending entry from the same
    /// (inviter, space) pair so the inbox never holds duplicates.
    pub fn upsert(&mut self, invitation: Invitation) {
        self.invites.retain(|inv| !inv.same_origin(&invitation));
        self.invites.push(invitation);
    }

    /// Remove an entry by value. Returns false when no entry matched,
    /// which callers treat as an already-resolved no-op.
    pub fn remove(&mut self, invitation: &Invitation) -> bool {
        let before = self.invites.len();
        self.invites.retain(|inv| inv != invitation);
        self.invites.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(from: &str, space: &str) -> Invitation {
        Invitation::new(from, &format!("{}-handle", from), space)
    }

    #[test]
    fn test_remove_matches_by_value() {
        let mut inbox = InviteInbox::default();
        inbox.upsert(entry("u1", "s1"));
        inbox.upsert(entry("u2", "s2"));

        let target = inbox.invites[0].clone();
        assert!(inbox.remove(&target));
        assert_eq!(inbox.invites.len(), 1);
        assert_eq!(inbox.invites[0].from_uid, "u2");

        // Second removal of the same entry is a no-op
        assert!(!inbox.remove(&target));
        assert_eq!(inbox.invites.len(), 1);
    }

    #[test]
    fn test_upsert_replaces_same_origin() {
        let mut inbox = InviteInbox::default();
        inbox.upsert(entry("u1", "s1"));
        inbox.upsert(entry("u1", "s1"));
        assert_eq!(inbox.invites.len(), 1);

        // Different space from the same sender is a distinct invitation
        inbox.upsert(entry("u1", "s2"));
        assert_eq!(inbox.invites.len(), 2);
    }

    #[test]
    fn test_pending_filter() {
        let mut inbox = InviteInbox::default();
        inbox.upsert(entry("u1", "s1"));
        assert_eq!(inbox.pending().len(), 1);
        assert_eq!(InviteInbox::default().pending().len(), 0);
    }
}
