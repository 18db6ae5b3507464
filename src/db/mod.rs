//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Username uniqueness index, keyed by the lowercase username
    pub const USERNAMES: &str = "usernames";
    pub const SPACES: &str = "collaborativeSpaces";
    /// Invitation inboxes, keyed by invitee email
    pub const INVITATIONS: &str = "invitations";

    // Scoped collections, nested under a user or space parent document
    pub const DESTINATIONS: &str = "destinations";
    pub const PERSONAL_NOTES: &str = "personalNotes";
    pub const PERSONAL_DOCS: &str = "personalDocs";
    pub const NOTE_TAGS: &str = "personalNoteTags";
}
