// SPDX-License-Identifier: MIT

//! Collaboration coordinator: profile lifecycle, username claims, and the
//! invite → accept/decline → join/leave state machine.
//!
//! Membership transitions (send, accept) commit the profile, the space,
//! and the mailbox as one transaction. Leaving is deliberately not atomic:
//! the leaver's own profile reset always comes first and must succeed,
//! while cleanup of the shared space document is best-effort, so one
//! user's exit never depends on the other user's document state.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{CollaborativeSpace, Invitation, SpaceStatus, TripMode, UserProfile};

/// Orchestrates profile, space, and mailbox state transitions.
#[derive(Clone)]
pub struct CollaborationService {
    db: FirestoreDb,
}

impl CollaborationService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Create the profile on first sign-in; idempotent on every later one.
    ///
    /// Also backfills a missing email onto an existing profile, since
    /// invitations are addressed by email.
    pub async fn ensure_profile(
        &self,
        uid: &str,
        email: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<UserProfile, AppError> {
        if let Some(mut profile) = self.db.get_profile(uid).await? {
            if profile.email.is_none() {
                if let Some(email) = email {
                    profile.email = Some(email.to_string());
                    self.db.upsert_profile(&profile).await?;
                    tracing::info!(uid, "Backfilled email onto existing profile");
                }
            }
            return Ok(profile);
        }

        let profile = UserProfile::new(uid, email, display_name);
        self.db.upsert_profile(&profile).await?;
        tracing::info!(uid, "Created profile");
        Ok(profile)
    }

    /// Claim a username for a user. Usernames are stored lowercase and
    /// claimed atomically against the uniqueness index.
    pub async fn reserve_username(&self, uid: &str, username: &str) -> Result<String, AppError> {
        let username = normalize_handle(username);
        if username.is_empty() {
            return Err(AppError::BadRequest("Username must not be empty".into()));
        }
        self.db.reserve_username(uid, &username).await?;
        Ok(username)
    }

    /// Switch the profile's active mode.
    ///
    /// Intentionally does not validate that a collaborative space exists;
    /// the scope resolver fails closed for the inconsistent combination,
    /// so no data operation can land in a guessed path.
    pub async fn set_mode(&self, uid: &str, mode: TripMode) -> Result<UserProfile, AppError> {
        let mut profile = self
            .db
            .get_profile(uid)
            .await?
            .ok_or_else(|| AppError::UserNotFound(uid.to_string()))?;

        profile.current_mode = mode;
        self.db.upsert_profile(&profile).await?;
        Ok(profile)
    }

    /// Pending invitations addressed to an email.
    pub async fn list_invitations(&self, email: &str) -> Result<Vec<Invitation>, AppError> {
        Ok(self.db.get_inbox(email).await?.pending())
    }

    /// Send an invitation to another user, addressed by username.
    ///
    /// Resolution failures reject before anything is written. The space
    /// write (create or reopen), the inviter's profile flip, and the
    /// mailbox append commit as one unit.
    pub async fn send_invitation(
        &self,
        from_uid: &str,
        invitee_identifier: &str,
    ) -> Result<Invitation, AppError> {
        let mut inviter = self
            .db
            .get_profile(from_uid)
            .await?
            .ok_or_else(|| AppError::UserNotFound(from_uid.to_string()))?;

        let Some(from_username) = inviter.username.clone() else {
            return Err(AppError::BadRequest(
                "Create a username before inviting someone".into(),
            ));
        };

        let handle = normalize_handle(invitee_identifier);
        if handle.is_empty() {
            return Err(AppError::BadRequest("Enter a username to invite".into()));
        }

        let invitee = self
            .db
            .find_profile_by_username(&handle)
            .await?
            .ok_or_else(|| AppError::UserNotFound(handle.clone()))?;

        if invitee.uid == from_uid {
            return Err(AppError::SelfInvite);
        }
        if invitee.is_collaborating() {
            return Err(AppError::InviteeAlreadyCollaborating);
        }
        let Some(invitee_email) = invitee.email.clone() else {
            return Err(AppError::InviteeNoEmail);
        };

        // Reuse a half-empty space the inviter already owns (re-invite
        // after a decline or a departure), otherwise create a fresh one
        // and flip the inviter into it. A profile still referencing a
        // space document that no longer exists counts as owning none, so
        // the dangling reference heals instead of blocking invitations.
        let existing = match &inviter.collaborative_space_id {
            Some(space_id) => {
                let existing = self.db.get_space(space_id).await?;
                if existing.is_none() {
                    tracing::warn!(
                        from_uid,
                        space_id = %space_id,
                        "Profile references a missing space, starting fresh"
                    );
                }
                existing
            }
            None => None,
        };
        let space = match existing {
            Some(mut space) if !space.is_full() => {
                space.status = SpaceStatus::Pending;
                space
            }
            Some(_) => return Err(AppError::AlreadyCollaborating),
            None => {
                let space = CollaborativeSpace::new(&new_space_id(), from_uid);
                inviter.current_mode = TripMode::Collaborative;
                inviter.collaborative_space_id = Some(space.id.clone());
                space
            }
        };

        let invitation = Invitation::new(from_uid, &from_username, &space.id);

        let mut inbox = self.db.get_inbox(&invitee_email).await?;
        inbox.upsert(invitation.clone());

        self.db
            .commit_membership_unit(&inviter, &space, &invitee_email, &inbox)
            .await?;

        tracing::info!(
            from_uid,
            invitee_uid = %invitee.uid,
            space_id = %space.id,
            "Invitation sent"
        );

        Ok(invitation)
    }

    /// Accept an invitation: join the space, flip the profile, clear the
    /// mailbox entry, all in one transaction.
    ///
    /// The store re-checks every guard under the transaction, so racing
    /// accepts for the last seat serialize: the loser observes the full
    /// member list and gets `SpaceFull`. The entry must actually be
    /// pending in the caller's own inbox; a hand-built invitation for a
    /// guessed space id is rejected.
    pub async fn accept_invitation(
        &self,
        uid: &str,
        invitation: &Invitation,
    ) -> Result<(), AppError> {
        let profile = self
            .db
            .get_profile(uid)
            .await?
            .ok_or_else(|| AppError::UserNotFound(uid.to_string()))?;
        let Some(email) = profile.email else {
            return Err(AppError::BadRequest("Profile has no email".into()));
        };

        self.db
            .join_space_from_invitation(uid, &email, invitation)
            .await?;

        tracing::info!(uid, space_id = %invitation.space_id, "Invitation accepted");
        Ok(())
    }

    /// Decline an invitation: only the mailbox entry goes away.
    pub async fn decline_invitation(
        &self,
        uid: &str,
        invitation: &Invitation,
    ) -> Result<(), AppError> {
        let profile = self
            .db
            .get_profile(uid)
            .await?
            .ok_or_else(|| AppError::UserNotFound(uid.to_string()))?;

        let Some(email) = profile.email else {
            return Err(AppError::BadRequest("Profile has no email".into()));
        };

        let mut inbox = self.db.get_inbox(&email).await?;
        if inbox.remove(invitation) {
            self.db.set_inbox(&email, &inbox).await?;
            tracing::info!(uid, space_id = %invitation.space_id, "Invitation declined");
        } else {
            tracing::debug!(uid, "Invitation already resolved, decline is a no-op");
        }
        Ok(())
    }

    /// Leave the current collaborative space. Two phases:
    ///
    /// 1. Reset the caller's own profile to individual mode. This is the
    ///    user-visible contract and must succeed.
    /// 2. Best-effort removal from the space's member list. The space may
    ///    already be gone; failures here are logged and swallowed.
    pub async fn leave_space(&self, uid: &str) -> Result<UserProfile, AppError> {
        let mut profile = self
            .db
            .get_profile(uid)
            .await?
            .ok_or_else(|| AppError::UserNotFound(uid.to_string()))?;

        let Some(space_id) = profile.collaborative_space_id.take() else {
            // Nothing to leave; normalize the mode anyway.
            profile.current_mode = TripMode::Individual;
            self.db.upsert_profile(&profile).await?;
            return Ok(profile);
        };

        // Phase 1: the caller's own exit.
        profile.current_mode = TripMode::Individual;
        profile.collaborative_space_id = None;
        self.db.upsert_profile(&profile).await?;
        tracing::info!(uid, space_id = %space_id, "Profile reset to individual mode");

        // Phase 2: best-effort space cleanup.
        if let Err(e) = self.db.remove_space_member(&space_id, uid).await {
            tracing::warn!(
                uid,
                space_id = %space_id,
                error = %e,
                "Could not remove member from space (it may already be gone)"
            );
        }

        Ok(profile)
    }
}

/// Normalize a user-entered handle: trim, strip a leading `@`, lowercase.
fn normalize_handle(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_lowercase()
}

/// Allocate a space document ID from the client clock instant.
fn new_space_id() -> String {
    format!(
        "{:x}",
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis())
    )
}

#[cfg(test)]
mod tests {
    use super::normalize_handle;

    #[test]
    fn test_normalize_handle() {
        assert_eq!(normalize_handle("  @Bravo "), "bravo");
        assert_eq!(normalize_handle("ALFA"), "alfa");
        assert_eq!(normalize_handle("@"), "");
    }
}
