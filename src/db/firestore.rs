// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles and the username uniqueness index
//! - Collaborative spaces (membership registry)
//! - Invitation inboxes (one document per invitee email)
//! - Scope-addressed trip data (destinations, personal notes/docs/tags)
//!
//! Contended read-modify-write cycles (username claims, space joins,
//! nested-array mutations on destination documents) run as Firestore
//! transactions whose reads happen under the transaction, so a concurrent
//! writer aborts the commit and the transaction re-runs against fresh
//! state instead of overwriting it.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    CollaborativeSpace, Destination, Invitation, InviteInbox, NoteTag, PersonalDoc, PersonalNote,
    SpaceStatus, TripMode, UserProfile, UsernameClaim,
};
use crate::scope::ScopePath;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator path uses an unauthenticated connection to avoid
        // local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Parent path for a resolved scope (`users/{uid}` or
    /// `collaborativeSpaces/{spaceId}`).
    fn scope_parent(&self, scope: &ScopePath) -> Result<firestore::ParentPathBuilder, AppError> {
        self.get_client()?
            .parent_path(scope.root_collection(), scope.document_id())
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Map a failed transaction run. A commit the client gave up retrying
    /// is a write conflict; anything else is an infrastructure failure.
    fn txn_error(e: firestore::errors::FirestoreError) -> AppError {
        match e {
            firestore::errors::FirestoreError::DatabaseError(ref db_err)
                if db_err.retry_possible =>
            {
                AppError::WriteConflict
            }
            other => AppError::Database(other.to_string()),
        }
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Get a profile by uid.
    pub async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a profile document.
    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&profile.uid)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Look up a profile by its (lowercase) username.
    pub async fn find_profile_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserProfile>, AppError> {
        let username = username.to_string();
        let matches: Vec<UserProfile> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("username").eq(username.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(matches.into_iter().next())
    }

    /// Atomically claim a username: the index document and the profile
    /// stamp commit together, so two users cannot both win the same name.
    ///
    /// The claim check reads under the transaction, so a racing claimant
    /// aborts the commit, re-runs, observes the winner's claim, and gets
    /// `UsernameTaken`. Re-claiming a name you already hold is a no-op
    /// success.
    pub async fn reserve_username(&self, uid: &str, username: &str) -> Result<(), AppError> {
        let claimant = uid.to_string();
        let name = username.to_string();

        let outcome: Result<(), AppError> = self
            .get_client()?
            .run_transaction(|tx_db, transaction| {
                let claimant = claimant.clone();
                let name = name.clone();
                Box::pin(async move {
                    let claim: Option<UsernameClaim> = tx_db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERNAMES)
                        .obj()
                        .one(&name)
                        .await?;

                    if let Some(existing) = claim {
                        if existing.uid == claimant {
                            return Ok(Ok(()));
                        }
                        return Ok(Err(AppError::UsernameTaken));
                    }

                    let profile: Option<UserProfile> = tx_db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&claimant)
                        .await?;
                    let Some(mut profile) = profile else {
                        return Ok(Err(AppError::UserNotFound(claimant)));
                    };
                    profile.username = Some(name.clone());

                    tx_db
                        .fluent()
                        .update()
                        .in_col(collections::USERNAMES)
                        .document_id(&name)
                        .object(&UsernameClaim {
                            uid: claimant.clone(),
                        })
                        .add_to_transaction(transaction)?;

                    tx_db
                        .fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&claimant)
                        .object(&profile)
                        .add_to_transaction(transaction)?;

                    Ok(Ok(()))
                })
            })
            .await
            .map_err(Self::txn_error)?;
        outcome?;

        tracing::info!(uid, username, "Username reserved");
        Ok(())
    }

    // ─── Space Operations ────────────────────────────────────────

    /// Get a collaborative space by ID.
    pub async fn get_space(&self, space_id: &str) -> Result<Option<CollaborativeSpace>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SPACES)
            .obj()
            .one(space_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a space document.
    pub async fn upsert_space(&self, space: &CollaborativeSpace) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SPACES)
            .document_id(&space.id)
            .object(space)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Remove a uid from a space's member list.
    ///
    /// A missing space document means there is nothing to leave; that is
    /// success, not an error.
    pub async fn remove_space_member(&self, space_id: &str, uid: &str) -> Result<(), AppError> {
        let Some(mut space) = self.get_space(space_id).await? else {
            tracing::debug!(space_id, uid, "Space already gone, removal satisfied");
            return Ok(());
        };

        space.members.retain(|m| m != uid);
        self.upsert_space(&space).await?;

        tracing::info!(space_id, uid, remaining = space.members.len(), "Member removed from space");
        Ok(())
    }

    // ─── Invitation Inbox Operations ─────────────────────────────

    /// Get an inbox by email; a missing document is an empty inbox.
    pub async fn get_inbox(&self, email: &str) -> Result<InviteInbox, AppError> {
        let inbox: Option<InviteInbox> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::INVITATIONS)
            .obj()
            .one(email)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inbox.unwrap_or_default())
    }

    /// Rewrite an inbox document.
    pub async fn set_inbox(&self, email: &str, inbox: &InviteInbox) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::INVITATIONS)
            .document_id(email)
            .object(inbox)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Atomic Membership Units ─────────────────────────────────

    /// Commit a profile, a space, and an inbox as one atomic unit
    /// (invitation send). The half-applied states (space without the
    /// matching profile reference, or vice versa) are exactly what the
    /// batch exists to prevent.
    pub async fn commit_membership_unit(
        &self,
        profile: &UserProfile,
        space: &CollaborativeSpace,
        inbox_email: &str,
        inbox: &InviteInbox,
    ) -> Result<(), AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::SPACES)
            .document_id(&space.id)
            .object(space)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add space to transaction: {}", e)))?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&profile.uid)
            .object(profile)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add profile to transaction: {}", e))
            })?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::INVITATIONS)
            .document_id(inbox_email)
            .object(inbox)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add inbox to transaction: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Membership commit failed: {}", e)))?;

        Ok(())
    }

    /// Accept an invitation as one transaction: verify the entry is still
    /// pending in the caller's inbox, join the space, flip the profile,
    /// and clear the entry.
    ///
    /// Every read happens under the transaction: two invitees racing for
    /// the last seat abort each other's commit, and the re-run observes
    /// the full member list and gets `SpaceFull` instead of overwriting
    /// it. An entry absent from the caller's inbox rejects the join, so a
    /// fabricated invitation for a guessed space id gets nowhere.
    pub async fn join_space_from_invitation(
        &self,
        uid: &str,
        email: &str,
        invitation: &Invitation,
    ) -> Result<(), AppError> {
        let joiner = uid.to_string();
        let inbox_email = email.to_string();
        let invitation = invitation.clone();

        let outcome: Result<(), AppError> = self
            .get_client()?
            .run_transaction(|tx_db, transaction| {
                let joiner = joiner.clone();
                let inbox_email = inbox_email.clone();
                let invitation = invitation.clone();
                Box::pin(async move {
                    let profile: Option<UserProfile> = tx_db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&joiner)
                        .await?;
                    let Some(mut profile) = profile else {
                        return Ok(Err(AppError::UserNotFound(joiner)));
                    };
                    if profile.is_collaborating() {
                        return Ok(Err(AppError::AlreadyInSpace));
                    }

                    let space: Option<CollaborativeSpace> = tx_db
                        .fluent()
                        .select()
                        .by_id_in(collections::SPACES)
                        .obj()
                        .one(&invitation.space_id)
                        .await?;
                    let Some(mut space) = space else {
                        return Ok(Err(AppError::NotFound(format!(
                            "Space {} no longer exists",
                            invitation.space_id
                        ))));
                    };

                    let inbox: Option<InviteInbox> = tx_db
                        .fluent()
                        .select()
                        .by_id_in(collections::INVITATIONS)
                        .obj()
                        .one(&inbox_email)
                        .await?;
                    let mut inbox = inbox.unwrap_or_default();
                    if !inbox.remove(&invitation) {
                        return Ok(Err(AppError::NotFound(
                            "No pending invitation for this space".to_string(),
                        )));
                    }

                    if !space.has_member(&joiner) {
                        if space.is_full() {
                            return Ok(Err(AppError::SpaceFull));
                        }
                        space.members.push(joiner.clone());
                    }
                    if space.is_full() {
                        space.status = SpaceStatus::Active;
                    }

                    profile.current_mode = TripMode::Collaborative;
                    profile.collaborative_space_id = Some(invitation.space_id.clone());

                    tx_db
                        .fluent()
                        .update()
                        .in_col(collections::SPACES)
                        .document_id(&space.id)
                        .object(&space)
                        .add_to_transaction(transaction)?;

                    tx_db
                        .fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&profile.uid)
                        .object(&profile)
                        .add_to_transaction(transaction)?;

                    tx_db
                        .fluent()
                        .update()
                        .in_col(collections::INVITATIONS)
                        .document_id(&inbox_email)
                        .object(&inbox)
                        .add_to_transaction(transaction)?;

                    Ok(Ok(()))
                })
            })
            .await
            .map_err(Self::txn_error)?;
        outcome
    }

    // ─── Destination Operations (scoped) ─────────────────────────

    /// List all destinations in a scope.
    pub async fn list_destinations(&self, scope: &ScopePath) -> Result<Vec<Destination>, AppError> {
        let parent = self.scope_parent(scope)?;
        self.get_client()?
            .fluent()
            .select()
            .from(collections::DESTINATIONS)
            .parent(&parent)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get one destination in a scope.
    pub async fn get_destination(
        &self,
        scope: &ScopePath,
        id: &str,
    ) -> Result<Option<Destination>, AppError> {
        let parent = self.scope_parent(scope)?;
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::DESTINATIONS)
            .parent(&parent)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a destination document in a scope.
    pub async fn set_destination(
        &self,
        scope: &ScopePath,
        destination: &Destination,
    ) -> Result<(), AppError> {
        let parent = self.scope_parent(scope)?;
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::DESTINATIONS)
            .document_id(&destination.id)
            .parent(&parent)
            .object(destination)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a destination document from a scope.
    pub async fn delete_destination(&self, scope: &ScopePath, id: &str) -> Result<(), AppError> {
        let parent = self.scope_parent(scope)?;
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::DESTINATIONS)
            .parent(&parent)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Rewrite a destination through a transform, transactionally.
    ///
    /// The document is read under the transaction, so a concurrent writer
    /// aborts the commit and the transaction re-runs `transform` against
    /// a fresh snapshot: both members of a space can append to the same
    /// nested array without either write being lost. Each committed
    /// rewrite bumps the revision counter; a commit the client gives up
    /// retrying surfaces `WriteConflict`.
    pub async fn mutate_destination<F>(
        &self,
        scope: &ScopePath,
        id: &str,
        transform: F,
    ) -> Result<Destination, AppError>
    where
        F: Fn(&mut Destination) -> Result<(), AppError> + Send + Sync + 'static,
    {
        let root = scope.root_collection();
        let parent_id = scope.document_id().to_string();
        let doc_id = id.to_string();
        let transform = std::sync::Arc::new(transform);

        let outcome: Result<Destination, AppError> = self
            .get_client()?
            .run_transaction(|tx_db, transaction| {
                let parent_id = parent_id.clone();
                let doc_id = doc_id.clone();
                let transform = transform.clone();
                Box::pin(async move {
                    let parent = tx_db.parent_path(root, parent_id)?;
                    let found: Option<Destination> = tx_db
                        .fluent()
                        .select()
                        .by_id_in(collections::DESTINATIONS)
                        .parent(&parent)
                        .obj()
                        .one(&doc_id)
                        .await?;

                    let Some(mut destination) = found else {
                        return Ok(Err(AppError::NotFound(format!(
                            "Destination {} not found",
                            doc_id
                        ))));
                    };

                    if let Err(e) = transform(&mut destination) {
                        return Ok(Err(e));
                    }
                    destination.revision += 1;

                    tx_db
                        .fluent()
                        .update()
                        .in_col(collections::DESTINATIONS)
                        .document_id(&doc_id)
                        .parent(&parent)
                        .object(&destination)
                        .add_to_transaction(transaction)?;

                    Ok(Ok(destination))
                })
            })
            .await
            .map_err(Self::txn_error)?;
        outcome
    }

    // ─── Personal Note Operations (scoped) ───────────────────────

    /// List all personal notes in a scope.
    pub async fn list_personal_notes(
        &self,
        scope: &ScopePath,
    ) -> Result<Vec<PersonalNote>, AppError> {
        let parent = self.scope_parent(scope)?;
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PERSONAL_NOTES)
            .parent(&parent)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get one personal note.
    pub async fn get_personal_note(
        &self,
        scope: &ScopePath,
        id: &str,
    ) -> Result<Option<PersonalNote>, AppError> {
        let parent = self.scope_parent(scope)?;
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PERSONAL_NOTES)
            .parent(&parent)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a personal note.
    pub async fn set_personal_note(
        &self,
        scope: &ScopePath,
        note: &PersonalNote,
    ) -> Result<(), AppError> {
        let parent = self.scope_parent(scope)?;
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PERSONAL_NOTES)
            .document_id(&note.id)
            .parent(&parent)
            .object(note)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a personal note.
    pub async fn delete_personal_note(&self, scope: &ScopePath, id: &str) -> Result<(), AppError> {
        let parent = self.scope_parent(scope)?;
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PERSONAL_NOTES)
            .parent(&parent)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Personal Doc Operations (scoped) ────────────────────────

    /// List all personal docs in a scope.
    pub async fn list_personal_docs(
        &self,
        scope: &ScopePath,
    ) -> Result<Vec<PersonalDoc>, AppError> {
        let parent = self.scope_parent(scope)?;
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PERSONAL_DOCS)
            .parent(&parent)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a personal doc.
    pub async fn set_personal_doc(
        &self,
        scope: &ScopePath,
        doc: &PersonalDoc,
    ) -> Result<(), AppError> {
        let parent = self.scope_parent(scope)?;
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PERSONAL_DOCS)
            .document_id(&doc.id)
            .parent(&parent)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a personal doc.
    pub async fn delete_personal_doc(&self, scope: &ScopePath, id: &str) -> Result<(), AppError> {
        let parent = self.scope_parent(scope)?;
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PERSONAL_DOCS)
            .parent(&parent)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Note Tag Operations (scoped) ────────────────────────────

    /// List all note tags in a scope.
    pub async fn list_note_tags(&self, scope: &ScopePath) -> Result<Vec<NoteTag>, AppError> {
        let parent = self.scope_parent(scope)?;
        self.get_client()?
            .fluent()
            .select()
            .from(collections::NOTE_TAGS)
            .parent(&parent)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a note tag marker (the tag string is the document ID).
    pub async fn set_note_tag(&self, scope: &ScopePath, tag: &NoteTag) -> Result<(), AppError> {
        let parent = self.scope_parent(scope)?;
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::NOTE_TAGS)
            .document_id(&tag.tag)
            .parent(&parent)
            .object(tag)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a note tag marker.
    pub async fn delete_note_tag(&self, scope: &ScopePath, tag: &str) -> Result<(), AppError> {
        let parent = self.scope_parent(scope)?;
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::NOTE_TAGS)
            .parent(&parent)
            .document_id(tag)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
