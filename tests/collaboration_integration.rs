// SPDX-License-Identifier: MIT

//! End-to-end collaboration scenarios against the Firestore emulator.
//!
//! Run with FIRESTORE_EMULATOR_HOST set; each test isolates itself with
//! unique uids/usernames/emails so suites can run concurrently.

use tripspaces::models::{Invitation, SpaceStatus, TripMode, UserProfile};
use tripspaces::services::CollaborationService;

mod common;
use common::{test_db, unique};

struct Pair {
    svc: CollaborationService,
    db: tripspaces::db::FirestoreDb,
    a_uid: String,
    a_handle: String,
    b_uid: String,
    b_handle: String,
    b_email: String,
}

/// Provision two fresh users with usernames.
async fn setup_pair() -> Pair {
    let db = test_db().await;
    let svc = CollaborationService::new(db.clone());

    let a_uid = unique("alfa");
    let b_uid = unique("bravo");
    let a_email = format!("{}@example.com", a_uid);
    let b_email = format!("{}@example.com", b_uid);

    svc.ensure_profile(&a_uid, Some(&a_email), Some("Alfa"))
        .await
        .expect("profile a");
    svc.ensure_profile(&b_uid, Some(&b_email), Some("Bravo"))
        .await
        .expect("profile b");

    let a_handle = svc.reserve_username(&a_uid, &unique("alfa")).await.expect("name a");
    let b_handle = svc.reserve_username(&b_uid, &unique("bravo")).await.expect("name b");

    Pair {
        svc,
        db,
        a_uid,
        a_handle,
        b_uid,
        b_handle,
        b_email,
    }
}

#[tokio::test]
async fn test_ensure_profile_is_idempotent() {
    require_emulator!();
    let db = test_db().await;
    let svc = CollaborationService::new(db);

    let uid = unique("user");
    let first = svc
        .ensure_profile(&uid, Some("x@example.com"), Some("X"))
        .await
        .expect("create");
    let second = svc
        .ensure_profile(&uid, Some("x@example.com"), Some("X"))
        .await
        .expect("re-ensure");

    assert_eq!(first.uid, second.uid);
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(second.current_mode, TripMode::Individual);
    assert!(second.collaborative_space_id.is_none());
}

#[tokio::test]
async fn test_username_uniqueness() {
    require_emulator!();
    let db = test_db().await;
    let svc = CollaborationService::new(db);

    let u1 = unique("u1");
    let u2 = unique("u2");
    svc.ensure_profile(&u1, Some("u1@example.com"), None)
        .await
        .unwrap();
    svc.ensure_profile(&u2, Some("u2@example.com"), None)
        .await
        .unwrap();

    let handle = unique("handle");
    svc.reserve_username(&u1, &handle).await.expect("first claim");

    // Re-claiming your own name is fine
    svc.reserve_username(&u1, &handle).await.expect("re-claim");

    // A different uid must be rejected, case-insensitively
    let err = svc
        .reserve_username(&u2, &handle.to_uppercase())
        .await
        .expect_err("second claim");
    assert!(matches!(err, tripspaces::error::AppError::UsernameTaken));
}

#[tokio::test]
async fn test_racing_claims_award_a_username_exactly_once() {
    require_emulator!();
    let db = test_db().await;
    let svc = CollaborationService::new(db.clone());

    let u1 = unique("u1");
    let u2 = unique("u2");
    svc.ensure_profile(&u1, Some("u1@example.com"), None)
        .await
        .unwrap();
    svc.ensure_profile(&u2, Some("u2@example.com"), None)
        .await
        .unwrap();

    let handle = unique("handle");
    let t1 = {
        let svc = svc.clone();
        let uid = u1.clone();
        let name = handle.clone();
        tokio::spawn(async move { svc.reserve_username(&uid, &name).await })
    };
    let t2 = {
        let svc = svc.clone();
        let uid = u2.clone();
        let name = handle.clone();
        tokio::spawn(async move { svc.reserve_username(&uid, &name).await })
    };
    let r1 = t1.await.expect("task 1");
    let r2 = t2.await.expect("task 2");

    assert!(
        r1.is_ok() ^ r2.is_ok(),
        "exactly one claimant may win the name"
    );
    let winner = if r1.is_ok() { &u1 } else { &u2 };
    let loser = if r1.is_ok() { &u2 } else { &u1 };

    let owner = db
        .find_profile_by_username(&handle)
        .await
        .unwrap()
        .expect("claimed name resolves");
    assert_eq!(&owner.uid, winner);

    let loser_profile = db.get_profile(loser).await.unwrap().unwrap();
    assert!(loser_profile.username.is_none());
}

#[tokio::test]
async fn test_send_invitation_creates_space_and_mailbox_entry() {
    require_emulator!();
    let pair = setup_pair().await;

    let invitation = pair
        .svc
        .send_invitation(&pair.a_uid, &format!("@{}", pair.b_handle))
        .await
        .expect("send");

    // Inviter profile flipped into the new space as part of the same unit
    let a_profile = pair.db.get_profile(&pair.a_uid).await.unwrap().unwrap();
    assert_eq!(a_profile.current_mode, TripMode::Collaborative);
    assert_eq!(
        a_profile.collaborative_space_id.as_deref(),
        Some(invitation.space_id.as_str())
    );

    // Space is pending, owned by and containing only the inviter
    let space = pair.db.get_space(&invitation.space_id).await.unwrap().unwrap();
    assert_eq!(space.status, SpaceStatus::Pending);
    assert_eq!(space.members, vec![pair.a_uid.clone()]);
    assert_eq!(space.owner_id, pair.a_uid);

    // Exactly one pending entry in the invitee's mailbox
    let pending = pair.svc.list_invitations(&pair.b_email).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].from_uid, pair.a_uid);
    assert_eq!(pending[0].from_username, pair.a_handle);
    assert_eq!(pending[0].space_id, invitation.space_id);
}

#[tokio::test]
async fn test_send_invitation_resolution_failures_write_nothing() {
    require_emulator!();
    let pair = setup_pair().await;

    // Unknown username
    let err = pair
        .svc
        .send_invitation(&pair.a_uid, "no-such-handle-ever")
        .await
        .expect_err("unknown user");
    assert!(matches!(err, tripspaces::error::AppError::UserNotFound(_)));

    // Self invite
    let err = pair
        .svc
        .send_invitation(&pair.a_uid, &pair.a_handle)
        .await
        .expect_err("self invite");
    assert!(matches!(err, tripspaces::error::AppError::SelfInvite));

    // Nothing was created or flipped
    let a_profile = pair.db.get_profile(&pair.a_uid).await.unwrap().unwrap();
    assert_eq!(a_profile.current_mode, TripMode::Individual);
    assert!(a_profile.collaborative_space_id.is_none());
}

#[tokio::test]
async fn test_duplicate_invitations_collapse_to_one_entry() {
    require_emulator!();
    let pair = setup_pair().await;

    pair.svc
        .send_invitation(&pair.a_uid, &pair.b_handle)
        .await
        .expect("first send");
    pair.svc
        .send_invitation(&pair.a_uid, &pair.b_handle)
        .await
        .expect("second send");

    let pending = pair.svc.list_invitations(&pair.b_email).await.unwrap();
    assert_eq!(pending.len(), 1, "same (inviter, space) pair must not duplicate");
}

#[tokio::test]
async fn test_accept_joins_space_flips_profile_clears_mailbox() {
    require_emulator!();
    let pair = setup_pair().await;

    let invitation = pair
        .svc
        .send_invitation(&pair.a_uid, &pair.b_handle)
        .await
        .expect("send");

    pair.svc
        .accept_invitation(&pair.b_uid, &invitation)
        .await
        .expect("accept");

    let space = pair.db.get_space(&invitation.space_id).await.unwrap().unwrap();
    assert_eq!(space.status, SpaceStatus::Active);
    assert!(space.has_member(&pair.a_uid));
    assert!(space.has_member(&pair.b_uid));
    assert_eq!(space.members.len(), 2);

    let b_profile = pair.db.get_profile(&pair.b_uid).await.unwrap().unwrap();
    assert_eq!(b_profile.current_mode, TripMode::Collaborative);
    assert_eq!(
        b_profile.collaborative_space_id.as_deref(),
        Some(invitation.space_id.as_str())
    );

    assert!(pair.svc.list_invitations(&pair.b_email).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_accept_rejected_when_already_in_a_space() {
    require_emulator!();
    let pair = setup_pair().await;

    let invitation = pair
        .svc
        .send_invitation(&pair.a_uid, &pair.b_handle)
        .await
        .expect("send");
    pair.svc
        .accept_invitation(&pair.b_uid, &invitation)
        .await
        .expect("accept");

    // A second acceptance attempt while already collaborating is rejected
    let err = pair
        .svc
        .accept_invitation(&pair.b_uid, &invitation)
        .await
        .expect_err("double accept");
    assert!(matches!(err, tripspaces::error::AppError::AlreadyInSpace));
}

/// Provision a third user with a profile and username.
async fn setup_third(pair: &Pair, prefix: &str) -> (String, String) {
    let uid = unique(prefix);
    pair.svc
        .ensure_profile(&uid, Some(&format!("{}@example.com", uid)), None)
        .await
        .expect("third profile");
    let handle = pair
        .svc
        .reserve_username(&uid, &unique(prefix))
        .await
        .expect("third name");
    (uid, handle)
}

#[tokio::test]
async fn test_third_member_is_rejected_with_space_full() {
    require_emulator!();
    let pair = setup_pair().await;

    // Both invitees hold entries for the same half-empty space
    let (c_uid, c_handle) = setup_third(&pair, "charlie").await;
    let inv_b = pair
        .svc
        .send_invitation(&pair.a_uid, &pair.b_handle)
        .await
        .expect("invite b");
    let inv_c = pair
        .svc
        .send_invitation(&pair.a_uid, &c_handle)
        .await
        .expect("invite c");
    assert_eq!(inv_b.space_id, inv_c.space_id);

    pair.svc
        .accept_invitation(&pair.b_uid, &inv_b)
        .await
        .expect("b accepts");

    let err = pair
        .svc
        .accept_invitation(&c_uid, &inv_c)
        .await
        .expect_err("third member");
    assert!(matches!(err, tripspaces::error::AppError::SpaceFull));

    let space = pair.db.get_space(&inv_b.space_id).await.unwrap().unwrap();
    assert_eq!(space.members.len(), 2);
    assert!(!space.has_member(&c_uid));

    let c_profile = pair.db.get_profile(&c_uid).await.unwrap().unwrap();
    assert_eq!(c_profile.current_mode, TripMode::Individual);
    assert!(c_profile.collaborative_space_id.is_none());
}

#[tokio::test]
async fn test_racing_accepts_fill_the_last_seat_exactly_once() {
    require_emulator!();
    let pair = setup_pair().await;

    let (c_uid, c_handle) = setup_third(&pair, "charlie").await;
    let inv_b = pair
        .svc
        .send_invitation(&pair.a_uid, &pair.b_handle)
        .await
        .expect("invite b");
    let inv_c = pair
        .svc
        .send_invitation(&pair.a_uid, &c_handle)
        .await
        .expect("invite c");
    let space_id = inv_b.space_id.clone();

    let b_task = {
        let svc = pair.svc.clone();
        let uid = pair.b_uid.clone();
        tokio::spawn(async move { svc.accept_invitation(&uid, &inv_b).await })
    };
    let c_task = {
        let svc = pair.svc.clone();
        let uid = c_uid.clone();
        tokio::spawn(async move { svc.accept_invitation(&uid, &inv_c).await })
    };
    let b_result = b_task.await.expect("task b");
    let c_result = c_task.await.expect("task c");

    let b_won = b_result.is_ok();
    assert!(
        b_won ^ c_result.is_ok(),
        "exactly one accept may win the last seat"
    );
    let loser_err = if b_won {
        c_result.expect_err("c lost")
    } else {
        b_result.expect_err("b lost")
    };
    assert!(matches!(loser_err, tripspaces::error::AppError::SpaceFull));

    let (winner, loser) = if b_won {
        (&pair.b_uid, &c_uid)
    } else {
        (&c_uid, &pair.b_uid)
    };
    let space = pair.db.get_space(&space_id).await.unwrap().unwrap();
    assert_eq!(space.members.len(), 2);
    assert!(space.has_member(&pair.a_uid));
    assert!(space.has_member(winner));

    // The loser's profile must not reference a space they are not in
    let loser_profile = pair.db.get_profile(loser).await.unwrap().unwrap();
    assert_eq!(loser_profile.current_mode, TripMode::Individual);
    assert!(loser_profile.collaborative_space_id.is_none());
}

#[tokio::test]
async fn test_fabricated_invitation_cannot_join_a_space() {
    require_emulator!();
    let pair = setup_pair().await;

    let real = pair
        .svc
        .send_invitation(&pair.a_uid, &pair.b_handle)
        .await
        .expect("send");

    // An uninvited user hand-building an entry for a guessed space id
    let m_uid = unique("mallory");
    pair.svc
        .ensure_profile(&m_uid, Some(&format!("{}@example.com", m_uid)), None)
        .await
        .unwrap();

    let forged = Invitation::new(&pair.a_uid, &pair.a_handle, &real.space_id);
    let err = pair
        .svc
        .accept_invitation(&m_uid, &forged)
        .await
        .expect_err("forged accept");
    assert!(matches!(err, tripspaces::error::AppError::NotFound(_)));

    let space = pair.db.get_space(&real.space_id).await.unwrap().unwrap();
    assert_eq!(space.members, vec![pair.a_uid.clone()]);
    let m_profile = pair.db.get_profile(&m_uid).await.unwrap().unwrap();
    assert_eq!(m_profile.current_mode, TripMode::Individual);
    assert!(m_profile.collaborative_space_id.is_none());
}

#[tokio::test]
async fn test_decline_removes_entry_only_and_is_idempotent() {
    require_emulator!();
    let pair = setup_pair().await;

    let invitation = pair
        .svc
        .send_invitation(&pair.a_uid, &pair.b_handle)
        .await
        .expect("send");

    pair.svc
        .decline_invitation(&pair.b_uid, &invitation)
        .await
        .expect("decline");
    // Resolving an already-removed entry is a silent no-op
    pair.svc
        .decline_invitation(&pair.b_uid, &invitation)
        .await
        .expect("second decline");

    assert!(pair.svc.list_invitations(&pair.b_email).await.unwrap().is_empty());

    // Declining never touches the space or the invitee profile
    let space = pair.db.get_space(&invitation.space_id).await.unwrap().unwrap();
    assert_eq!(space.members, vec![pair.a_uid.clone()]);
    let b_profile = pair.db.get_profile(&pair.b_uid).await.unwrap().unwrap();
    assert_eq!(b_profile.current_mode, TripMode::Individual);
    assert!(b_profile.collaborative_space_id.is_none());
}

#[tokio::test]
async fn test_reinvite_after_decline_reopens_the_same_space() {
    require_emulator!();
    let pair = setup_pair().await;

    let first = pair
        .svc
        .send_invitation(&pair.a_uid, &pair.b_handle)
        .await
        .expect("send");
    pair.svc
        .decline_invitation(&pair.b_uid, &first)
        .await
        .expect("decline");

    let second = pair
        .svc
        .send_invitation(&pair.a_uid, &pair.b_handle)
        .await
        .expect("re-send");

    assert_eq!(first.space_id, second.space_id, "half-empty space is reused");
    let space = pair.db.get_space(&second.space_id).await.unwrap().unwrap();
    assert_eq!(space.status, SpaceStatus::Pending);
}

#[tokio::test]
async fn test_leave_resets_own_profile_and_removes_membership() {
    require_emulator!();
    let pair = setup_pair().await;

    let invitation = pair
        .svc
        .send_invitation(&pair.a_uid, &pair.b_handle)
        .await
        .expect("send");
    pair.svc
        .accept_invitation(&pair.b_uid, &invitation)
        .await
        .expect("accept");

    let b_profile = pair.svc.leave_space(&pair.b_uid).await.expect("leave");
    assert_eq!(b_profile.current_mode, TripMode::Individual);
    assert!(b_profile.collaborative_space_id.is_none());

    // Best-effort cleanup actually happened here
    let space = pair.db.get_space(&invitation.space_id).await.unwrap().unwrap();
    assert_eq!(space.members, vec![pair.a_uid.clone()]);

    // The other member's profile is untouched and still references the space
    let a_profile = pair.db.get_profile(&pair.a_uid).await.unwrap().unwrap();
    assert_eq!(a_profile.current_mode, TripMode::Collaborative);
    assert_eq!(
        a_profile.collaborative_space_id.as_deref(),
        Some(invitation.space_id.as_str())
    );
}

#[tokio::test]
async fn test_leave_succeeds_when_space_document_is_gone() {
    require_emulator!();
    let db = test_db().await;
    let svc = CollaborationService::new(db.clone());

    // A profile referencing a space that never existed (or was deleted)
    let uid = unique("ghost-member");
    let mut profile = UserProfile::new(&uid, Some("g@example.com"), None);
    profile.current_mode = TripMode::Collaborative;
    profile.collaborative_space_id = Some(unique("ghost-space"));
    db.upsert_profile(&profile).await.unwrap();

    // Phase 1 must still succeed; phase 2's failure is swallowed
    let after = svc.leave_space(&uid).await.expect("leave");
    assert_eq!(after.current_mode, TripMode::Individual);
    assert!(after.collaborative_space_id.is_none());
}

#[tokio::test]
async fn test_send_recovers_when_referenced_space_is_gone() {
    require_emulator!();
    let pair = setup_pair().await;

    // A's profile points at a space document that no longer exists
    let ghost_id = unique("ghost-space");
    let mut a_profile = pair.db.get_profile(&pair.a_uid).await.unwrap().unwrap();
    a_profile.current_mode = TripMode::Collaborative;
    a_profile.collaborative_space_id = Some(ghost_id.clone());
    pair.db.upsert_profile(&a_profile).await.unwrap();

    // The dangling reference must not block inviting someone
    let invitation = pair
        .svc
        .send_invitation(&pair.a_uid, &pair.b_handle)
        .await
        .expect("send heals the reference");
    assert_ne!(invitation.space_id, ghost_id);

    let space = pair.db.get_space(&invitation.space_id).await.unwrap().unwrap();
    assert_eq!(space.members, vec![pair.a_uid.clone()]);
    assert_eq!(space.status, SpaceStatus::Pending);

    let healed = pair.db.get_profile(&pair.a_uid).await.unwrap().unwrap();
    assert_eq!(
        healed.collaborative_space_id.as_deref(),
        Some(invitation.space_id.as_str())
    );
}
