// SPDX-License-Identifier: MIT

//! API routes for authenticated users.
//!
//! Every trip-data handler resolves the caller's scope fresh from their
//! profile before touching the store, so a mode switch between requests
//! can never write through a stale path.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    Destination, DestinationNote, Expense, Invitation, ItineraryEvent, PersonalDoc, PersonalNote,
    TripFile, TripMode, UserProfile,
};
use crate::scope::{resolve_scope, ScopePath};
use crate::services::trips::{
    DestinationPatch, EventDraft, ExpenseDraft, FileDraft, NewDestination, PersonalDocDraft,
    PersonalNoteDraft,
};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        // Profile
        .route("/api/me", get(get_me))
        .route("/api/me/username", post(claim_username))
        .route("/api/me/mode", put(set_mode))
        // Collaboration
        .route("/api/invitations", get(list_invitations).post(send_invitation))
        .route("/api/invitations/accept", post(accept_invitation))
        .route("/api/invitations/decline", post(decline_invitation))
        .route("/api/collaboration/leave", post(leave_space))
        // Destinations
        .route(
            "/api/destinations",
            get(list_destinations).post(add_destination),
        )
        .route(
            "/api/destinations/{id}",
            get(get_destination)
                .put(update_destination)
                .delete(delete_destination),
        )
        // Nested: notes
        .route("/api/destinations/{id}/notes", post(add_note))
        .route(
            "/api/destinations/{id}/notes/{note_id}",
            put(update_note).delete(delete_note),
        )
        .route(
            "/api/destinations/{id}/notes/{note_id}/toggle",
            post(toggle_note),
        )
        // Nested: expenses
        .route("/api/destinations/{id}/expenses", post(add_expense))
        .route(
            "/api/destinations/{id}/expenses/{expense_id}",
            put(update_expense).delete(delete_expense),
        )
        // Nested: files
        .route("/api/destinations/{id}/files", post(add_file))
        .route(
            "/api/destinations/{id}/files/{file_id}",
            put(update_file).delete(delete_file),
        )
        // Nested: events
        .route("/api/destinations/{id}/events", post(upsert_event))
        .route(
            "/api/destinations/{id}/events/{event_id}",
            delete(delete_event),
        )
        .route(
            "/api/destinations/{id}/events/{event_id}/toggle",
            post(toggle_event),
        )
        // Personal notes and tags
        .route("/api/notes", get(list_personal_notes).post(add_personal_note))
        .route(
            "/api/notes/tags",
            get(list_note_tags).post(add_note_tag),
        )
        .route("/api/notes/tags/{tag}", delete(delete_note_tag))
        .route(
            "/api/notes/{id}",
            put(update_personal_note).delete(delete_personal_note),
        )
        .route("/api/notes/{id}/toggle", post(toggle_personal_note))
        // Personal docs
        .route("/api/docs", get(list_personal_docs).post(add_personal_doc))
        .route("/api/docs/{id}", delete(delete_personal_doc))
}

// ─── Profile ─────────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub current_mode: TripMode,
    pub collaborative_space_id: Option<String>,
}

impl From<UserProfile> for ProfileResponse {
    fn from(p: UserProfile) -> Self {
        Self {
            uid: p.uid,
            email: p.email,
            display_name: p.display_name,
            username: p.username,
            current_mode: p.current_mode,
            collaborative_space_id: p.collaborative_space_id,
        }
    }
}

/// Load the caller's profile; a signed-in user without a profile document
/// means `ensure_profile` was skipped, which we treat as not found.
async fn load_profile(state: &AppState, user: &AuthUser) -> Result<UserProfile> {
    state
        .db
        .get_profile(&user.uid)
        .await?
        .ok_or_else(|| AppError::UserNotFound(user.uid.clone()))
}

/// Load the caller's profile and resolve the active scope in one step.
async fn load_scope(state: &AppState, user: &AuthUser) -> Result<ScopePath> {
    let profile = load_profile(state, user).await?;
    resolve_scope(&profile)
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = load_profile(&state, &user).await?;
    Ok(Json(profile.into()))
}

#[derive(Deserialize, Validate)]
pub struct UsernameRequest {
    #[validate(length(min = 3, max = 30))]
    username: String,
}

/// Claim a username for the current user.
async fn claim_username(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UsernameRequest>,
) -> Result<Json<ProfileResponse>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state.collaboration.reserve_username(&user.uid, &req.username).await?;
    let profile = load_profile(&state, &user).await?;
    Ok(Json(profile.into()))
}

#[derive(Deserialize)]
pub struct ModeRequest {
    mode: TripMode,
}

/// Switch between individual and collaborative mode.
async fn set_mode(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ModeRequest>,
) -> Result<Json<ProfileResponse>> {
    let profile = state.collaboration.set_mode(&user.uid, req.mode).await?;
    Ok(Json(profile.into()))
}

// ─── Collaboration ───────────────────────────────────────────

/// Pending invitations for the current user's email.
async fn list_invitations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Invitation>>> {
    let profile = load_profile(&state, &user).await?;
    let Some(email) = profile.email else {
        return Ok(Json(vec![]));
    };
    Ok(Json(state.collaboration.list_invitations(&email).await?))
}

#[derive(Deserialize, Validate)]
pub struct InviteRequest {
    /// Username of the user to invite, with or without a leading `@`
    #[validate(length(min = 1, max = 64))]
    invitee: String,
}

/// Invite another user into a collaborative space.
async fn send_invitation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<InviteRequest>,
) -> Result<Json<Invitation>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let invitation = state
        .collaboration
        .send_invitation(&user.uid, &req.invitee)
        .await?;
    Ok(Json(invitation))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AckResponse {
    pub success: bool,
}

/// Accept an invitation (the exact entry, as listed).
async fn accept_invitation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(invitation): Json<Invitation>,
) -> Result<Json<AckResponse>> {
    state
        .collaboration
        .accept_invitation(&user.uid, &invitation)
        .await?;
    Ok(Json(AckResponse { success: true }))
}

/// Decline an invitation (the exact entry, as listed).
async fn decline_invitation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(invitation): Json<Invitation>,
) -> Result<Json<AckResponse>> {
    state
        .collaboration
        .decline_invitation(&user.uid, &invitation)
        .await?;
    Ok(Json(AckResponse { success: true }))
}

/// Leave the current collaborative space.
async fn leave_space(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state.collaboration.leave_space(&user.uid).await?;
    Ok(Json(profile.into()))
}

// ─── Destinations ────────────────────────────────────────────

async fn list_destinations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Destination>>> {
    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.list_destinations(&scope).await?))
}

async fn add_destination(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<NewDestination>,
) -> Result<Json<Destination>> {
    draft
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.add_destination(&scope, draft).await?))
}

async fn get_destination(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Destination>> {
    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.get_destination(&scope, &id).await?))
}

async fn update_destination(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(patch): Json<DestinationPatch>,
) -> Result<Json<Destination>> {
    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.update_destination(&scope, &id, patch).await?))
}

async fn delete_destination(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<AckResponse>> {
    let scope = load_scope(&state, &user).await?;
    state.trips.delete_destination(&scope, &id).await?;
    Ok(Json(AckResponse { success: true }))
}

// ─── Destination Notes ───────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct NoteRequest {
    #[validate(length(min = 1))]
    text: String,
}

async fn add_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<NoteRequest>,
) -> Result<Json<DestinationNote>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.add_note(&scope, &id, &req.text).await?))
}

async fn update_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, note_id)): Path<(String, String)>,
    Json(req): Json<NoteRequest>,
) -> Result<Json<Destination>> {
    let scope = load_scope(&state, &user).await?;
    Ok(Json(
        state.trips.update_note(&scope, &id, &note_id, &req.text).await?,
    ))
}

async fn toggle_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, note_id)): Path<(String, String)>,
) -> Result<Json<Destination>> {
    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.toggle_note(&scope, &id, &note_id).await?))
}

async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, note_id)): Path<(String, String)>,
) -> Result<Json<Destination>> {
    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.delete_note(&scope, &id, &note_id).await?))
}

// ─── Expenses ────────────────────────────────────────────────

async fn add_expense(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(draft): Json<ExpenseDraft>,
) -> Result<Json<Expense>> {
    draft
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.add_expense(&scope, &id, draft).await?))
}

async fn update_expense(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, expense_id)): Path<(String, String)>,
    Json(draft): Json<ExpenseDraft>,
) -> Result<Json<Destination>> {
    draft
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let scope = load_scope(&state, &user).await?;
    Ok(Json(
        state
            .trips
            .update_expense(&scope, &id, &expense_id, draft)
            .await?,
    ))
}

async fn delete_expense(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, expense_id)): Path<(String, String)>,
) -> Result<Json<Destination>> {
    let scope = load_scope(&state, &user).await?;
    Ok(Json(
        state.trips.delete_expense(&scope, &id, &expense_id).await?,
    ))
}

// ─── Files ───────────────────────────────────────────────────

async fn add_file(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(draft): Json<FileDraft>,
) -> Result<Json<TripFile>> {
    draft
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.add_file(&scope, &id, draft).await?))
}

async fn update_file(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, file_id)): Path<(String, String)>,
    Json(draft): Json<FileDraft>,
) -> Result<Json<Destination>> {
    draft
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let scope = load_scope(&state, &user).await?;
    Ok(Json(
        state.trips.update_file(&scope, &id, &file_id, draft).await?,
    ))
}

async fn delete_file(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, file_id)): Path<(String, String)>,
) -> Result<Json<Destination>> {
    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.delete_file(&scope, &id, &file_id).await?))
}

// ─── Itinerary Events ────────────────────────────────────────

async fn upsert_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(draft): Json<EventDraft>,
) -> Result<Json<ItineraryEvent>> {
    draft
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.upsert_event(&scope, &id, draft).await?))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, event_id)): Path<(String, String)>,
) -> Result<Json<Destination>> {
    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.delete_event(&scope, &id, &event_id).await?))
}

async fn toggle_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, event_id)): Path<(String, String)>,
) -> Result<Json<Destination>> {
    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.toggle_event(&scope, &id, &event_id).await?))
}

// ─── Personal Notes ──────────────────────────────────────────

async fn list_personal_notes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<PersonalNote>>> {
    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.list_personal_notes(&scope).await?))
}

async fn add_personal_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<PersonalNoteDraft>,
) -> Result<Json<PersonalNote>> {
    draft
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.add_personal_note(&scope, draft).await?))
}

async fn update_personal_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(draft): Json<PersonalNoteDraft>,
) -> Result<Json<PersonalNote>> {
    draft
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let scope = load_scope(&state, &user).await?;
    Ok(Json(
        state.trips.update_personal_note(&scope, &id, draft).await?,
    ))
}

async fn toggle_personal_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<PersonalNote>> {
    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.toggle_personal_note(&scope, &id).await?))
}

async fn delete_personal_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<AckResponse>> {
    let scope = load_scope(&state, &user).await?;
    state.trips.delete_personal_note(&scope, &id).await?;
    Ok(Json(AckResponse { success: true }))
}

// ─── Note Tags ───────────────────────────────────────────────

async fn list_note_tags(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<String>>> {
    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.list_note_tags(&scope).await?))
}

#[derive(Deserialize, Validate)]
pub struct TagRequest {
    #[validate(length(min = 1, max = 50))]
    tag: String,
}

async fn add_note_tag(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<TagRequest>,
) -> Result<Json<AckResponse>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let scope = load_scope(&state, &user).await?;
    state.trips.add_note_tag(&scope, &req.tag).await?;
    Ok(Json(AckResponse { success: true }))
}

async fn delete_note_tag(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(tag): Path<String>,
) -> Result<Json<AckResponse>> {
    let scope = load_scope(&state, &user).await?;
    state.trips.delete_note_tag(&scope, &tag).await?;
    Ok(Json(AckResponse { success: true }))
}

// ─── Personal Docs ───────────────────────────────────────────

async fn list_personal_docs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<PersonalDoc>>> {
    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.list_personal_docs(&scope).await?))
}

async fn add_personal_doc(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<PersonalDocDraft>,
) -> Result<Json<PersonalDoc>> {
    draft
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let scope = load_scope(&state, &user).await?;
    Ok(Json(state.trips.add_personal_doc(&scope, draft).await?))
}

async fn delete_personal_doc(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<AckResponse>> {
    let scope = load_scope(&state, &user).await?;
    state.trips.delete_personal_doc(&scope, &id).await?;
    Ok(Json(AckResponse { success: true }))
}
