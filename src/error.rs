// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
///
/// The collaboration variants mirror the coordinator's rejection causes so
/// the frontend can branch on the machine-readable `error` code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("You cannot invite yourself")]
    SelfInvite,

    #[error("This user is already in a collaborative trip")]
    InviteeAlreadyCollaborating,

    #[error("This user has no email configured")]
    InviteeNoEmail,

    #[error("You are already in a collaborative trip with someone")]
    AlreadyCollaborating,

    #[error("You are already in a trip; leave it before accepting a new invitation")]
    AlreadyInSpace,

    #[error("This collaborative space already has two members")]
    SpaceFull,

    #[error("Profile is in collaborative mode but references no space")]
    ScopeUnavailable,

    #[error("Concurrent modification, please retry")]
    WriteConflict,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    /// Stable machine-readable code used in response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::UsernameTaken => "username_taken",
            AppError::UserNotFound(_) => "user_not_found",
            AppError::SelfInvite => "self_invite",
            AppError::InviteeAlreadyCollaborating => "invitee_already_collaborating",
            AppError::InviteeNoEmail => "invitee_no_email",
            AppError::AlreadyCollaborating => "already_collaborating",
            AppError::AlreadyInSpace => "already_in_space",
            AppError::SpaceFull => "space_full",
            AppError::ScopeUnavailable => "scope_unavailable",
            AppError::WriteConflict => "write_conflict",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::UsernameTaken
            | AppError::InviteeAlreadyCollaborating
            | AppError::AlreadyCollaborating
            | AppError::AlreadyInSpace
            | AppError::SpaceFull
            | AppError::ScopeUnavailable
            | AppError::WriteConflict => StatusCode::CONFLICT,
            AppError::UserNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SelfInvite | AppError::InviteeNoEmail | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let details = match &self {
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                None
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                None
            }
            AppError::Unauthorized => None,
            other => Some(other.to_string()),
        };

        let body = ErrorResponse {
            error: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
