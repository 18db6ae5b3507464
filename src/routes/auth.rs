// SPDX-License-Identifier: MIT

//! Session authentication routes.
//!
//! The auth provider lives client-side; we only see its ID token. Signing
//! in exchanges a verified ID token for our own session JWT (cookie), and
//! makes sure the profile document exists.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", post(create_session))
        .route("/auth/logout", get(logout))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    id_token: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub username: Option<String>,
}

/// Exchange a Firebase ID token for a session cookie.
async fn create_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<SessionRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let identity = state
        .identity
        .verify_id_token(&req.id_token)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "ID token verification failed");
            AppError::Unauthorized
        })?;

    let profile = state
        .collaboration
        .ensure_profile(
            &identity.uid,
            identity.email.as_deref(),
            identity.display_name.as_deref(),
        )
        .await?;

    let token = create_jwt(
        &identity.uid,
        identity.email.as_deref(),
        &state.config.jwt_signing_key,
    )?;

    let secure = state.config.frontend_url.starts_with("https://");
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(30))
        .build();

    tracing::info!(uid = %identity.uid, "Session created");

    Ok((
        jar.add(cookie),
        Json(SessionResponse {
            uid: profile.uid,
            email: profile.email,
            display_name: profile.display_name,
            username: profile.username,
        }),
    ))
}

/// Clear the session cookie.
async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();

    (jar.add(cookie), Json(serde_json::json!({ "success": true })))
}
