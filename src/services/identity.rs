// SPDX-License-Identifier: MIT

//! Firebase ID-token verification for session sign-in.
//!
//! The auth provider hands the web client an RS256 ID token; the session
//! endpoint exchanges it for our own cookie JWT. Verification checks the
//! `securetoken` issuer/audience for the configured project against
//! Google's published JWK set, cached with a TTL.

use anyhow::Context;
use dashmap::DashMap;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const JWK_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const KEY_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Identity extracted from a valid ID token.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Clone)]
enum VerifierMode {
    Google,
    /// Fixed key for deterministic tests; skips the network fetch.
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
}

struct CachedKey {
    key: Arc<DecodingKey>,
    fetched_at: Instant,
}

/// Verifier for Firebase-issued ID tokens.
pub struct IdentityVerifier {
    http_client: reqwest::Client,
    project_id: String,
    mode: VerifierMode,
    keys: DashMap<String, CachedKey>,
    refresh_lock: Mutex<()>,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

/// Claims we care about in a Firebase ID token.
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl IdentityVerifier {
    /// Production verifier fetching Google's securetoken JWK set.
    pub fn new(project_id: &str) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building identity HTTP client")?;

        tracing::info!(project = project_id, "Initialized ID-token verifier");

        Ok(Self {
            http_client,
            project_id: project_id.to_string(),
            mode: VerifierMode::Google,
            keys: DashMap::new(),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verifier with a static RSA public key, for tests.
    pub fn new_with_static_key(
        project_id: &str,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static kid must not be empty");
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building identity HTTP client")?;

        Ok(Self {
            http_client,
            project_id: project_id.to_string(),
            mode: VerifierMode::StaticKey {
                kid,
                decoding_key: Arc::new(decoding_key),
            },
            keys: DashMap::new(),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify an ID token and extract the caller's identity.
    pub async fn verify_id_token(&self, token: &str) -> anyhow::Result<VerifiedIdentity> {
        let header = decode_header(token).context("invalid JWT header")?;

        if header.alg != Algorithm::RS256 {
            anyhow::bail!("unexpected JWT alg: {:?}", header.alg);
        }

        let kid = header.kid.context("missing JWT kid")?;
        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let issuer = format!("https://securetoken.google.com/{}", self.project_id);
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let token_data = decode::<IdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .context("ID token validation failed")?;

        let claims = token_data.claims;
        if claims.sub.trim().is_empty() {
            anyhow::bail!("ID token has an empty subject");
        }

        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email,
            display_name: claims.name,
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> anyhow::Result<Arc<DecodingKey>> {
        if let VerifierMode::StaticKey {
            kid: static_kid,
            decoding_key,
        } = &self.mode
        {
            if static_kid == kid {
                return Ok(decoding_key.clone());
            }
            anyhow::bail!("unknown kid for static verifier: {}", kid);
        }

        if let Some(cached) = self.keys.get(kid) {
            if cached.fetched_at.elapsed() < KEY_CACHE_TTL {
                return Ok(cached.key.clone());
            }
        }

        // One refresh at a time; the second waiter re-checks the cache.
        let _guard = self.refresh_lock.lock().await;
        if let Some(cached) = self.keys.get(kid) {
            if cached.fetched_at.elapsed() < KEY_CACHE_TTL {
                return Ok(cached.key.clone());
            }
        }

        self.refresh_keys().await?;

        self.keys
            .get(kid)
            .map(|cached| cached.key.clone())
            .with_context(|| format!("no signing key published for kid {}", kid))
    }

    async fn refresh_keys(&self) -> anyhow::Result<()> {
        let jwks: JwkSet = self
            .http_client
            .get(JWK_URL)
            .send()
            .await
            .context("fetching securetoken JWK set")?
            .error_for_status()
            .context("securetoken JWK endpoint returned an error")?
            .json()
            .await
            .context("parsing securetoken JWK set")?;

        let now = Instant::now();
        let count = jwks.keys.len();
        for jwk in jwks.keys {
            let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
                .with_context(|| format!("bad RSA components for kid {}", jwk.kid))?;
            self.keys.insert(
                jwk.kid,
                CachedKey {
                    key: Arc::new(key),
                    fetched_at: now,
                },
            );
        }

        tracing::debug!(count, "Refreshed securetoken signing keys");
        Ok(())
    }
}
