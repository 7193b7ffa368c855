//! Bearer-token authentication at the HTTP boundary.
//!
//! The token is decoded exactly once per request into a trusted
//! [`Identity`] that handlers thread explicitly into the workflow calls;
//! nothing downstream reads ambient request state.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use common::{Identity, Role, UserId};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

/// Claims carried by the bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    /// Expiry as a unix timestamp.
    pub exp: u64,
}

/// Verification keys shared across requests.
#[derive(Clone)]
pub struct AuthKeys {
    decoding: DecodingKey,
    validation: Validation,
}

impl AuthKeys {
    /// Builds HS256 keys from a shared secret.
    pub fn from_secret(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Decodes and validates a token into its claims.
    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
    }
}

/// Signs a token for the given claims. Token issuance belongs to the
/// external auth service; this exists for tests and local tooling.
pub fn sign_token(secret: &str, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Extractor producing the validated identity for a request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Authorization header missing".to_string()))?;

        let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Invalid authorization header format".to_string())
        })?;

        let claims = state.auth.decode(token).map_err(|err| {
            tracing::debug!(error = %err, "token verification failed");
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })?;

        Ok(AuthUser(Identity::new(
            UserId::from_uuid(claims.sub),
            claims.email,
            claims.role,
        )))
    }
}
