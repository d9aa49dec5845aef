//! Bearer token authentication.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Decoded token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User email
    pub sub: String,
    /// Farm the user belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farm_id: Option<String>,
    /// Expiration
    pub exp: i64,
}

/// Caller resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub farm_id: Option<String>,
}

impl Identity {
    /// Farm scope for farm-bound routes.
    pub fn require_farm(&self) -> ApiResult<&str> {
        self.farm_id
            .as_deref()
            .ok_or_else(|| ApiError::forbidden("No farm associated with this account"))
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            farm_id: claims.farm_id,
        }
    }
}

/// Resolves bearer tokens into identities.
#[async_trait]
pub trait AuthGate: Send + Sync {
    async fn resolve(&self, token: &str) -> ApiResult<Identity>;
}

/// HS256 JWT verification with a shared secret.
pub struct JwtAuthGate {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
}

impl JwtAuthGate {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Sign a token for `subject`, valid for `ttl`.
    pub fn issue(&self, subject: &str, farm_id: Option<&str>, ttl: Duration) -> ApiResult<String> {
        let claims = Claims {
            sub: subject.to_string(),
            farm_id: farm_id.map(str::to_string),
            exp: (Utc::now() + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to sign token: {}", e)))
    }
}

#[async_trait]
impl AuthGate for JwtAuthGate {
    async fn resolve(&self, token: &str) -> ApiResult<Identity> {
        let token_data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| ApiError::unauthorized(format!("Token validation failed: {}", e)))?;

        debug!(subject = %token_data.claims.sub, "Token verified");
        Ok(Identity::from(token_data.claims))
    }
}

/// Axum extractor for the authenticated caller.
#[axum::async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get Authorization header
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        // Extract Bearer token
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        state.auth.resolve(token).await
    }
}
