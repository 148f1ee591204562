//! Bearer token authentication.
//!
//! Tokens are issued by the storefront's login flow; this service only
//! verifies them.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use catfecito_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// JWT claims carried by storefront tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub id: i32,

    #[serde(default)]
    pub email: Option<String>,

    /// Expiry (seconds since the epoch)
    pub exp: u64,
}

/// HS256 verification key
pub struct JwtKeys {
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::Unauthorized("token expired".into()),
                _ => ApiError::Unauthorized("invalid token".into()),
            })
    }
}

/// Authenticated user, extracted from `Authorization: Bearer <jwt>`
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

        let claims = state.jwt.verify(token)?;

        Ok(Self {
            id: UserId::new(claims.id),
            email: claims.email,
        })
    }
}
