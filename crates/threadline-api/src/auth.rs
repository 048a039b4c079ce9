use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::{error::ApiError, state::AppState};

/// Header trusted as the user id when auth is disabled (local dev, tests)
pub const DEV_USER_HEADER: &str = "x-user-id";

const SESSION_COOKIE: &str = "__session";

/// Claims of a Clerk session token
#[derive(Debug, Clone, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: i64,
    /// Origin that requested the token
    #[serde(default)]
    pub azp: Option<String>,
}

/// Networkless RS256 verification with the instance's PEM public key
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
    authorized_parties: Vec<String>,
}

impl JwtVerifier {
    pub fn from_rsa_pem(pem: &str, authorized_parties: Vec<String>) -> Result<Self, ApiError> {
        // Env files often carry the PEM on one line with literal \n
        let pem = pem.replace("\\n", "\n");
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| ApiError::Internal(format!("invalid session public key: {}", e)))?;

        let mut validation = Validation::new(Algorithm::RS256);
        // Clerk session tokens carry no audience
        validation.validate_aud = false;
        validation.validate_nbf = true;

        Ok(Self {
            key,
            validation,
            authorized_parties,
        })
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, ApiError> {
        let data = decode::<SessionClaims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Session token rejected");
            ApiError::Unauthorized("Invalid or expired session".to_string())
        })?;

        let claims = data.claims;
        if let Some(azp) = &claims.azp {
            if !self.authorized_parties.is_empty() && !self.authorized_parties.contains(azp) {
                return Err(ApiError::Unauthorized(
                    "Session was issued for another origin".to_string(),
                ));
            }
        }
        if claims.sub.is_empty() {
            return Err(ApiError::Unauthorized("Session has no subject".to_string()));
        }
        Ok(claims)
    }
}

/// Session token from `Authorization: Bearer` or the `__session` cookie
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value)
            .filter(|t| !t.is_empty())
    })
}

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

impl AuthUser {
    /// Reject bodies that claim to act for someone else
    pub fn ensure_matches(&self, claimed_user_id: &str) -> Result<(), ApiError> {
        if self.user_id == claimed_user_id {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user_id,
                claimed = %claimed_user_id,
                "Request body user does not match session"
            );
            Err(ApiError::Forbidden(
                "userId does not match the authenticated user".to_string(),
            ))
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if !state.config.auth.enabled {
            let user_id = parts
                .headers
                .get(DEV_USER_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ApiError::Unauthorized("Missing x-user-id header".to_string()))?;
            return Ok(AuthUser {
                user_id: user_id.to_string(),
            });
        }

        let verifier = state
            .verifier
            .as_ref()
            .ok_or_else(|| ApiError::Internal("auth enabled without a verifier".to_string()))?;
        let token = session_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

        let claims = verifier.verify(token)?;
        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}
