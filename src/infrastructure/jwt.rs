//! HS256 session tokens.

use crate::config::AuthConfig;
use crate::domain::ports::{AuthGateway, Identity};
use crate::domain::user::{Role, User, UserId};
use crate::error::{RentalError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT session claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId, // Subject (user ID)
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub struct JwtAuthGateway {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtAuthGateway {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: config.token_ttl,
        }
    }
}

impl AuthGateway for JwtAuthGateway {
    fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| RentalError::internal(format!("create JWT: {e}")))
    }

    fn resolve_identity(&self, credential: &str) -> Result<Identity> {
        let credential = credential.trim();
        let token = credential
            .strip_prefix("Bearer ")
            .unwrap_or(credential)
            .trim();
        if token.is_empty() {
            return Err(RentalError::Unauthorized("missing credential".to_string()));
        }

        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<SessionClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    RentalError::Unauthorized("session token expired".to_string())
                }
                ErrorKind::InvalidKeyFormat | ErrorKind::InvalidAlgorithmName => {
                    RentalError::internal(format!("JWT verification: {e}"))
                }
                _ => RentalError::Unauthorized("failed to decode token".to_string()),
            }
        })?;

        Ok(Identity {
            user_id: data.claims.sub,
            role: data.claims.role,
        })
    }
}
