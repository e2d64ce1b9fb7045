use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Role, UserId};

/// JWT claims carried by a staff bearer token.
///
/// `iat`/`exp` are unix seconds (RFC 7519 NumericDate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: UserId,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl JwtClaims {
    pub fn new(sub: UserId, email: impl Into<String>, role: Role, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub,
            email: email.into(),
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the claim time window against `now`.
///
/// Signature checks happen in [`crate::jwt`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_at(issued_at: DateTime<Utc>, ttl_minutes: i64) -> JwtClaims {
        JwtClaims::new(
            UserId::generate(),
            "a@shop.test",
            Role::Cashier,
            issued_at,
            Duration::minutes(ttl_minutes),
        )
    }

    #[test]
    fn fresh_token_is_valid() {
        let now = Utc::now();
        assert_eq!(validate_claims(&claims_at(now, 30), now), Ok(()));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = Utc::now() - Duration::hours(2);
        assert_eq!(
            validate_claims(&claims_at(issued, 30), Utc::now()),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn future_token_is_rejected() {
        let issued = Utc::now() + Duration::hours(1);
        assert_eq!(
            validate_claims(&claims_at(issued, 30), Utc::now()),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn zero_ttl_is_an_invalid_window() {
        let now = Utc::now();
        assert_eq!(
            validate_claims(&claims_at(now, 0), now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }
}
