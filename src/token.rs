use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    dto::auth::{Claims, ResetClaims},
    error::{AppError, AppResult},
};

pub const SESSION_TTL: Duration = Duration::days(7);
pub const RESET_TTL: Duration = Duration::minutes(15);
const RESET_PURPOSE: &str = "password_reset";

fn expiry(ttl: Duration) -> AppResult<usize> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;
    Ok(expiration.timestamp() as usize)
}

fn sign<T: Serialize>(secret: &str, claims: &T) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify<T: DeserializeOwned>(secret: &str, token: &str) -> Option<T> {
    decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

pub fn issue_session_token(secret: &str, user_id: i64, email: &str, role: &str) -> AppResult<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        exp: expiry(SESSION_TTL)?,
    };
    sign(secret, &claims)
}

pub fn decode_session_token(secret: &str, token: &str) -> AppResult<Claims> {
    verify::<Claims>(secret, token)
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))
}

pub fn issue_reset_token(secret: &str, user_id: i64, email: &str) -> AppResult<String> {
    let claims = ResetClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        purpose: RESET_PURPOSE.to_string(),
        exp: expiry(RESET_TTL)?,
    };
    sign(secret, &claims)
}

pub fn decode_reset_token(secret: &str, token: &str) -> AppResult<ResetClaims> {
    verify::<ResetClaims>(secret, token)
        .filter(|claims| claims.purpose == RESET_PURPOSE)
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired reset token".into()))
}

/// Parse the numeric user id carried in `sub`.
pub fn subject_id(sub: &str) -> AppResult<i64> {
    sub.parse::<i64>()
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn session_token_round_trips_identity_and_role() {
        let token = issue_session_token(SECRET, 42, "a@b.c", "admin").unwrap();
        let claims = decode_session_token(SECRET, &token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "a@b.c");
        assert_eq!(claims.role, "admin");

        let ttl = claims.exp as i64 - Utc::now().timestamp();
        assert!(ttl > Duration::days(6).num_seconds());
        assert!(ttl <= SESSION_TTL.num_seconds());
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = issue_session_token(SECRET, 1, "a@b.c", "user").unwrap();
        let err = decode_session_token("other", &token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: "1".into(),
            email: "a@b.c".into(),
            role: "user".into(),
            exp: (Utc::now() - Duration::hours(1)).timestamp() as usize,
        };
        let token = sign(SECRET, &claims).unwrap();
        assert!(decode_session_token(SECRET, &token).is_err());
    }

    #[test]
    fn reset_and_session_tokens_are_not_interchangeable() {
        let reset = issue_reset_token(SECRET, 5, "a@b.c").unwrap();
        let session = issue_session_token(SECRET, 5, "a@b.c", "user").unwrap();

        assert!(decode_session_token(SECRET, &reset).is_err());
        assert!(decode_reset_token(SECRET, &session).is_err());

        let claims = decode_reset_token(SECRET, &reset).unwrap();
        assert_eq!(subject_id(&claims.sub).unwrap(), 5);
        let ttl = claims.exp as i64 - Utc::now().timestamp();
        assert!(ttl <= RESET_TTL.num_seconds());
    }

    #[test]
    fn non_numeric_subject_is_unauthorized() {
        assert!(matches!(subject_id("abc"), Err(AppError::Unauthorized(_))));
    }
}
