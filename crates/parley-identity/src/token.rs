//! Bearer-token issue and verification (JWT, HS256).

use crate::AuthError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The stable user ID this token authenticates.
    pub sub: String,
    /// Username at issue time, for logging and display only. The `sub`
    /// claim is the authorization key.
    pub username: String,
    /// Expiry as a Unix timestamp (seconds).
    pub exp: i64,
}

/// Keys and lifetime policy for access tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_minutes: i64,
}

impl fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKeys")
            .field("secret", &"[REDACTED]")
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

impl TokenKeys {
    /// Builds token keys from a shared secret.
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_minutes,
        }
    }

    /// Issues a signed access token for the given user.
    pub fn issue(&self, user_id: &str, username: &str) -> Result<String, AuthError> {
        let exp = chrono::Utc::now() + chrono::Duration::minutes(self.ttl_minutes);
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp: exp.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Token(e.to_string()))
    }

    /// Verifies a token's signature and expiry, returning its claims.
    ///
    /// Every failure mode — bad signature, garbled token, expired — maps
    /// to [`AuthError::InvalidCredential`]; the guard fails closed and
    /// leaks nothing about why.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify_round_trips_claims() {
        let keys = TokenKeys::new("test-secret", 30);
        let token = keys.issue("user-1", "alice").unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "alice");
        assert!(claims.exp > chrono::Utc::now().timestamp());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = TokenKeys::new("test-secret", -5);
        let token = keys.issue("user-1", "alice").unwrap();
        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = TokenKeys::new("secret-a", 30);
        let verifier = TokenKeys::new("secret-b", 30);
        let token = issuer.issue("user-1", "alice").unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::InvalidCredential)
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let keys = TokenKeys::new("test-secret", 30);
        assert!(matches!(
            keys.verify("not.a.jwt"),
            Err(AuthError::InvalidCredential)
        ));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let keys = TokenKeys::new("super-secret", 30);
        let debug = format!("{keys:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
