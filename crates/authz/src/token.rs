//! Signed, time-limited session tokens (HS256 JWT).

use std::fmt;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::AuthError;

/// Lifetime of an issued token.
pub const TOKEN_TTL: Duration = Duration::hours(24);

/// Identity asserted by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    pub role: String,
    /// Issued at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// Issues and verifies tokens with one shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, TOKEN_TTL)
    }

    fn with_ttl(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, user_id: &str, email: &str, role: &str) -> Result<String, AuthError> {
        self.issue_at(user_id, email, role, OffsetDateTime::now_utc())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        user_id: &str,
        email: &str,
        role: &str,
        now: OffsetDateTime,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Check signature and expiry.
    ///
    /// Every failure collapses into [`AuthError::InvalidToken`]; the cause is
    /// only logged.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token verification failed");
                AuthError::InvalidToken
            })
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret")
    }

    #[test]
    fn issued_token_verifies_with_claims() {
        let tokens = service();
        let token = tokens.issue("u-1", "ada@example.com", "user").unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id, "u-1");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let issued = OffsetDateTime::now_utc() - Duration::hours(25);
        let token = tokens
            .issue_at("u-1", "ada@example.com", "user", issued)
            .unwrap();

        assert!(matches!(tokens.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = TokenService::new("other-secret")
            .issue("u-1", "ada@example.com", "user")
            .unwrap();

        assert!(matches!(service().verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn tampered_and_garbage_tokens_share_one_error() {
        let tokens = service();
        let token = tokens.issue("u-1", "ada@example.com", "user").unwrap();
        let mut tampered = token.clone();
        tampered.push('x');

        let tampered_err = tokens.verify(&tampered).unwrap_err();
        let garbage_err = tokens.verify("not.a.token").unwrap_err();
        assert_eq!(tampered_err.to_string(), garbage_err.to_string());
        assert_eq!(garbage_err.to_string(), "Invalid or expired token");
    }

    #[test]
    fn token_without_expiry_is_rejected() {
        let claims = serde_json::json!({
            "userId": "u-1",
            "email": "ada@example.com",
            "role": "user",
            "iat": OffsetDateTime::now_utc().unix_timestamp(),
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(service().verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn claims_use_camel_case_user_id() {
        let claims = Claims {
            user_id: "u-1".to_string(),
            email: "ada@example.com".to_string(),
            role: "user".to_string(),
            iat: 0,
            exp: 1,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["userId"], "u-1");
        assert!(json.get("user_id").is_none());
    }
}
