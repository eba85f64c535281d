//! JWT issuance and validation.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// The two token kinds issued at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Authenticates API requests.
    Access,
    /// Mints new access tokens; revocable at logout.
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims carried by every taskhub token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// User email.
    pub email: String,
    /// Which of the two token kinds this is.
    pub token_type: TokenKind,
    /// Unique token identifier.
    pub jti: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at time (Unix timestamp).
    pub iat: i64,
    /// Issuer.
    pub iss: String,
}

impl Claims {
    /// The subject parsed back into a user ID.
    pub fn user_id(&self) -> ApiResult<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|e| ApiError::Internal(format!("Malformed token subject: {}", e)))
    }
}

/// JWT token manager.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_token_minutes: i64,
    refresh_token_days: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given signing secret.
    pub fn new(
        secret: &str,
        issuer: String,
        access_token_minutes: i64,
        refresh_token_days: i64,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            access_token_minutes,
            refresh_token_days,
        }
    }

    /// Access-token lifetime in seconds, for response bodies.
    pub fn access_token_seconds(&self) -> i64 {
        self.access_token_minutes * 60
    }

    /// Issue an access token for a user.
    pub fn issue_access_token(&self, user_id: Uuid, email: &str) -> ApiResult<String> {
        self.issue(
            user_id,
            email,
            TokenKind::Access,
            Duration::minutes(self.access_token_minutes),
        )
    }

    /// Issue a refresh token for a user.
    pub fn issue_refresh_token(&self, user_id: Uuid, email: &str) -> ApiResult<String> {
        self.issue(
            user_id,
            email,
            TokenKind::Refresh,
            Duration::days(self.refresh_token_days),
        )
    }

    fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        kind: TokenKind,
        lifetime: Duration,
    ) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            token_type: kind,
            jti: Uuid::new_v4().to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate a token, requiring the expected kind.
    ///
    /// Rejects tampered, expired and wrong-issuer tokens, and tokens of
    /// the other kind (an access token is never accepted where a refresh
    /// token is required, or vice versa).
    pub fn validate(&self, token: &str, expected: TokenKind) -> ApiResult<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        let token_data: TokenData<Claims> =
            decode(token, &self.decoding_key, &validation).map_err(|e| {
                tracing::debug!(error = %e, "Token validation failed");
                ApiError::Unauthorized(format!("Invalid token: {}", e))
            })?;

        if token_data.claims.token_type != expected {
            return Err(ApiError::Unauthorized(format!(
                "Expected {} token, got {} token",
                expected, token_data.claims.token_type
            )));
        }

        Ok(token_data.claims)
    }
}

/// SHA-256 hex digest of a token, for at-rest revocation bookkeeping.
///
/// Revoked refresh tokens are stored by digest so no bearer material
/// lands in the database.
pub fn token_digest(token: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new("test-secret-key-12345", "taskhub".to_string(), 60, 7)
    }

    #[test]
    fn test_access_token_roundtrip() {
        let manager = manager();
        let user_id = Uuid::new_v4();

        let token = manager
            .issue_access_token(user_id, "alice@example.com")
            .unwrap();
        let claims = manager.validate(&token, TokenKind::Access).unwrap();

        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.token_type, TokenKind::Access);
        assert_eq!(claims.iss, "taskhub");
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let manager = manager();
        let token = manager
            .issue_refresh_token(Uuid::new_v4(), "alice@example.com")
            .unwrap();

        assert!(manager.validate(&token, TokenKind::Refresh).is_ok());
        assert!(manager.validate(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_access_token_rejected_as_refresh() {
        let manager = manager();
        let token = manager
            .issue_access_token(Uuid::new_v4(), "alice@example.com")
            .unwrap();

        assert!(manager.validate(&token, TokenKind::Refresh).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let manager = manager();
        let token = manager
            .issue_access_token(Uuid::new_v4(), "alice@example.com")
            .unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        assert!(manager.validate(&tampered, TokenKind::Access).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let manager = manager();
        let other = JwtManager::new("another-secret", "taskhub".to_string(), 60, 7);

        let token = manager
            .issue_access_token(Uuid::new_v4(), "alice@example.com")
            .unwrap();
        assert!(other.validate(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_tokens_carry_unique_jti() {
        let manager = manager();
        let user_id = Uuid::new_v4();

        let a = manager.issue_access_token(user_id, "a@example.com").unwrap();
        let b = manager.issue_access_token(user_id, "a@example.com").unwrap();

        let ca = manager.validate(&a, TokenKind::Access).unwrap();
        let cb = manager.validate(&b, TokenKind::Access).unwrap();
        assert_ne!(ca.jti, cb.jti);
    }

    #[test]
    fn test_token_digest_is_stable_and_distinct() {
        let a = token_digest("token-a");
        assert_eq!(a, token_digest("token-a"));
        assert_ne!(a, token_digest("token-b"));
        assert_eq!(a.len(), 64);
    }
}
