//! JWT session tokens
//!
//! Tokens are HS256-signed and carry only the authenticated username and
//! role plus issued-at/expiry timestamps. The server keeps no session state:
//! a token is valid iff its signature matches the shared secret and the
//! current time is strictly before its expiry.

use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::GatewayError;

/// Claims embedded in a session token
///
/// Field names (`user`, `level`) are part of the wire contract with existing
/// clients; do not rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject username
    pub user: String,
    /// Role/level label, echoed back but not enforced here
    pub level: String,
    /// Issued-at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
}

/// Why a token was rejected
///
/// Each reason is distinguishable so the check endpoint can return a
/// reason-specific message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// No credential presented at all
    #[error("No token provided")]
    Missing,
    /// Token could not be parsed as a JWT
    #[error("Malformed token")]
    Malformed,
    /// Signature does not match the configured secret
    #[error("Invalid token signature")]
    InvalidSignature,
    /// Current time >= expiry
    #[error("Token expired")]
    Expired,
}

/// Issues and verifies session tokens
///
/// Built once at startup from the configured secret; cheap to share behind
/// the AppState.
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl JwtValidator {
    pub fn new(secret: &str, expiry_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    /// Issue a signed token for an authenticated identity
    ///
    /// Returns the token string and its expiry timestamp (unix seconds).
    pub fn issue_token(&self, username: &str, role: &str) -> Result<(String, u64), GatewayError> {
        let now = unix_now();
        let claims = Claims {
            user: username.to_string(),
            level: role.to_string(),
            iat: now,
            exp: now + self.expiry_seconds,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| GatewayError::Internal(format!("Failed to sign token: {e}")))?;

        Ok((token, claims.exp))
    }

    /// Verify a token and return its decoded claims
    ///
    /// Expiry is checked here rather than by jsonwebtoken so that a token
    /// presented at exactly its expiry timestamp is rejected (no leeway).
    pub fn verify_token(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            }
        })?;

        if unix_now() >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    let header = header?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtValidator {
        JwtValidator::new("test-secret", 3600)
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let jwt = validator();
        let (token, exp) = jwt.issue_token("admin", "admin").unwrap();

        let claims = jwt.verify_token(&token).unwrap();
        assert_eq!(claims.user, "admin");
        assert_eq!(claims.level, "admin");
        assert_eq!(claims.exp, exp);
        assert_eq!(claims.exp, claims.iat + 3600);
    }

    #[test]
    fn test_verification_is_idempotent() {
        let jwt = validator();
        let (token, _) = jwt.issue_token("security", "Security").unwrap();

        let first = jwt.verify_token(&token).unwrap();
        let second = jwt.verify_token(&token).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (token, _) = validator().issue_token("admin", "admin").unwrap();

        let other = JwtValidator::new("different-secret", 3600);
        assert_eq!(
            other.verify_token(&token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_token_rejected() {
        let jwt = validator();
        assert_eq!(jwt.verify_token("not-a-jwt"), Err(TokenError::Malformed));
        assert_eq!(jwt.verify_token(""), Err(TokenError::Malformed));
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt = validator();
        let now = unix_now();

        // Signed with the right secret but already past expiry
        let stale = Claims {
            user: "admin".into(),
            level: "admin".into(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &stale,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(jwt.verify_token(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let jwt = validator();
        let now = unix_now();

        // exp == now must be rejected; strictly-before must be accepted
        let at_boundary = Claims {
            user: "admin".into(),
            level: "admin".into(),
            iat: now - 10,
            exp: now,
        };
        let token = encode(
            &Header::default(),
            &at_boundary,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert_eq!(jwt.verify_token(&token), Err(TokenError::Expired));

        let still_valid = Claims {
            exp: now + 30,
            ..at_boundary
        };
        let token = encode(
            &Header::default(),
            &still_valid,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(jwt.verify_token(&token).is_ok());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        // Scheme is case-insensitive
        assert_eq!(
            extract_token_from_header(Some("bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(extract_token_from_header(Some("Basic dXNlcg==")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(Some("Bearer")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
