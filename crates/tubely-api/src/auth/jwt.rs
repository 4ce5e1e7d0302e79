//! HS256 access tokens.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tubely_core::AppError;
use uuid::Uuid;

use super::models::JwtClaims;

/// Issuer stamped on access tokens
pub const TOKEN_ISSUER: &str = "tubely-access";

/// Validates bearer tokens signed with the shared HS256 secret.
#[derive(Clone)]
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate a token and return the owner id carried in `sub`.
    pub fn validate_token(&self, token: &str) -> Result<Uuid, AppError> {
        let token_data =
            decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                tracing::debug!(error = %e, "JWT validation failed");
                AppError::Unauthorized("Couldn't validate JWT".to_string())
            })?;

        Ok(token_data.claims.sub)
    }

    /// Issue a token for `user_id` valid for `expires_in`.
    pub fn issue_token(
        &self,
        user_id: Uuid,
        expires_in: chrono::Duration,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = JwtClaims {
            iss: TOKEN_ISSUER.to_string(),
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign JWT: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-characters";

    #[test]
    fn test_issue_then_validate() {
        let validator = JwtValidator::new(SECRET);
        let user_id = Uuid::new_v4();
        let token = validator
            .issue_token(user_id, chrono::Duration::hours(1))
            .unwrap();
        assert_eq!(validator.validate_token(&token).unwrap(), user_id);
    }

    #[test]
    fn test_expired_token_rejected() {
        let validator = JwtValidator::new(SECRET);
        let token = validator
            .issue_token(Uuid::new_v4(), chrono::Duration::seconds(-60))
            .unwrap();
        let err = validator.validate_token(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref msg) if msg == "Couldn't validate JWT"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtValidator::new("another-secret-that-is-also-32-chars-long");
        let validator = JwtValidator::new(SECRET);
        let token = issuer
            .issue_token(Uuid::new_v4(), chrono::Duration::hours(1))
            .unwrap();
        assert!(validator.validate_token(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let validator = JwtValidator::new(SECRET);
        assert!(validator.validate_token("not.a.jwt").is_err());
    }
}
