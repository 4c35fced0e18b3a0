//! Token signing/verification (HS256).
//!
//! Claim time-window checks stay in [`crate::claims`]; this module only pins
//! the signature scheme behind a trait so the API layer can swap validators in
//! tests.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token is malformed or has an invalid signature")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("token encoding failed")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}

/// Verification seam consumed by the session resolver and middleware.
pub trait JwtValidator: Send + Sync {
    /// Verify the signature and claim time window, returning the claims.
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// HS256 validator/signer over a shared secret.
#[derive(Clone)]
pub struct Hs256JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(&secret),
            decoding: DecodingKey::from_secret(&secret),
        }
    }

    /// Sign claims into a compact token.
    pub fn issue(&self, claims: &JwtClaims) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(JwtError::Encoding)
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        // Expiry is carried in our own `expires_at` claim and checked by
        // `validate_claims`, not by the library's registered `exp` claim.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(JwtError::InvalidToken)?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use findermeister_core::UserId;

    use crate::Role;

    fn test_claims(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            role: Role::Finder,
            issued_at: now,
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn issued_token_validates() {
        let v = Hs256JwtValidator::new(b"test-secret".to_vec());
        let now = Utc::now();
        let claims = test_claims(now);

        let token = v.issue(&claims).unwrap();
        let decoded = v.validate(&token, now + Duration::minutes(1)).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let signer = Hs256JwtValidator::new(b"secret-a".to_vec());
        let verifier = Hs256JwtValidator::new(b"secret-b".to_vec());
        let now = Utc::now();

        let token = signer.issue(&test_claims(now)).unwrap();
        assert!(matches!(
            verifier.validate(&token, now),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let v = Hs256JwtValidator::new(b"test-secret".to_vec());
        let now = Utc::now();

        let token = v.issue(&test_claims(now)).unwrap();
        assert!(matches!(
            v.validate(&token, now + Duration::hours(1)),
            Err(JwtError::Claims(TokenValidationError::Expired))
        ));
    }
}
