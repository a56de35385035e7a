//! Access token inspection.
//!
//! The client never verifies signatures (it does not hold the key); it only
//! reads the `exp` claim to decide when to refresh.

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

/// Errors reading an access token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Not a decodable JWT, or `exp` absent.
    #[error("Malformed access token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),

    /// `exp` is not a representable instant.
    #[error("Access token expiry out of range: {0}")]
    ExpiryOutOfRange(i64),
}

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    exp: i64,
}

/// Decode the expiry of an access token without checking its signature.
///
/// # Errors
///
/// Returns `TokenError` if the token is not a JWT or has no usable `exp`.
pub fn access_token_expiry(token: &str) -> Result<DateTime<Utc>, TokenError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp"]);

    let data = jsonwebtoken::decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    DateTime::from_timestamp(data.claims.exp, 0).ok_or(TokenError::ExpiryOutOfRange(data.claims.exp))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use jsonwebtoken::{EncodingKey, Header};
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Claims {
        exp: i64,
        user_id: &'static str,
    }

    /// An HS256 token expiring at `exp` (seconds since epoch).
    pub(crate) fn token_expiring_at(exp: i64) -> String {
        jsonwebtoken::encode(
            &Header::default(),
            &Claims {
                exp,
                user_id: "6f1c2d4e-0c8b-4f43-8d7e-2a9b5e7c1d00",
            },
            &EncodingKey::from_secret(b"backend-signing-key"),
        )
        .unwrap()
    }

    #[test]
    fn test_reads_expiry_without_key() {
        let token = token_expiring_at(1_900_000_000);
        let expiry = access_token_expiry(&token).unwrap();
        assert_eq!(expiry.timestamp(), 1_900_000_000);
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let token = token_expiring_at(1_000);
        assert_eq!(access_token_expiry(&token).unwrap().timestamp(), 1_000);
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            access_token_expiry("not-a-jwt"),
            Err(TokenError::Malformed(_))
        ));
        assert!(access_token_expiry("").is_err());
    }

    #[test]
    fn test_missing_exp_is_malformed() {
        #[derive(Serialize)]
        struct NoExp {
            sub: &'static str,
        }
        let token = jsonwebtoken::encode(
            &Header::default(),
            &NoExp { sub: "someone" },
            &EncodingKey::from_secret(b"k"),
        )
        .unwrap();
        assert!(matches!(
            access_token_expiry(&token),
            Err(TokenError::Malformed(_))
        ));
    }
}
