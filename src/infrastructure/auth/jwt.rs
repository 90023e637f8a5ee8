use crate::core::errors::TrackerError;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Claims carried by an identity token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and checks HS256 identity tokens.
pub struct IdTokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl IdTokenSigner {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        IdTokenSigner {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, uid: &str, email: &str) -> Result<String, TrackerError> {
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| TrackerError::InternalServerError(format!("Token lifetime out of range: {}", e)))?;
        let now = Utc::now();
        let claims = Claims {
            sub: uid.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TrackerError::InternalServerError(format!("Token encoding error: {}", e)))
    }

    /// Expired or tampered tokens are `Unauthenticated`.
    pub fn verify(&self, token: &str) -> Result<Claims, TrackerError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| TrackerError::Unauthenticated(format!("Invalid identity token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_verify_with_the_issuing_secret_only() {
        let signer = IdTokenSigner::new("s3cret", Duration::from_secs(3600));
        let token = signer.issue("u1", "u1@example.com").unwrap();

        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email, "u1@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);

        let other = IdTokenSigner::new("different", Duration::from_secs(3600));
        assert!(matches!(other.verify(&token), Err(TrackerError::Unauthenticated(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        let signer = IdTokenSigner::new("s3cret", Duration::from_secs(60));
        assert!(matches!(signer.verify("not.a.token"), Err(TrackerError::Unauthenticated(_))));
    }
}
