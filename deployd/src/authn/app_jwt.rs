//! GitHub App JWT signing

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::errors::AgentError;

/// Backdated to absorb clock drift between us and GitHub
const ISSUED_AT_SKEW_SECS: i64 = 60;

/// GitHub rejects app tokens living longer than ten minutes
const LIFETIME_SECS: i64 = 9 * 60;

/// Claims GitHub expects in an app JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppClaims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Signs short-lived RS256 JWTs identifying the GitHub App
pub struct AppJwtSigner {
    app_id: u64,
    key: EncodingKey,
}

impl AppJwtSigner {
    /// Build a signer from a PEM encoded RSA private key
    pub fn from_pem(app_id: u64, pem: &[u8]) -> Result<Self, AgentError> {
        let key = EncodingKey::from_rsa_pem(pem)
            .map_err(|e| AgentError::AuthError(format!("Invalid app private key: {}", e)))?;
        Ok(Self { app_id, key })
    }

    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    /// Sign a token valid from now
    pub fn sign(&self) -> Result<String, AgentError> {
        self.sign_at(Utc::now())
    }

    /// Sign a token as if issued at `now`
    pub fn sign_at(&self, now: DateTime<Utc>) -> Result<String, AgentError> {
        let claims = AppClaims {
            iat: (now - Duration::seconds(ISSUED_AT_SKEW_SECS)).timestamp(),
            exp: (now + Duration::seconds(LIFETIME_SECS)).timestamp(),
            iss: self.app_id.to_string(),
        };
        let token = encode(&Header::new(Algorithm::RS256), &claims, &self.key)?;
        Ok(token)
    }
}
