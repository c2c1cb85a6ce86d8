//! HS256 token verification.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::Value;
use thiserror::Error;

use crate::config::JwtConfig;
use crate::token::claims::{Claims, TokenCategory};

/// Why a token was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("expected a {expected:?} token, got {actual:?}")]
    WrongCategory {
        expected: TokenCategory,
        actual: TokenCategory,
    },

    #[error("token has no `{0}` claim")]
    MissingClaim(String),

    #[error("token could not be signed: {0}")]
    Signing(String),
}

impl TokenError {
    /// Expiry is the only failure the reissue flow can recover from.
    pub fn is_expired(&self) -> bool {
        matches!(self, TokenError::Expired)
    }
}

/// Verifies (and, for tooling, signs) tokens with a shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS256)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Create a codec for HS256 tokens signed with `secret`.
    pub fn new(secret: &str, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256];
        validation.leeway = leeway_secs;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(&config.secret, config.leeway_secs)
    }

    /// Verify a token of any category.
    ///
    /// Signature and structure are checked before expiry, so a malformed or
    /// badly signed token is never reported as merely expired.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(classify)
    }

    /// Verify a token and require it to be an access token.
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.category != TokenCategory::Access {
            return Err(TokenError::WrongCategory {
                expected: TokenCategory::Access,
                actual: claims.category,
            });
        }
        Ok(claims)
    }

    /// Read a single claim from a verified token.
    pub fn claim(&self, token: &str, name: &str) -> Result<Value, TokenError> {
        self.verify(token)?
            .claim(name)
            .ok_or_else(|| TokenError::MissingClaim(name.to_string()))
    }

    /// Sign a claim set. Used by tooling and tests; the request path only verifies.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName => TokenError::InvalidSignature,
        ErrorKind::MissingRequiredClaim(claim) => TokenError::MissingClaim(claim.clone()),
        _ => TokenError::Malformed(err.to_string()),
    }
}
