//! Credential codec
//!
//! Issues and verifies the signed, time-bounded bearer credentials handed out
//! after a successful sign-in. Credentials are stateless HS256 JWTs: nothing is
//! stored server side and verification depends only on the token, the current
//! time and the signing secret.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use std::fmt;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use super::models::{Claims, TokenDetails};

pub const ISSUER: &str = "social-auth-api";
pub const AUDIENCE: &str = "social-auth-api-users";

/// Only the HMAC family is ever accepted. Anything else is an algorithm confusion attempt.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("failed to sign credential: {0}")]
    SigningFailure(String),

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("bad signature or unexpected signing algorithm")]
    BadSignature,

    #[error("credential expired")]
    Expired,

    #[error("credential not yet valid")]
    NotYetValid,

    #[error("invalid claims: {0}")]
    InvalidClaims(String),
}

impl From<jsonwebtoken::errors::Error> for CredentialError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                CredentialError::BadSignature
            }
            ErrorKind::ExpiredSignature => CredentialError::Expired,
            ErrorKind::ImmatureSignature => CredentialError::NotYetValid,
            ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidSubject
            | ErrorKind::MissingRequiredClaim(_) => CredentialError::InvalidClaims(e.to_string()),
            _ => CredentialError::MalformedToken(e.to_string()),
        }
    }
}

/// A freshly minted credential together with the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub details: TokenDetails,
    pub claims: Claims,
}

pub struct CredentialCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("ttl_minutes", &self.ttl.num_minutes())
            .finish_non_exhaustive()
    }
}

const DEFAULT_TTL_MINUTES: i64 = 60;

impl CredentialCodec {
    /// Out of range lifetimes (non-positive or too large for `Duration`)
    /// fall back to 60 minutes.
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        let ttl = Duration::try_minutes(ttl_minutes)
            .filter(|ttl| *ttl > Duration::zero())
            .unwrap_or_else(|| Duration::minutes(DEFAULT_TTL_MINUTES));

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn mint(
        &self,
        subject: &str,
        email: &str,
        name: &str,
    ) -> Result<IssuedCredential, CredentialError> {
        self.mint_at(subject, email, name, Utc::now())
    }

    /// Mint a credential as if the current time were `now`
    pub fn mint_at(
        &self,
        subject: &str,
        email: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, CredentialError> {
        let issued_at = now.timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            iat: issued_at,
            nbf: issued_at,
            exp: issued_at + self.ttl.num_seconds(),
            jti: Uuid::new_v4().to_string(),
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                error!(error = %e, user_id = %subject, "JWT signing failed");
                CredentialError::SigningFailure(e.to_string())
            })?;

        Ok(IssuedCredential {
            details: TokenDetails {
                access_token,
                refresh_token: Uuid::new_v4().to_string(),
                token_type: "Bearer".to_string(),
                expires_in: self.ttl.num_seconds(),
            },
            claims,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, CredentialError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a credential against the given point in time.
    ///
    /// Time checks run here with zero leeway instead of inside `jsonwebtoken`,
    /// which would consult the system clock.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, CredentialError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "nbf", "sub", "iss", "aud"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)?.claims;

        let now = now.timestamp();
        if claims.exp <= now {
            return Err(CredentialError::Expired);
        }
        if claims.nbf > now {
            return Err(CredentialError::NotYetValid);
        }

        Ok(claims)
    }
}
