//! Signed token creation and verification.
//!
//! Tokens are three dot-separated base64url segments (header, claims,
//! signature) signed with a shared secret using the HMAC-SHA family. The API
//! holds the secret and runs [`TokenCodec::verify`]; the web tier only relays
//! tokens and reads them through [`decode_claims_unverified`].

use std::borrow::Cow;
use std::str::FromStr;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{crypto, encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::identity::{Identity, SessionUser};
use crate::config::TokenConfig;

const TOKEN_SUBJECT: &str = "User JWT";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("empty token")]
    EmptyToken,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("unexpected signing method: {0}")]
    UnexpectedSigningMethod(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    ExpiredToken,

    #[error("invalid token claims: {0}")]
    InvalidClaims(String),

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("token lifetime out of range")]
    LifetimeOutOfRange,
}

/// Claims payload embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user: Identity,
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }
}

/// Claims decoded without any signature check.
///
/// Exposes only what the web tier needs for display and session expiry.
#[derive(Debug, Clone)]
pub struct UnverifiedClaims(Claims);

impl UnverifiedClaims {
    pub fn expires_at(&self) -> i64 {
        self.0.exp
    }

    pub fn issuer(&self) -> &str {
        &self.0.iss
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    /// A token whose `exp` equals `now` is already expired.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.0.is_expired_at(now)
    }

    pub fn session_user(&self) -> SessionUser {
        let user = &self.0.user;
        SessionUser {
            id: user.id(),
            name: user.name().to_string(),
            roles: user.roles().clone(),
        }
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Creates and verifies tokens with a process-lifetime signing key.
#[derive(Clone)]
pub struct TokenCodec {
    issuer: String,
    valid_for: Duration,
    valid_secs: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("valid_for", &self.valid_for)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(signing_key: &str, issuer: impl Into<String>, valid_for: Duration) -> Result<Self, TokenError> {
        if signing_key.is_empty() {
            return Err(TokenError::Signing("signing key not configured".to_string()));
        }

        let valid_secs = i64::try_from(valid_for.as_secs()).map_err(|_| TokenError::LifetimeOutOfRange)?;

        Ok(Self {
            issuer: issuer.into(),
            valid_for,
            valid_secs,
            encoding_key: EncodingKey::from_secret(signing_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing_key.as_bytes()),
        })
    }

    pub fn from_config(config: &TokenConfig) -> Result<Self, TokenError> {
        let valid_for = config.valid_duration().ok_or(TokenError::LifetimeOutOfRange)?;
        Self::new(&config.signing_key, config.issuer.clone(), valid_for)
    }

    pub fn valid_for(&self) -> Duration {
        self.valid_for
    }

    pub fn create(&self, identity: &Identity) -> Result<String, TokenError> {
        self.create_at(identity, Utc::now().timestamp())
    }

    pub fn create_at(&self, identity: &Identity, now: i64) -> Result<String, TokenError> {
        let claims = Claims {
            user: identity.clone(),
            sub: TOKEN_SUBJECT.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now.checked_add(self.valid_secs).ok_or(TokenError::LifetimeOutOfRange)?,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<(), TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Result<(), TokenError> {
        self.decode_claims_at(token, now).map(|_| ())
    }

    /// Verifies the token and returns its claims.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_claims_at(token, Utc::now().timestamp())
    }

    pub fn decode_claims_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let (header, payload, signature) = split_token(token)?;

        let raw_header: RawHeader = serde_json::from_slice(&decode_segment(header)?)
            .map_err(|e| TokenError::MalformedToken(format!("header: {}", e)))?;
        let algorithm = hmac_algorithm(&raw_header.alg)?;

        let payload_bytes = decode_segment(payload)?;

        let message = &token[..header.len() + 1 + payload.len()];
        match crypto::verify(signature, message.as_bytes(), &self.decoding_key, algorithm) {
            Ok(true) => {}
            Ok(false) | Err(_) => return Err(TokenError::InvalidSignature),
        }

        let claims: Claims = serde_json::from_slice(&payload_bytes)
            .map_err(|e| TokenError::InvalidClaims(e.to_string()))?;

        if claims.is_expired_at(now) {
            return Err(TokenError::ExpiredToken);
        }

        Ok(claims)
    }

    /// Verified path used by the API: signature and expiry checked, identity returned.
    pub fn identity(&self, token: &str) -> Result<Identity, TokenError> {
        self.decode_claims(token).map(|claims| claims.user)
    }
}

/// Reads the claims segment with no cryptographic check at all.
///
/// Callers must not base authorization decisions on the result.
pub fn decode_claims_unverified(token: &str) -> Result<UnverifiedClaims, TokenError> {
    let (_, payload, _) = split_token(token)?;
    let claims = serde_json::from_slice(&decode_segment(payload)?)
        .map_err(|e| TokenError::InvalidClaims(e.to_string()))?;
    Ok(UnverifiedClaims(claims))
}

fn split_token(token: &str) -> Result<(&str, &str, &str), TokenError> {
    if token.is_empty() {
        return Err(TokenError::EmptyToken);
    }

    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => Ok((header, payload, signature)),
        _ => Err(TokenError::MalformedToken("expected three segments".to_string())),
    }
}

/// Only the HMAC-SHA family is accepted; anything else is refused before the key is used.
fn hmac_algorithm(alg: &str) -> Result<Algorithm, TokenError> {
    match alg {
        "HS256" | "HS384" | "HS512" => Algorithm::from_str(alg)
            .map_err(|_| TokenError::UnexpectedSigningMethod(alg.to_string())),
        other => Err(TokenError::UnexpectedSigningMethod(other.to_string())),
    }
}

/// Decodes an unpadded base64url segment, restoring `=` padding first.
fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    if segment.is_empty() {
        return Err(TokenError::MalformedToken("empty segment".to_string()));
    }

    let padded: Cow<'_, str> = match segment.len() % 4 {
        0 => Cow::Borrowed(segment),
        2 => Cow::Owned(format!("{}==", segment)),
        3 => Cow::Owned(format!("{}=", segment)),
        _ => {
            return Err(TokenError::MalformedToken(
                "segment length is not valid base64".to_string(),
            ))
        }
    };

    URL_SAFE
        .decode(padded.as_bytes())
        .map_err(|e| TokenError::MalformedToken(format!("base64: {}", e)))
}
