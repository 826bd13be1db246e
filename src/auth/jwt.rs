use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::config::JwtConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signing secret is not configured")]
    Signing,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("token subject is not a user id")]
    InvalidSubject,
    #[error("token rejected: {0}")]
    Rejected(String),
}

/// Registered JWT claims carried by every bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user ID
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl Claims {
    /// A subject that is not a user id is the caller's fault, never ours.
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.sub.parse().map_err(|_| TokenError::InvalidSubject)
    }
}

/// HS256 signing and verification keys plus the claim policy they enforce.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    has_secret: bool,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            has_secret: !cfg.secret.is_empty(),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_hours.max(0) as u64) * 3600),
        }
    }

    /// Claims for `user_id` valid from now until now + ttl.
    pub fn claims_for(&self, user_id: i64) -> Claims {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Claims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            nbf: now,
            exp: now + self.ttl.as_secs() as i64,
        }
    }

    pub fn sign(&self, user_id: i64) -> Result<String, TokenError> {
        self.sign_claims(&self.claims_for(user_id))
    }

    pub fn sign_claims(&self, claims: &Claims) -> Result<String, TokenError> {
        if !self.has_secret {
            return Err(TokenError::Signing);
        }
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|_| TokenError::Signing)?;
        debug!(sub = %claims.sub, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);
        validation.validate_nbf = true;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => TokenError::Malformed,
                other => TokenError::Rejected(format!("{:?}", other)),
            }
        })?;
        debug!(sub = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_hours: 72,
        })
    }

    #[test]
    fn sign_and_verify_token() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let token = keys.sign(42).expect("sign");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.user_id(), Ok(42));
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 72 * 3600);
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let mut claims = keys.claims_for(7);
        claims.iat -= 120;
        claims.nbf -= 120;
        claims.exp = claims.iat + 1;
        let token = keys.sign_claims(&claims).expect("sign");
        assert_eq!(keys.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn short_lived_token_is_valid_before_expiry() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let mut claims = keys.claims_for(7);
        claims.exp = claims.iat + 30;
        let token = keys.sign_claims(&claims).expect("sign");
        assert!(keys.verify(&token).is_ok());
    }

    #[test]
    fn signature_from_other_secret_is_invalid() {
        let good = make_keys("secret-a", "iss", "aud");
        let bad = make_keys("secret-b", "iss", "aud");
        let token = good.sign(1).expect("sign");
        assert_eq!(bad.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn wrong_issuer_or_audience_is_rejected() {
        let good = make_keys("same-secret", "good-iss", "good-aud");
        let bad = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good.sign(1).expect("sign");
        assert!(matches!(bad.verify(&token), Err(TokenError::Rejected(_))));
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert_eq!(keys.verify("not.a.jwt"), Err(TokenError::Malformed));
        assert_eq!(keys.verify("garbage"), Err(TokenError::Malformed));
    }

    #[test]
    fn unset_secret_fails_signing() {
        let keys = make_keys("", "iss", "aud");
        assert_eq!(keys.sign(1), Err(TokenError::Signing));
    }

    #[test]
    fn non_numeric_subject_is_invalid_subject() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let mut claims = keys.claims_for(1);
        claims.sub = "alice".into();
        let token = keys.sign_claims(&claims).expect("sign");
        let decoded = keys.verify(&token).expect("signature is fine");
        assert_eq!(decoded.user_id(), Err(TokenError::InvalidSubject));
    }
}
