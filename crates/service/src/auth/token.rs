//! RS512 access and refresh tokens.
//!
//! Both kinds share a key pair and differ only in `aud` and lifetime. Expiry is checked
//! against the injected [`Clock`] rather than the library's wall-clock check, so tests can
//! age tokens deterministically.

use std::fmt;
use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Access,
    Refresh,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Access => "access",
            Audience::Refresh => "refresh",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl TokenClaims {
    pub fn subject(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed)
    }
}

/// Why a token was refused. Signing and key errors are the only non-caller faults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("bad signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("issuer mismatch")]
    InvalidIssuer,
    #[error("audience mismatch")]
    InvalidAudience,
    #[error("algorithm not allowed")]
    InvalidAlgorithm,
    #[error("invalid key: {0}")]
    Key(String),
    #[error("signing failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
            ErrorKind::InvalidAudience => TokenError::InvalidAudience,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => TokenError::InvalidAlgorithm,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub issuer: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { issuer: "toolydooly-app".into(), access_ttl_secs: 15 * 60, refresh_ttl_secs: 7 * 24 * 60 * 60 }
    }
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    cfg: TokenConfig,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Build from PEM-encoded RSA keys (PKCS#1 or PKCS#8 private, SPKI public).
    pub fn from_pem(private_pem: &[u8], public_pem: &[u8], cfg: TokenConfig, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        let encoding = EncodingKey::from_rsa_pem(private_pem).map_err(|e| TokenError::Key(e.to_string()))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem).map_err(|e| TokenError::Key(e.to_string()))?;
        Ok(Self { encoding, decoding, cfg, clock })
    }

    pub fn sign_access(&self, uid: Uuid) -> Result<String, TokenError> {
        self.sign(uid, Audience::Access, self.cfg.access_ttl_secs)
    }

    pub fn sign_refresh(&self, uid: Uuid) -> Result<String, TokenError> {
        self.sign(uid, Audience::Refresh, self.cfg.refresh_ttl_secs)
    }

    fn sign(&self, uid: Uuid, aud: Audience, ttl: i64) -> Result<String, TokenError> {
        let iat = self.clock.now().timestamp();
        let claims = TokenClaims {
            sub: uid.to_string(),
            iat,
            exp: iat + ttl,
            iss: self.cfg.issuer.clone(),
            aud: aud.as_str().to_string(),
        };
        encode(&Header::new(Algorithm::RS512), &claims, &self.encoding).map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature, algorithm, issuer, audience and expiry. Never panics on garbage input.
    pub fn verify(&self, token: &str, aud: Audience) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::RS512);
        validation.set_issuer(&[self.cfg.issuer.as_str()]);
        validation.set_audience(&[aud.as_str()]);
        validation.set_required_spec_claims(&["sub", "iat", "exp", "iss", "aud"]);
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<TokenClaims>(token, &self.decoding, &validation)?;
        if data.claims.exp <= self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::Duration;

    const PRIVATE: &str = include_str!("../../tests/fixtures/jwt_private.pem");
    const PUBLIC: &str = include_str!("../../tests/fixtures/jwt_public.pem");
    const OTHER_PRIVATE: &str = include_str!("../../tests/fixtures/other_private.pem");

    fn service(clock: Arc<ManualClock>) -> TokenService {
        TokenService::from_pem(PRIVATE.as_bytes(), PUBLIC.as_bytes(), TokenConfig::default(), clock).unwrap()
    }

    #[test]
    fn access_token_carries_expected_claims() {
        let clock = Arc::new(ManualClock::default());
        let svc = service(clock.clone());
        let uid = Uuid::new_v4();
        let claims = svc.verify(&svc.sign_access(uid).unwrap(), Audience::Access).unwrap();
        assert_eq!(claims.subject().unwrap(), uid);
        assert_eq!(claims.iss, "toolydooly-app");
        assert_eq!(claims.aud, "access");
        assert_eq!(claims.iat, clock.now().timestamp());
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn audiences_do_not_cross() {
        let svc = service(Arc::new(ManualClock::default()));
        let uid = Uuid::new_v4();
        let access = svc.sign_access(uid).unwrap();
        let refresh = svc.sign_refresh(uid).unwrap();
        assert_eq!(svc.verify(&access, Audience::Refresh), Err(TokenError::InvalidAudience));
        assert_eq!(svc.verify(&refresh, Audience::Access), Err(TokenError::InvalidAudience));
        assert!(svc.verify(&refresh, Audience::Refresh).is_ok());
    }

    #[test]
    fn expiry_follows_the_clock() {
        let clock = Arc::new(ManualClock::default());
        let svc = service(clock.clone());
        let access = svc.sign_access(Uuid::new_v4()).unwrap();
        clock.advance(Duration::seconds(899));
        assert!(svc.verify(&access, Audience::Access).is_ok());
        clock.advance(Duration::seconds(1));
        assert_eq!(svc.verify(&access, Audience::Access), Err(TokenError::Expired));

        let refresh = svc.sign_refresh(Uuid::new_v4()).unwrap();
        clock.advance(Duration::days(7));
        assert_eq!(svc.verify(&refresh, Audience::Refresh), Err(TokenError::Expired));
    }

    #[test]
    fn foreign_key_signature_is_rejected() {
        let clock = Arc::new(ManualClock::default());
        let svc = service(clock.clone());
        let forger = TokenService::from_pem(OTHER_PRIVATE.as_bytes(), PUBLIC.as_bytes(), TokenConfig::default(), clock).unwrap();
        let forged = forger.sign_access(Uuid::new_v4()).unwrap();
        assert_eq!(svc.verify(&forged, Audience::Access), Err(TokenError::BadSignature));
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let clock = Arc::new(ManualClock::default());
        let cfg = TokenConfig { issuer: "someone-else".into(), ..TokenConfig::default() };
        let other = TokenService::from_pem(PRIVATE.as_bytes(), PUBLIC.as_bytes(), cfg, clock.clone()).unwrap();
        let token = other.sign_access(Uuid::new_v4()).unwrap();
        assert_eq!(service(clock).verify(&token, Audience::Access), Err(TokenError::InvalidIssuer));
    }

    #[test]
    fn algorithm_substitution_is_rejected() {
        let clock = Arc::new(ManualClock::default());
        let svc = service(clock.clone());
        let iat = clock.now().timestamp();
        let claims = TokenClaims { sub: Uuid::new_v4().to_string(), iat, exp: iat + 900, iss: "toolydooly-app".into(), aud: "access".into() };

        // HMAC keyed with the public key bytes.
        let hs = encode(&Header::new(Algorithm::HS512), &claims, &EncodingKey::from_secret(PUBLIC.as_bytes())).unwrap();
        assert_eq!(svc.verify(&hs, Audience::Access), Err(TokenError::InvalidAlgorithm));

        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let unsigned = format!("{header}.{payload}.");
        assert!(svc.verify(&unsigned, Audience::Access).is_err());
    }

    #[test]
    fn garbage_never_panics() {
        let svc = service(Arc::new(ManualClock::default()));
        for input in ["", ".", "..", "a.b.c", "not a token", "eyJhbGciOiJSUzUxMiJ9.e30.AAAA"] {
            assert!(svc.verify(input, Audience::Access).is_err(), "accepted {input:?}");
        }
    }
}
