//! Signed, time-limited bearer tokens.
//!
//! Tokens use the compact JWT shape with HS256:
//! `base64url(header).base64url(claims).base64url(HMAC-SHA256(secret, header.claims))`.
//!
//! Every way a token can be wrong (shape, encoding, signature, claims, expiry) collapses to
//! [`AccountError::Unauthenticated`] so callers cannot tell which check failed.

use crate::account::{Account, Role};
use crate::config::CoreConfig;
use crate::{AccountError, AccountId, AccountResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Claims carried by a bearer token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Account id.
    pub sub: AccountId,
    pub role: Role,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// A freshly issued token and the instant it stops being accepted.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies bearer tokens with a single HMAC key.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            secret: cfg.token_secret().to_vec(),
            ttl: cfg.token_ttl(),
        }
    }

    /// Issues a token for `account` that expires one lifetime after `now`.
    pub fn issue_at(&self, account: &Account, now: DateTime<Utc>) -> AccountResult<IssuedToken> {
        let expires_at = now + self.ttl;
        let claims = TokenClaims {
            sub: account.id.clone(),
            role: account.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let header = TokenHeader {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };
        let header_json = serde_json::to_vec(&header).map_err(AccountError::Serialization)?;
        let claims_json = serde_json::to_vec(&claims).map_err(AccountError::Serialization)?;

        let message = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = self.mac(message.as_bytes())?.finalize().into_bytes();

        Ok(IssuedToken {
            token: format!("{}.{}", message, URL_SAFE_NO_PAD.encode(signature)),
            expires_at,
        })
    }

    pub fn issue(&self, account: &Account) -> AccountResult<IssuedToken> {
        self.issue_at(account, Utc::now())
    }

    /// Verifies signature and expiry as of `now` and returns the claims.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> AccountResult<TokenClaims> {
        let mut parts = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AccountError::Unauthenticated);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AccountError::Unauthenticated)?;

        let mut mac = self.mac(header.as_bytes())?;
        mac.update(b".");
        mac.update(claims.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AccountError::Unauthenticated)?;

        let header_json = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|_| AccountError::Unauthenticated)?;
        let header: TokenHeader =
            serde_json::from_slice(&header_json).map_err(|_| AccountError::Unauthenticated)?;
        if header.alg != "HS256" {
            return Err(AccountError::Unauthenticated);
        }

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|_| AccountError::Unauthenticated)?;
        let claims: TokenClaims =
            serde_json::from_slice(&claims_json).map_err(|_| AccountError::Unauthenticated)?;

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(AccountError::Unauthenticated)?;
        if expires_at <= now {
            return Err(AccountError::Unauthenticated);
        }

        Ok(claims)
    }

    pub fn verify(&self, token: &str) -> AccountResult<TokenClaims> {
        self.verify_at(token, Utc::now())
    }

    fn mac(&self, data: &[u8]) -> AccountResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AccountError::Crypto(e.to_string()))?;
        mac.update(data);
        Ok(mac)
    }
}
