//! Stateless preview tokens binding a confirm call to the previewed bytes.
//!
//! A token is `base64url(JSON{fingerprint, organizationId, issuedAt,
//! signature})`, where the signature is an HMAC-SHA256 over
//! `fingerprint:organizationId:issuedAt` keyed by the server secret. Nothing is
//! stored server-side; a token is checked purely from its own content.
//!
//! Verification runs cheapest check first and hashes the upload only once
//! everything else has passed. Callers only ever learn pass/fail; the reason
//! is logged at debug level.

use crate::config::TokenSecret;
use crate::error::IngestError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Hex SHA-256 of the uploaded bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TokenClaims {
    fingerprint: String,
    organization_id: i64,
    issued_at: i64,
    signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub fingerprint: String,
}

/// Why a token was refused. Kept internal to logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Malformed,
    WrongOrganization,
    Expired,
    BadSignature,
    ContentMismatch,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::Malformed => "malformed token",
            Rejection::WrongOrganization => "token issued to another organization",
            Rejection::Expired => "token expired",
            Rejection::BadSignature => "signature mismatch",
            Rejection::ContentMismatch => "content fingerprint mismatch",
        };
        f.write_str(reason)
    }
}

#[derive(Clone, Debug)]
pub struct IntegrityTokens {
    secret: TokenSecret,
    ttl_ms: i64,
}

impl IntegrityTokens {
    pub fn new(secret: TokenSecret, ttl_ms: i64) -> Self {
        Self { secret, ttl_ms }
    }

    fn mac(&self, fingerprint: &str, org_id: i64, issued_at: i64) -> Result<HmacSha256, InvalidLength> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.secret.as_bytes())?;
        mac.update(format!("{}:{}:{}", fingerprint, org_id, issued_at).as_bytes());
        Ok(mac)
    }

    pub fn issue(&self, bytes: &[u8], org_id: i64) -> Result<IssuedToken, IngestError> {
        self.issue_at(bytes, org_id, Utc::now().timestamp_millis())
    }

    pub fn issue_at(&self, bytes: &[u8], org_id: i64, now_ms: i64) -> Result<IssuedToken, IngestError> {
        let fingerprint = fingerprint(bytes);
        let signature = self
            .mac(&fingerprint, org_id, now_ms)
            .map_err(|e| IngestError::Internal(format!("token signing failed: {}", e)))?
            .finalize()
            .into_bytes();
        let claims = TokenClaims {
            fingerprint: fingerprint.clone(),
            organization_id: org_id,
            issued_at: now_ms,
            signature: URL_SAFE_NO_PAD.encode(signature),
        };
        let json = serde_json::to_vec(&claims)
            .map_err(|e| IngestError::Internal(format!("token encoding failed: {}", e)))?;
        Ok(IssuedToken {
            token: URL_SAFE_NO_PAD.encode(json),
            fingerprint,
        })
    }

    pub fn verify(&self, token: &str, bytes: &[u8], org_id: i64) -> bool {
        self.verify_at(token, bytes, org_id, Utc::now().timestamp_millis())
    }

    pub fn verify_at(&self, token: &str, bytes: &[u8], org_id: i64, now_ms: i64) -> bool {
        match self.check(token, bytes, org_id, now_ms) {
            Ok(()) => true,
            Err(reason) => {
                debug!("Preview token refused for org {}: {}", org_id, reason);
                false
            }
        }
    }

    /// Ordered checks: decode, organization, expiry, signature, content.
    pub fn check(&self, token: &str, bytes: &[u8], org_id: i64, now_ms: i64) -> Result<(), Rejection> {
        let raw = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| Rejection::Malformed)?;
        let claims: TokenClaims =
            serde_json::from_slice(&raw).map_err(|_| Rejection::Malformed)?;

        if claims.organization_id != org_id {
            return Err(Rejection::WrongOrganization);
        }

        if now_ms.saturating_sub(claims.issued_at) > self.ttl_ms {
            return Err(Rejection::Expired);
        }

        let provided = URL_SAFE_NO_PAD
            .decode(&claims.signature)
            .map_err(|_| Rejection::BadSignature)?;
        self.mac(&claims.fingerprint, claims.organization_id, claims.issued_at)
            .map_err(|_| Rejection::BadSignature)?
            .verify_slice(&provided)
            .map_err(|_| Rejection::BadSignature)?;

        if fingerprint(bytes) != claims.fingerprint {
            return Err(Rejection::ContentMismatch);
        }

        Ok(())
    }
}
