//! Stateless signed bearer tokens.
//!
//! Tokens are two base64url segments, `claims.signature`, where the
//! signature is an HMAC-SHA256 over the encoded claims segment computed with
//! the server-held secret. Validity is re-derived on every use from the
//! signature and the current time; nothing is tracked server-side, so expiry
//! is the only invalidation mechanism (accepted limitation, no revocation
//! list).

use crate::clock::SharedClock;
use crate::error::TokenError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Claims embedded in an issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject identity
    pub sub: String,
    /// Role names granted at issuance
    pub roles: Vec<String>,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expires-at, unix seconds
    pub exp: i64,
}

/// Issues and validates signed, time-bounded bearer tokens.
pub struct TokenService {
    secret: Vec<u8>,
    clock: SharedClock,
}

impl TokenService {
    pub fn new(secret: &str, clock: SharedClock) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            clock,
        }
    }

    /// Issue a token for `subject` carrying `roles`, valid for `ttl`.
    pub fn issue(&self, subject: &str, roles: &[String], ttl: Duration) -> String {
        let now = self.clock.now();
        let claims = TokenClaims {
            sub: subject.to_string(),
            roles: roles.to_vec(),
            iat: now.timestamp(),
            exp: now.timestamp() + ttl.as_secs() as i64,
        };

        // TokenClaims has no non-string keys or non-finite numbers, so
        // serialization cannot fail.
        let claims_json = serde_json::to_vec(&claims).unwrap_or_default();
        let claims_segment = URL_SAFE_NO_PAD.encode(claims_json);
        let signature = self.sign(claims_segment.as_bytes());

        format!("{}.{}", claims_segment, URL_SAFE_NO_PAD.encode(signature))
    }

    /// Validate a presented token string and return its claims.
    ///
    /// The signature is verified before the claims segment is parsed;
    /// nothing inside an unverified token is ever trusted.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let (claims_segment, signature_segment) =
            token.split_once('.').ok_or(TokenError::Malformed)?;
        if claims_segment.is_empty() || signature_segment.contains('.') {
            return Err(TokenError::Malformed);
        }

        let provided = URL_SAFE_NO_PAD
            .decode(signature_segment)
            .map_err(|_| TokenError::Malformed)?;

        let expected = self.sign(claims_segment.as_bytes());
        if expected.ct_eq(&provided).unwrap_u8() != 1 {
            return Err(TokenError::BadSignature);
        }

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims_segment)
            .map_err(|_| TokenError::Malformed)?;
        let claims: TokenClaims =
            serde_json::from_slice(&claims_json).map_err(|_| TokenError::Malformed)?;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn service_at_epoch() -> (TokenService, std::sync::Arc<ManualClock>) {
        let clock = ManualClock::starting_at(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
        let service = TokenService::new("test-secret", clock.clone());
        (service, clock)
    }

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_issue_validate_roundtrip() {
        let (service, _clock) = service_at_epoch();
        let token = service.issue(
            "alice",
            &roles(&["fraud_analyst"]),
            Duration::from_secs(1800),
        );

        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.roles, roles(&["fraud_analyst"]));
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn test_valid_until_expiry_then_expired() {
        let (service, clock) = service_at_epoch();
        let token = service.issue("alice", &roles(&["viewer"]), Duration::from_secs(60));

        clock.advance(chrono::Duration::seconds(59));
        assert!(service.validate(&token).is_ok());

        // Validity ends exactly at issued-at + ttl
        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(service.validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let (service, _clock) = service_at_epoch();
        let token = service.issue("alice", &roles(&["admin"]), Duration::from_secs(60));

        let dot = token.find('.').unwrap();
        let mut bytes = token.into_bytes();
        bytes[dot + 1] = if bytes[dot + 1] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert_eq!(service.validate(&tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_tampered_claims_rejected_before_parsing() {
        let (service, _clock) = service_at_epoch();
        let token = service.issue("alice", &roles(&["viewer"]), Duration::from_secs(60));

        // Swap in a claims segment granting admin; the signature no longer
        // matches, so the forged roles are never read.
        let forged_claims = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&TokenClaims {
                sub: "alice".to_string(),
                roles: roles(&["admin"]),
                iat: 0,
                exp: i64::MAX,
            })
            .unwrap(),
        );
        let signature = token.split_once('.').unwrap().1;
        let forged = format!("{}.{}", forged_claims, signature);

        assert_eq!(service.validate(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (service, _clock) = service_at_epoch();
        let clock = ManualClock::starting_at(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
        let other = TokenService::new("other-secret", clock);

        let token = other.issue("alice", &roles(&["admin"]), Duration::from_secs(60));
        assert_eq!(service.validate(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let (service, _clock) = service_at_epoch();

        for garbage in ["", "no-dot", "a.b.c", "!!!.???", ".signature-only"] {
            assert_eq!(
                service.validate(garbage),
                Err(TokenError::Malformed),
                "expected Malformed for {:?}",
                garbage
            );
        }
    }
}
