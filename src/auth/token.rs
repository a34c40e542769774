//! Short-lived bearer tokens
//!
//! Every call to the LPA store carries an HS256 JWT asserting the
//! fixtures' service identity, sent as `X-Jwt-Authorization: Bearer <token>`
//! alongside any AWS signature. Tokens are minted fresh per request and
//! never verified by the issuer; expiry is the receiving side's job.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::errors::{FixtureError, Result};

/// Issuer claim identifying this system to the store
pub const ISSUER: &str = "opg.poas.sirius";

/// Subject used when the caller does not supply one
pub const DEFAULT_SUBJECT: &str = "someone@someplace.somewhere.com";

/// Claims carried by every issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub sub: String,
}

/// Validity window policy for issued tokens
///
/// `ttl` runs forward from the time of issue; `backdate` pushes the
/// issued-at claim into the past, so the verifier accepts the token over
/// `now - backdate .. now + ttl`. Both are explicit values rather than
/// constants because the window has changed over this module's history
/// and either policy must stay selectable without code changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    pub ttl: Duration,
    pub backdate: Duration,
}

impl TokenPolicy {
    /// Current production policy: five minutes forward from now
    pub fn forward_window() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            backdate: Duration::ZERO,
        }
    }

    /// Historical policy: a 65-minute window either side of now,
    /// tolerating clock skew between issuer and verifier
    pub fn straddling_window() -> Self {
        Self {
            ttl: Duration::from_secs(65 * 60),
            backdate: Duration::from_secs(65 * 60),
        }
    }
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self::forward_window()
    }
}

/// Mints signed bearer tokens under a fixed validity policy
#[derive(Debug, Clone, Default)]
pub struct TokenIssuer {
    policy: TokenPolicy,
}

impl TokenIssuer {
    pub fn new(policy: TokenPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    /// Mint a token for `subject`, or the default service identity when omitted
    ///
    /// Fails if the secret is empty; the store would reject the token anyway
    /// and an unsigned token must never leave this module.
    pub fn issue(&self, secret: &str, subject: Option<&str>) -> Result<String> {
        self.issue_at(secret, subject, Utc::now().timestamp())
    }

    /// Mint a token with an explicit "now", for deterministic tests
    pub fn issue_at(&self, secret: &str, subject: Option<&str>, now: i64) -> Result<String> {
        if secret.is_empty() {
            return Err(FixtureError::Token(
                "token signing secret is empty".to_string(),
            ));
        }

        let claims = TokenClaims {
            exp: now + self.policy.ttl.as_secs() as i64,
            iat: now - self.policy.backdate.as_secs() as i64,
            iss: ISSUER.to_string(),
            sub: subject.unwrap_or(DEFAULT_SUBJECT).to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| FixtureError::Token(format!("Failed to sign token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    const SECRET: &str = "mysupersecrettestkeythatis128bits";

    fn decode_claims(token: &str, secret: &str) -> jsonwebtoken::errors::Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        decode::<TokenClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map(|data| data.claims)
    }

    #[test]
    fn default_policy_is_a_five_minute_forward_window() {
        let issuer = TokenIssuer::default();
        let now = 1_700_000_000;

        let token = issuer.issue_at(SECRET, None, now).unwrap();
        let claims = decode_claims(&token, SECRET).unwrap();

        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.sub, DEFAULT_SUBJECT);
        assert_eq!(claims.iat, now);
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn straddling_policy_spans_both_sides_of_now() {
        let issuer = TokenIssuer::new(TokenPolicy::straddling_window());
        let now = 1_700_000_000;

        let token = issuer.issue_at(SECRET, None, now).unwrap();
        let claims = decode_claims(&token, SECRET).unwrap();

        assert_eq!(claims.iat, now - 3900);
        assert_eq!(claims.exp, now + 3900);
    }

    #[test]
    fn explicit_subject_is_preserved() {
        let issuer = TokenIssuer::default();

        let token = issuer
            .issue_at(SECRET, Some("urn:opg:sirius:users:34"), 1_700_000_000)
            .unwrap();
        let claims = decode_claims(&token, SECRET).unwrap();

        assert_eq!(claims.sub, "urn:opg:sirius:users:34");
    }

    #[test]
    fn empty_secret_is_rejected() {
        let issuer = TokenIssuer::default();

        assert!(issuer.issue_at("", None, 1_700_000_000).is_err());
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let issuer = TokenIssuer::default();

        let token = issuer.issue_at(SECRET, None, 1_700_000_000).unwrap();

        assert!(decode_claims(&token, "someothersecret").is_err());
    }
}
