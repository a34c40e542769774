//! Bearer token verification
//!
//! Mirror of the store side of the token contract: HS256 signature over
//! the shared secret, expiry in the future, issued-at not in the future,
//! issuer on the allow-list and a subject that identifies a real actor
//! (a URN, or an email address for sirius-issued tokens).

use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use once_cell::sync::Lazy;
use regex::Regex;

use super::token::TokenClaims;
use crate::errors::{FixtureError, Result};

/// Issuers the store accepts tokens from
pub const VALID_ISSUERS: [&str; 2] = ["opg.poas.sirius", "opg.poas.makeregister"];

/// Header carrying the bearer token on every outbound request
pub const TOKEN_HEADER: &str = "X-Jwt-Authorization";

static URN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^urn:[a-zA-Z0-9][a-zA-Z0-9-]{0,31}:\S+$").unwrap());

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .unwrap()
});

/// Verifies tokens minted with the shared secret
#[derive(Clone)]
pub struct TokenVerifier {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Verify a token taken from an `X-Jwt-Authorization` header value
    ///
    /// Strips the `Bearer ` prefix before verification.
    pub fn verify_header(&self, header_value: &str) -> Result<TokenClaims> {
        let token = header_value
            .strip_prefix("Bearer")
            .map(str::trim_start)
            .ok_or_else(|| {
                FixtureError::Token(format!("Invalid {} header", TOKEN_HEADER))
            })?;

        self.verify(token)
    }

    /// Verify a bare token string and return its claims
    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&VALID_ISSUERS);
        // iat presence is enforced by the claims type itself
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let claims = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map_err(|e| FixtureError::Token(format!("Invalid JWT: {}", e)))?
        .claims;

        if claims.iat > Utc::now().timestamp() {
            return Err(FixtureError::Token(
                "IssuedAt must not be in the future".to_string(),
            ));
        }

        validate_subject(&claims)?;

        Ok(claims)
    }
}

/// Subject must be a URN, or additionally an email address when issued by sirius
fn validate_subject(claims: &TokenClaims) -> Result<()> {
    if URN_RE.is_match(&claims.sub) {
        return Ok(());
    }

    match claims.iss.as_str() {
        "opg.poas.sirius" if EMAIL_RE.is_match(&claims.sub) => Ok(()),
        "opg.poas.sirius" => Err(FixtureError::Token(
            "Subject is not a valid email or URN".to_string(),
        )),
        _ => Err(FixtureError::Token("Subject is not a valid URN".to_string())),
    }
}
