//! Environment-sourced configuration
//!
//! Everything the fixtures need at runtime comes from the process
//! environment: the store base URL, the JWT signing secret, the
//! skip-auth switch and the AWS region.

use std::fmt;

use crate::errors::{FixtureError, Result};

/// A string that redacts its value in Debug output to prevent credential leakage
#[derive(Clone, Default)]
pub struct SecretString(pub String);

impl SecretString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "SecretString(\"\")")
        } else {
            write!(f, "SecretString(\"[REDACTED]\")")
        }
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "")
        } else {
            write!(f, "[REDACTED]")
        }
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        SecretString(s)
    }
}

impl std::str::FromStr for SecretString {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(SecretString(s.to_string()))
    }
}

impl AsRef<str> for SecretString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Default AWS region when neither the environment nor the caller supplies one
pub const DEFAULT_REGION: &str = "eu-west-1";

/// Runtime settings for the fixtures, resolved from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the LPA store API (`BASE_URL`)
    pub base_url: String,
    /// Symmetric secret used to mint bearer tokens (`JWT_SECRET_KEY`)
    pub jwt_secret: SecretString,
    /// When true, no AWS request signing is performed (`SKIP_AUTH=1`)
    pub skip_auth: bool,
    /// AWS region used for request signing (`AWS_REGION`)
    pub region: String,
}

impl Settings {
    /// Resolve settings from the process environment
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("BASE_URL")
            .map_err(|_| FixtureError::Config("BASE_URL environment variable not set".to_string()))?;

        let jwt_secret = std::env::var("JWT_SECRET_KEY")
            .map_err(|_| {
                FixtureError::Config("JWT_SECRET_KEY environment variable not set".to_string())
            })?
            .into();

        Ok(Self {
            base_url,
            jwt_secret,
            skip_auth: skip_auth_from_env(),
            region: region_from_env(),
        })
    }
}

/// Read the skip-auth switch (`SKIP_AUTH=1`)
///
/// Decided once at startup; signers built from it never change mode afterwards.
pub fn skip_auth_from_env() -> bool {
    std::env::var("SKIP_AUTH").map(|v| v == "1").unwrap_or(false)
}

/// Read the signing region, falling back to the fixed default
pub fn region_from_env() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| DEFAULT_REGION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_string_redacts_debug() {
        let s = SecretString("hunter2".to_string());
        assert_eq!(format!("{:?}", s), "SecretString(\"[REDACTED]\")");
        assert_eq!(format!("{}", s), "[REDACTED]");
    }

    #[test]
    fn secret_string_empty_is_visible_as_empty() {
        let s = SecretString::default();
        assert_eq!(format!("{:?}", s), "SecretString(\"\")");
        assert!(s.is_empty());
    }
}
