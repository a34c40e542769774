//! AWS Signature Version 4 request signing
//!
//! Outbound calls to the LPA store go through an IAM-authorized API
//! gateway, so every request must carry a SigV4 signature computed over
//! its exact method, URL and body. Signing can be switched off for the
//! whole process with `SKIP_AUTH=1` (local development against an
//! unsecured store); the switch is decided once and never changes for
//! the signer's lifetime.

use std::time::SystemTime;

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    sign, PayloadChecksumKind, SignableBody, SignableRequest, SigningSettings,
};
use aws_sigv4::sign::v4;
use tracing::debug;

use crate::config;
use crate::errors::{FixtureError, Result};

/// Service name the store's gateway verifies signatures against
pub const DEFAULT_SERVICE: &str = "execute-api";

/// Resolves ambient AWS credentials.
///
/// The signer only needs "give me the current credentials"; keeping that
/// behind a trait lets tests sign with fixed keys and no cloud access.
pub trait CredentialsProvider: Send + Sync {
    fn resolve(&self) -> Result<Credentials>;
}

/// Credentials taken from the standard AWS environment variables
#[derive(Debug, Default)]
pub struct EnvCredentials;

impl CredentialsProvider for EnvCredentials {
    fn resolve(&self) -> Result<Credentials> {
        let access_key = std::env::var("AWS_ACCESS_KEY_ID")
            .or_else(|_| std::env::var("AWS_ACCESS_KEY"))
            .map_err(|_| {
                FixtureError::Auth("AWS_ACCESS_KEY_ID environment variable not set".to_string())
            })?;

        let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .or_else(|_| std::env::var("AWS_SECRET_KEY"))
            .map_err(|_| {
                FixtureError::Auth("AWS_SECRET_ACCESS_KEY environment variable not set".to_string())
            })?;

        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Credentials::new(
            access_key,
            secret_key,
            session_token,
            None,
            "lpa-fixtures",
        ))
    }
}

/// Fixed credentials, for tests and one-off scripts
#[derive(Debug)]
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            credentials: Credentials::new(
                access_key_id.into(),
                secret_access_key.into(),
                session_token,
                None,
                "lpa-fixtures",
            ),
        }
    }
}

impl CredentialsProvider for StaticCredentials {
    fn resolve(&self) -> Result<Credentials> {
        Ok(self.credentials.clone())
    }
}

/// The method/URL/body triple a signature is bound to
///
/// Immutable per call; a signature computed for one context must never be
/// reused for another.
#[derive(Debug, Clone, Copy)]
pub struct SigningContext<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub body: Option<&'a [u8]>,
}

impl<'a> SigningContext<'a> {
    pub fn new(method: &'a str, url: &'a str, body: Option<&'a [u8]>) -> Self {
        Self { method, url, body }
    }
}

/// Signs outbound requests with SigV4, or does nothing at all
///
/// The enabled/disabled decision is made at construction and is immutable;
/// there is no partially-signed mode. When disabled, callers must not call
/// [`sign_request`](Self::sign_request) and send an empty header set instead.
pub struct RequestSigner {
    enabled: bool,
    region: String,
    service: String,
    credentials: Box<dyn CredentialsProvider>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("enabled", &self.enabled)
            .field("region", &self.region)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Build a signer with an explicit mode and credential source
    pub fn new(
        enabled: bool,
        region: impl Into<String>,
        credentials: Box<dyn CredentialsProvider>,
    ) -> Self {
        Self {
            enabled,
            region: region.into(),
            service: DEFAULT_SERVICE.to_string(),
            credentials,
        }
    }

    /// Build a signer from the process environment
    ///
    /// `SKIP_AUTH=1` disables signing for the signer's lifetime; the region
    /// comes from `AWS_REGION` with a fixed default.
    pub fn from_env() -> Self {
        Self::new(
            !config::skip_auth_from_env(),
            config::region_from_env(),
            Box::new(EnvCredentials),
        )
    }

    /// Override the target service name (defaults to `execute-api`)
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Whether this signer will sign at all
    pub fn is_authed(&self) -> bool {
        self.enabled
    }

    /// Compute the SigV4 header set for a request
    ///
    /// Returns the headers the gateway needs to verify the signature:
    /// `authorization`, `x-amz-date`, `x-amz-security-token` when the
    /// credentials carry a session token, plus the `host` header the
    /// signature was computed against. Fails hard if credentials cannot
    /// be resolved; an unsigned request must never masquerade as signed.
    pub fn sign_request(&self, ctx: &SigningContext<'_>) -> Result<Vec<(String, String)>> {
        self.sign_request_at(ctx, SystemTime::now())
    }

    /// Compute the SigV4 header set at an explicit signing time
    ///
    /// Identical inputs, credentials and time yield identical headers.
    pub fn sign_request_at(
        &self,
        ctx: &SigningContext<'_>,
        time: SystemTime,
    ) -> Result<Vec<(String, String)>> {
        let credentials = self.credentials.resolve()?;

        let parsed_url = url::Url::parse(ctx.url)?;
        let uri = format!(
            "{}{}",
            parsed_url.path(),
            parsed_url
                .query()
                .map(|q| format!("?{}", q))
                .unwrap_or_default()
        );

        let host = host_for_signing(&parsed_url);
        if host.is_empty() {
            return Err(FixtureError::Argument(format!(
                "URL has no host: {}",
                ctx.url
            )));
        }

        let identity = credentials.into();

        // The gateway verifies the body against a signed content hash
        let mut settings = SigningSettings::default();
        settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;

        let signing_params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(&self.service)
            .time(time)
            .settings(settings)
            .build()
            .map_err(|e| FixtureError::Auth(format!("Failed to build signing params: {}", e)))?;

        let body_bytes = ctx.body.unwrap_or(&[]);
        let signable_body = if body_bytes.is_empty() {
            SignableBody::empty()
        } else {
            SignableBody::Bytes(body_bytes)
        };

        let headers = [("host", host.as_str())];
        let signable_request = SignableRequest::new(
            ctx.method,
            &uri,
            headers.iter().map(|(k, v)| (*k, *v)),
            signable_body,
        )
        .map_err(|e| FixtureError::Auth(format!("Failed to create signable request: {}", e)))?;

        let signing_output = sign(signable_request, &signing_params.into())
            .map_err(|e| FixtureError::Auth(format!("Failed to sign request: {}", e)))?;

        let (signing_instructions, _signature) = signing_output.into_parts();

        let mut auth_headers: Vec<(String, String)> = signing_instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        // The request must go out with the same Host the signature covers
        if !auth_headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("host"))
        {
            auth_headers.push(("host".to_string(), host));
        }

        debug!(
            method = %ctx.method,
            url = %ctx.url,
            headers = auth_headers.len(),
            "Signed outbound request"
        );

        Ok(auth_headers)
    }
}

/// Host header value the signature must be computed against
///
/// Non-standard ports are part of the host; standard ports are dropped to
/// match what the HTTP client will actually send.
fn host_for_signing(url: &url::Url) -> String {
    let Some(host) = url.host_str() else {
        return String::new();
    };

    match url.port() {
        Some(port) => {
            let is_standard_port = match url.scheme() {
                "https" => port == 443,
                "http" => port == 80,
                _ => false,
            };
            if is_standard_port {
                host.to_string()
            } else {
                format!("{}:{}", host, port)
            }
        }
        None => host.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn test_signer() -> RequestSigner {
        RequestSigner::new(
            true,
            "eu-west-1",
            Box::new(StaticCredentials::new("AKIDEXAMPLE", "SECRETEXAMPLE", None)),
        )
    }

    fn fixed_time() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn authorization(headers: &[(String, String)]) -> String {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("authorization"))
            .map(|(_, v)| v.clone())
            .expect("authorization header missing")
    }

    #[test]
    fn signing_is_deterministic_for_identical_inputs() {
        let signer = test_signer();
        let ctx = SigningContext::new(
            "POST",
            "https://lpa.example.com/lpas/M-1234/updates",
            Some(br#"{"type":"ATTORNEY_SIGN"}"#),
        );

        let a = signer.sign_request_at(&ctx, fixed_time()).unwrap();
        let b = signer.sign_request_at(&ctx, fixed_time()).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn changing_method_url_or_body_changes_signature() {
        let signer = test_signer();
        let url = "https://lpa.example.com/lpas/M-1234/updates";
        let body: &[u8] = br#"{"type":"ATTORNEY_SIGN"}"#;

        let base = authorization(
            &signer
                .sign_request_at(&SigningContext::new("POST", url, Some(body)), fixed_time())
                .unwrap(),
        );

        let other_method = authorization(
            &signer
                .sign_request_at(&SigningContext::new("PUT", url, Some(body)), fixed_time())
                .unwrap(),
        );
        let other_url = authorization(
            &signer
                .sign_request_at(
                    &SigningContext::new("POST", "https://lpa.example.com/lpas/M-9999/updates", Some(body)),
                    fixed_time(),
                )
                .unwrap(),
        );
        let other_body = authorization(
            &signer
                .sign_request_at(
                    &SigningContext::new("POST", url, Some(br#"{"type":"DONOR_CONFIRM_IDENTITY"}"#)),
                    fixed_time(),
                )
                .unwrap(),
        );

        assert_ne!(base, other_method);
        assert_ne!(base, other_url);
        assert_ne!(base, other_body);
    }

    #[test]
    fn signed_headers_cover_the_host() {
        let signer = test_signer();
        let ctx = SigningContext::new("GET", "https://lpa.example.com:8443/lpas/M-1234", None);

        let headers = signer.sign_request_at(&ctx, fixed_time()).unwrap();

        let host = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("host"))
            .map(|(_, v)| v.as_str());
        assert_eq!(host, Some("lpa.example.com:8443"));

        let auth = authorization(&headers);
        assert!(auth.starts_with("AWS4-HMAC-SHA256"));
        assert!(auth.contains("eu-west-1/execute-api/aws4_request"));
        assert!(headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("x-amz-content-sha256")));
    }

    #[test]
    fn session_token_is_carried_in_headers() {
        let signer = RequestSigner::new(
            true,
            "eu-west-1",
            Box::new(StaticCredentials::new(
                "AKIDEXAMPLE",
                "SECRETEXAMPLE",
                Some("SESSIONTOKEN".to_string()),
            )),
        );
        let ctx = SigningContext::new("GET", "https://lpa.example.com/lpas/M-1234", None);

        let headers = signer.sign_request_at(&ctx, fixed_time()).unwrap();

        assert!(headers
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("x-amz-security-token") && v == "SESSIONTOKEN"));
    }

    #[test]
    fn url_without_host_is_rejected() {
        let signer = test_signer();
        let ctx = SigningContext::new("GET", "unix:/tmp/socket", None);

        assert!(signer.sign_request_at(&ctx, fixed_time()).is_err());
    }

    #[test]
    fn missing_credentials_are_a_hard_failure() {
        struct NoCredentials;
        impl CredentialsProvider for NoCredentials {
            fn resolve(&self) -> Result<Credentials> {
                Err(FixtureError::Auth("no credential source".to_string()))
            }
        }

        let signer = RequestSigner::new(true, "eu-west-1", Box::new(NoCredentials));
        let ctx = SigningContext::new("GET", "https://lpa.example.com/lpas/M-1234", None);

        assert!(signer.sign_request(&ctx).is_err());
    }
}
