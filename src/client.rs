//! LPA store HTTP client
//!
//! Builds each request, asks the signer for zero-or-more SigV4 headers,
//! mints a fresh bearer token, merges the two header sets and sends the
//! call. Signed headers are computed per request against the exact
//! method/URL/body going out and are never reused.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::{RequestSigner, SigningContext, TokenIssuer, TOKEN_HEADER};
use crate::config::{SecretString, Settings};
use crate::errors::{FixtureError, Result};
use crate::update::UpdateRequest;

/// Characters escaped when a UID is placed in a path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

/// Status and body of a store response
#[derive(Debug)]
pub struct StoreResponse {
    pub status: StatusCode,
    pub body: String,
}

impl StoreResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Client for the LPA store API
pub struct LpaStoreClient {
    http: Client,
    base_url: String,
    signer: RequestSigner,
    issuer: TokenIssuer,
    jwt_secret: SecretString,
}

impl std::fmt::Debug for LpaStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LpaStoreClient")
            .field("base_url", &self.base_url)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

impl LpaStoreClient {
    pub fn new(
        base_url: impl Into<String>,
        signer: RequestSigner,
        issuer: TokenIssuer,
        jwt_secret: SecretString,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
            issuer,
            jwt_secret,
        }
    }

    /// Build a client entirely from the process environment
    pub fn from_env() -> Result<Self> {
        let settings = Settings::from_env()?;
        Ok(Self::new(
            settings.base_url,
            RequestSigner::from_env(),
            TokenIssuer::default(),
            settings.jwt_secret,
        ))
    }

    /// Fetch an LPA record
    pub async fn get_lpa(&self, uid: &str) -> Result<Value> {
        let url = self.lpa_url(uid, "");
        let response = self.send(Method::GET, &url, None).await?;

        if !response.is_success() {
            return Err(FixtureError::Store(format!(
                "GET {} returned {}: {}",
                url, response.status, response.body
            )));
        }

        response.json()
    }

    /// Create or replace an LPA record from raw JSON
    pub async fn put_lpa(&self, uid: &str, json_data: &str) -> Result<StoreResponse> {
        let url = self.lpa_url(uid, "");
        self.send(Method::PUT, &url, Some(json_data.to_string()))
            .await
    }

    /// Post an update against an LPA record
    pub async fn send_update(&self, uid: &str, update: &UpdateRequest) -> Result<StoreResponse> {
        let url = self.lpa_url(uid, "/updates");
        let body = serde_json::to_string(update)?;
        self.send(Method::POST, &url, Some(body)).await
    }

    /// Record an attorney's signature, looking the attorney up by UID
    pub async fn attorney_sign(
        &self,
        uid: &str,
        attorney_uid: &str,
        signed_at: &str,
    ) -> Result<StoreResponse> {
        let lpa = self.get_lpa(uid).await?;

        let index = lpa["attorneys"]
            .as_array()
            .into_iter()
            .flatten()
            .position(|attorney| attorney["uid"] == attorney_uid)
            .ok_or_else(|| {
                FixtureError::Store(format!("Could not find attorney with UID {}", attorney_uid))
            })?;

        self.send_update(uid, &UpdateRequest::attorney_sign(index, signed_at))
            .await
    }

    /// Record the certificate provider's signature
    pub async fn certificate_provider_sign(
        &self,
        uid: &str,
        signed_at: &str,
    ) -> Result<StoreResponse> {
        self.send_update(uid, &UpdateRequest::certificate_provider_sign(signed_at))
            .await
    }

    /// Record the donor's identity check
    pub async fn donor_confirm_identity(
        &self,
        uid: &str,
        checked_at: &str,
        id_type: &str,
    ) -> Result<StoreResponse> {
        self.send_update(uid, &UpdateRequest::donor_confirm_identity(checked_at, id_type))
            .await
    }

    /// Record the certificate provider's identity check
    pub async fn certificate_provider_confirm_identity(
        &self,
        uid: &str,
        checked_at: &str,
        id_type: &str,
    ) -> Result<StoreResponse> {
        self.send_update(
            uid,
            &UpdateRequest::certificate_provider_confirm_identity(checked_at, id_type),
        )
        .await
    }

    /// Send an arbitrary request with the full authentication header set
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<String>,
    ) -> Result<StoreResponse> {
        let headers = self
            .auth_headers(method.as_str(), url, body.as_deref().map(str::as_bytes))?;

        debug!(method = %method, url = %url, signed = self.signer.is_authed(), "Sending request");

        let mut request = self.http.request(method.clone(), url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        info!(method = %method, url = %url, status = status.as_u16(), "Store responded");

        Ok(StoreResponse { status, body })
    }

    /// Merged header set: SigV4 headers (when enabled) plus the bearer
    /// token and content type carried on every request
    fn auth_headers(&self, method: &str, url: &str, body: Option<&[u8]>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if self.signer.is_authed() {
            let ctx = SigningContext::new(method, url, body);
            for (name, value) in self.signer.sign_request(&ctx)? {
                let name = HeaderName::try_from(name.as_str())
                    .map_err(|e| FixtureError::Auth(format!("Invalid signed header: {}", e)))?;
                let value = HeaderValue::from_str(&value)
                    .map_err(|e| FixtureError::Auth(format!("Invalid signed header: {}", e)))?;
                headers.insert(name, value);
            }
        }

        let token = self.issuer.issue(self.jwt_secret.as_str(), None)?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| FixtureError::Auth(format!("Invalid bearer token: {}", e)))?;
        headers.insert(HeaderName::from_static("x-jwt-authorization"), bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    fn lpa_url(&self, uid: &str, suffix: &str) -> String {
        format!(
            "{}/lpas/{}{}",
            self.base_url,
            utf8_percent_encode(uid, PATH_SEGMENT),
            suffix
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCredentials;

    fn unsigned_client(base_url: &str) -> LpaStoreClient {
        LpaStoreClient::new(
            base_url,
            RequestSigner::new(
                false,
                "eu-west-1",
                Box::new(StaticCredentials::new("AKIDEXAMPLE", "SECRETEXAMPLE", None)),
            ),
            TokenIssuer::default(),
            SecretString("secret".to_string()),
        )
    }

    #[test]
    fn uids_are_percent_encoded_in_paths() {
        let client = unsigned_client("http://lpa.example.com/");

        assert_eq!(
            client.lpa_url("M-1234 5678", "/updates"),
            "http://lpa.example.com/lpas/M-1234%205678/updates"
        );
    }

    #[test]
    fn unsigned_requests_carry_only_token_and_content_type() {
        let client = unsigned_client("http://lpa.example.com");

        let headers = client
            .auth_headers("GET", "http://lpa.example.com/lpas/M-1234", None)
            .unwrap();

        assert_eq!(headers.len(), 2);
        assert!(headers.contains_key(TOKEN_HEADER.to_lowercase().as_str()));
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert!(!headers.contains_key("authorization"));
    }

    #[test]
    fn signed_requests_carry_the_full_set() {
        let client = LpaStoreClient::new(
            "https://lpa.example.com",
            RequestSigner::new(
                true,
                "eu-west-1",
                Box::new(StaticCredentials::new("AKIDEXAMPLE", "SECRETEXAMPLE", None)),
            ),
            TokenIssuer::default(),
            SecretString("secret".to_string()),
        );

        let headers = client
            .auth_headers("GET", "https://lpa.example.com/lpas/M-1234", None)
            .unwrap();

        assert!(headers.contains_key("authorization"));
        assert!(headers.contains_key("x-amz-date"));
        assert!(headers.contains_key("x-jwt-authorization"));
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }
}
