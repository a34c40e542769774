//! Outbound request authentication
//!
//! Two layers, attached independently to every call to the LPA store:
//! - AWS SigV4 request signing (optional, per-process switch)
//! - a short-lived HS256 bearer token asserting the fixtures' identity

pub mod signer;
pub mod token;
pub mod verify;

pub use signer::{
    CredentialsProvider, EnvCredentials, RequestSigner, SigningContext, StaticCredentials,
    DEFAULT_SERVICE,
};
pub use token::{TokenClaims, TokenIssuer, TokenPolicy, DEFAULT_SUBJECT, ISSUER};
pub use verify::{TokenVerifier, TOKEN_HEADER, VALID_ISSUERS};
