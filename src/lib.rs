//! lpa-fixtures library interface
//!
//! A small client for exercising the LPA store API. Outbound requests are
//! authenticated twice: an optional AWS SigV4 signature over the exact
//! method/URL/body, and a short-lived HS256 bearer token minted fresh for
//! every call.
//!
//! # Module Organization
//!
//! - [`auth`] - Request signing, token issuing and token verification
//! - [`client`] - The LPA store HTTP client
//! - [`update`] - Update/change request bodies
//! - [`config`] - Environment-sourced settings
//! - [`errors`] - Error types (FixtureError, Result)

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod errors;
pub mod update;

pub use client::{LpaStoreClient, StoreResponse};
pub use errors::{FixtureError, Result};
