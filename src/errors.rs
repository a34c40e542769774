//! Error types for lpa-fixtures

use thiserror::Error;

/// Main error type for lpa-fixtures
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, FixtureError>;
