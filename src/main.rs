use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use lpa_fixtures::auth::{RequestSigner, TokenIssuer, TokenPolicy};
use lpa_fixtures::cli::{Cli, Command};
use lpa_fixtures::client::LpaStoreClient;
use lpa_fixtures::config::SecretString;
use lpa_fixtures::errors::{FixtureError, Result};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Request {
            method,
            url,
            body,
            expected_status,
            uid,
        } => run_request(&method, &url, body, expected_status, &uid).await,
        Command::Token {
            sub,
            ttl,
            backdate,
            secret,
        } => run_token(sub.as_deref(), ttl, backdate, &secret),
    };

    match outcome {
        Ok(passed) if passed => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Send one authenticated request and compare the response status
async fn run_request(
    method: &str,
    url: &str,
    body: Option<String>,
    expected_status: u16,
    uid: &str,
) -> Result<bool> {
    let secret: SecretString = std::env::var("JWT_SECRET_KEY")
        .map_err(|_| {
            FixtureError::Config("JWT_SECRET_KEY environment variable not set".to_string())
        })?
        .into();

    let url = url.replace("{{UID}}", uid);
    let client = LpaStoreClient::new(
        url.clone(),
        RequestSigner::from_env(),
        TokenIssuer::default(),
        secret,
    );

    let method = method
        .to_uppercase()
        .parse()
        .map_err(|_| FixtureError::Argument(format!("Invalid HTTP method: {}", method)))?;

    let response = client.send(method, &url, body).await?;

    if response.status.as_u16() == expected_status {
        println!("Test passed - {}: {}", response.status.as_u16(), response.body);
        Ok(true)
    } else {
        eprintln!(
            "! TEST FAILED - invalid status code {}; expected: {}",
            response.status.as_u16(),
            expected_status
        );
        eprintln!("error response: {}", response.body);
        Ok(false)
    }
}

/// Mint a token and print it to stdout
fn run_token(sub: Option<&str>, ttl: u64, backdate: u64, secret: &SecretString) -> Result<bool> {
    let issuer = TokenIssuer::new(TokenPolicy {
        ttl: Duration::from_secs(ttl),
        backdate: Duration::from_secs(backdate),
    });

    let token = issuer.issue(secret.as_str(), sub)?;
    println!("{}", token);
    Ok(true)
}
