//! Integration tests for the tentd server.
//!
//! These tests require a running tentd server at `localhost:5000`.
//! They are marked `#[ignore]` so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p tentd-integration -- --ignored
//! ```

use std::sync::Once;

use anyhow::{Context, Result};
use serde::Deserialize;
use tentd_auth::{RequestMeta, RequestSigner};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("TENTD_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:5000".to_owned())
}

/// Create an HTTP client for the test server.
#[must_use]
pub fn client() -> reqwest::Client {
    init_tracing();
    reqwest::Client::new()
}

/// Credentials returned by `POST /followers`.
#[derive(Debug, Clone, Deserialize)]
pub struct Follower {
    /// Follower id, equal to the MAC key id.
    pub id: String,
    /// Entity URL the follower registered with.
    pub entity: String,
    /// MAC key id.
    pub mac_key_id: String,
    /// MAC secret.
    pub mac_key: String,
    /// MAC algorithm name.
    pub mac_algorithm: String,
}

impl Follower {
    /// A signer for this follower's keypair.
    #[must_use]
    pub fn signer(&self) -> RequestSigner {
        RequestSigner::new(&self.mac_key_id, &self.mac_key)
    }
}

/// Generate a unique entity URL for a test.
#[must_use]
pub fn test_entity(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("https://{prefix}-{id}.example.com")
}

/// Register a follower and return its credentials.
///
/// # Errors
/// Fails if the request fails or the server does not answer with credentials.
pub async fn follow(client: &reqwest::Client, prefix: &str) -> Result<Follower> {
    let response = client
        .post(format!("{}/followers", endpoint_url()))
        .json(&serde_json::json!({ "entity": test_entity(prefix) }))
        .send()
        .await
        .context("POST /followers failed")?
        .error_for_status()?;

    response.json().await.context("invalid follower response")
}

/// Build the `Authorization` header value for `method` on `path`.
///
/// # Errors
/// Fails if the endpoint URL cannot be parsed.
pub fn authorization(signer: &RequestSigner, method: &str, path: &str) -> Result<String> {
    let url = reqwest::Url::parse(&endpoint_url())?.join(path)?;
    let meta = RequestMeta {
        method: method.to_owned(),
        path: url.path().to_owned(),
        query: url.query().unwrap_or_default().to_owned(),
        host: url.host_str().unwrap_or_default().to_owned(),
        port: url.port_or_known_default().unwrap_or(80),
        authorization: None,
    };
    Ok(signer.sign_now(&meta).to_string())
}

/// Send a MAC-signed request.
///
/// # Errors
/// Fails if signing or sending the request fails.
pub async fn signed(
    client: &reqwest::Client,
    method: reqwest::Method,
    path: &str,
    signer: &RequestSigner,
) -> Result<reqwest::Response> {
    let header = authorization(signer, method.as_str(), path)?;
    client
        .request(method, format!("{}{path}", endpoint_url()))
        .header(reqwest::header::AUTHORIZATION, header)
        .send()
        .await
        .context("signed request failed")
}

mod test_auth;
mod test_followers;
