//! Relay-server credential fetching.
//!
//! The credential service issues short-lived TURN credentials. Its response is
//! passed through untouched when it looks like a list of ICE server
//! descriptors; anything else (no key configured, network failure, non-2xx,
//! unexpected JSON) is answered with public STUN servers so clients can still
//! attempt a direct connection.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// ICE server configuration sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    /// Public STUN reflection servers, used whenever the credential service
    /// cannot be relied on.
    pub fn fallback() -> Vec<Self> {
        vec![
            Self {
                urls: vec![
                    "stun:stun.l.google.com:19302".into(),
                    "stun:stun1.l.google.com:19302".into(),
                ],
                username: None,
                credential: None,
            },
            Self {
                urls: vec!["stun:stun.cloudflare.com:3478".into()],
                username: None,
                credential: None,
            },
        ]
    }
}

/// Why the credential service's answer was not used.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("No credential service API key configured")]
    NotConfigured,

    #[error("HTTP error talking to credential service: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Credential service returned status {0}")]
    Status(u16),

    #[error("Credential service returned an unexpected shape")]
    InvalidShape,
}

/// Where a credential answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Upstream,
    Fallback,
}

/// Client for the external credential service.
#[derive(Debug, Clone)]
pub struct CredentialRelay {
    http: Client,
    api_url: String,
    api_key: Option<String>,
}

impl CredentialRelay {
    pub fn new(
        api_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CredentialError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("WebShare-Signaling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Ask the credential service for ICE servers.
    pub async fn fetch(&self) -> Result<Value, CredentialError> {
        let key = self.api_key.as_deref().ok_or(CredentialError::NotConfigured)?;

        let resp = self
            .http
            .get(&self.api_url)
            .query(&[("apiKey", key)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CredentialError::Status(status.as_u16()));
        }

        let body: Value = resp.json().await?;
        if !is_ice_server_list(&body) {
            return Err(CredentialError::InvalidShape);
        }
        Ok(body)
    }

    /// The upstream answer if usable, otherwise the fallback set. Never fails.
    pub async fn ice_servers(&self) -> (Value, CredentialSource) {
        match self.fetch().await {
            Ok(servers) => {
                tracing::info!("Serving ICE servers from credential service");
                (servers, CredentialSource::Upstream)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Credential service unusable, serving fallback ICE servers");
                let fallback = serde_json::to_value(IceServerConfig::fallback())
                    .unwrap_or_else(|_| Value::Array(Vec::new()));
                (fallback, CredentialSource::Fallback)
            }
        }
    }
}

/// A non-empty array of objects, each with `urls` as a string or array of strings.
pub fn is_ice_server_list(value: &Value) -> bool {
    let Some(servers) = value.as_array() else {
        return false;
    };
    !servers.is_empty()
        && servers.iter().all(|server| match server.get("urls") {
            Some(Value::String(_)) => true,
            Some(Value::Array(urls)) => !urls.is_empty() && urls.iter().all(Value::is_string),
            _ => false,
        })
}
