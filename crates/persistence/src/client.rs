//! Fleet backend HTTP client construction.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Url};

use crate::error::StoreError;

/// Fleet backend configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: String,
    pub api_token: Option<String>,
    pub timeout_ms: u64,
}

impl BackendConfig {
    /// Parses the base url that resource paths are appended to.
    pub fn base_url(&self) -> Result<Url, StoreError> {
        let url = Url::parse(&self.url)
            .map_err(|e| StoreError::Configuration(format!("backend url: {}", e)))?;
        if url.cannot_be_a_base() {
            return Err(StoreError::Configuration(format!(
                "backend url {} cannot carry a path",
                self.url
            )));
        }
        Ok(url)
    }
}

/// Creates an HTTP client with the timeout and default headers of `config`.
pub fn create_client(config: &BackendConfig) -> Result<Client, StoreError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(token) = config.api_token.as_deref().filter(|t| !t.is_empty()) {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| StoreError::Configuration(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .default_headers(headers)
        .build()
        .map_err(StoreError::Http)
}
