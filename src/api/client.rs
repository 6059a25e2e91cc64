use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::cache::{ContentSource, Envelope, FetchError, Params};
use crate::config::{ApiConfig, Config};

const NETWORK_ERROR: &str = "Network error. Please check your connection.";

/// HTTP client for the site content API.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
  token: Option<String>,
}

impl ApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    Self::with_token(config, Config::get_api_token())
  }

  pub fn with_token(config: &ApiConfig, token: Option<String>) -> Result<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let http = reqwest::Client::builder()
      .timeout(config.timeout())
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: parse_base_url(&config.base_url)?,
      token,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Resolve `endpoint` under the base URL and attach `params` as a query.
  pub fn url_for(&self, endpoint: &str, params: &Params) -> std::result::Result<Url, FetchError> {
    let mut url = self
      .base_url
      .join(endpoint.trim_start_matches('/'))
      .map_err(|e| FetchError::Transport(format!("Invalid endpoint {}: {}", endpoint, e)))?;
    if !params.is_empty() {
      url.query_pairs_mut().extend_pairs(params.iter());
    }
    Ok(url)
  }
}

/// Base URLs need a trailing slash or `join` drops their last segment.
fn parse_base_url(raw: &str) -> Result<Url> {
  let normalized = if raw.ends_with('/') {
    raw.to_string()
  } else {
    format!("{}/", raw)
  };
  Url::parse(&normalized).map_err(|e| eyre!("Invalid API base URL {}: {}", raw, e))
}

#[async_trait]
impl ContentSource for ApiClient {
  async fn get(&self, endpoint: &str, params: &Params) -> std::result::Result<Envelope, FetchError> {
    let url = self.url_for(endpoint, params)?;
    let request_id = uuid::Uuid::new_v4().to_string();
    debug!(%url, %request_id, "GET");

    let mut request = self.http.get(url.clone()).header("X-Request-ID", &request_id);
    if let Some(token) = &self.token {
      request = request.header(AUTHORIZATION, format!("Bearer {}", token));
    }

    let response = request.send().await.map_err(|e| {
      warn!(%url, error = %e, "request failed");
      FetchError::Transport(NETWORK_ERROR.to_string())
    })?;

    let status = response.status();
    let body = response.bytes().await.map_err(|e| {
      warn!(%url, error = %e, "failed to read response body");
      FetchError::Transport(NETWORK_ERROR.to_string())
    })?;
    debug!(%url, status = status.as_u16(), bytes = body.len(), "response");

    if !status.is_success() {
      return Err(FetchError::Server {
        status: Some(status.as_u16()),
        message: error_message(&body)
          .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16())),
      });
    }

    let json: Value = serde_json::from_slice(&body).map_err(|e| FetchError::Server {
      status: Some(status.as_u16()),
      message: format!("Invalid JSON response: {}", e),
    })?;
    Envelope::from_body(json).map_err(|e| FetchError::Server {
      status: Some(status.as_u16()),
      message: format!("Unexpected response shape: {}", e),
    })
  }
}

/// The `message` field of an error body, if the server sent one.
fn error_message(body: &[u8]) -> Option<String> {
  let json: Value = serde_json::from_slice(body).ok()?;
  json
    .get("message")
    .and_then(Value::as_str)
    .filter(|m| !m.trim().is_empty())
    .map(String::from)
}
