//! Core traits and types for the content cache.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::actions;
use super::slice::PageMeta;
use super::store::ContentContext;

/// A content type served by the remote API and cached in its own slice.
///
/// Implementors are zero-sized markers; the associated payload is what the
/// slice actually holds (a single object for singleton content such as the
/// theme, or an ordered list for collections such as news).
pub trait ContentKind: Send + Sync + Sized + 'static {
  /// Cached payload.
  type Payload: Clone + PartialEq + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static;

  /// Slice name, also used as the persisted snapshot key.
  const KEY: &'static str;

  /// API path relative to the configured base URL.
  const ENDPOINT: &'static str;

  /// Payload a slice holds before its first successful fetch.
  fn default_payload() -> Self::Payload;

  /// Convert the envelope's `data` field into the payload.
  fn from_data(data: Value) -> serde_json::Result<Self::Payload> {
    serde_json::from_value(data)
  }

  /// Structural equality used by reconciliation.
  fn same_content(current: &Self::Payload, incoming: &Self::Payload) -> bool {
    current == incoming
  }

  /// Whether the payload counts as "nothing cached" for `should_fetch`.
  fn is_empty(_payload: &Self::Payload) -> bool {
    false
  }

  /// Work an access hook performs once per mount.
  fn mount_effect(ctx: ContentContext, params: Params) -> BoxFuture<'static, FetchOutcome> {
    Box::pin(async move { actions::fetch_and_reset::<Self>(&ctx, &params).await })
  }
}

/// Optional filter/pagination parameters forwarded as a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
    self.0.insert(key.into(), value.to_string());
    self
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }
}

/// Response envelope returned by every content endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
  #[serde(default, deserialize_with = "null_as_default")]
  pub success: bool,
  #[serde(default)]
  pub data: Value,
  pub message: Option<String>,
  pub total: Option<u64>,
  pub total_pages: Option<u64>,
  pub current_page: Option<u64>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub related_news: Vec<Value>,
}

/// Treat an explicit `null` like a missing field.
///
/// Use with `#[serde(default, deserialize_with = "null_as_default")]`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Envelope {
  /// Successful envelope wrapping `data`.
  pub fn ok(data: Value) -> Self {
    Self {
      success: true,
      data,
      ..Self::default()
    }
  }

  /// Parse a response body. Some endpoints return the list directly
  /// instead of wrapping it, which is treated as a successful envelope.
  pub fn from_body(body: Value) -> serde_json::Result<Self> {
    if body.is_array() {
      return Ok(Self::ok(body));
    }
    serde_json::from_value(body)
  }

  /// Pagination metadata, defaulting to a single page holding everything.
  pub fn page_meta(&self) -> PageMeta {
    let count = self.data.as_array().map(|a| a.len() as u64).unwrap_or(0);
    PageMeta {
      total: self.total.unwrap_or(count),
      total_pages: self.total_pages.unwrap_or(1),
      current_page: self.current_page.unwrap_or(1),
    }
  }
}

/// Why a fetch did not produce content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
  /// No response was received.
  #[error("{0}")]
  Transport(String),
  /// The server answered with an error status or `success: false`.
  #[error("{message}")]
  Server { status: Option<u16>, message: String },
  /// The payload did not match the expected shape.
  #[error("Failed to decode {key} payload: {message}")]
  Decode { key: &'static str, message: String },
}

/// Result of one fetch, returned instead of swallowing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  /// New content replaced the cached payload.
  Updated,
  /// Content was structurally equal to the cache; only freshness moved.
  Unchanged,
  /// The slice recorded the error and kept its previous payload.
  Failed(FetchError),
}

impl FetchOutcome {
  pub fn is_success(&self) -> bool {
    !matches!(self, FetchOutcome::Failed(_))
  }

  pub fn error(&self) -> Option<&FetchError> {
    match self {
      FetchOutcome::Failed(e) => Some(e),
      _ => None,
    }
  }
}

/// Read side of the remote content API.
#[async_trait]
pub trait ContentSource: Send + Sync {
  /// Idempotent GET of `endpoint` with optional query parameters.
  async fn get(&self, endpoint: &str, params: &Params) -> Result<Envelope, FetchError>;
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_bare_array_body_is_success() {
    let envelope = Envelope::from_body(json!([{"id": 1}, {"id": 2}])).unwrap();
    assert!(envelope.success);
    assert_eq!(envelope.page_meta().total, 2);
  }

  #[test]
  fn test_envelope_page_meta() {
    let envelope = Envelope::from_body(json!({
      "success": true,
      "data": [{"id": 1}],
      "total": 12,
      "totalPages": 4,
      "currentPage": 2
    }))
    .unwrap();
    let page = envelope.page_meta();
    assert_eq!(page.total, 12);
    assert_eq!(page.total_pages, 4);
    assert_eq!(page.current_page, 2);
  }

  #[test]
  fn test_missing_success_flag_is_failure() {
    let envelope = Envelope::from_body(json!({"data": []})).unwrap();
    assert!(!envelope.success);
  }

  #[test]
  fn test_null_fields_read_as_missing() {
    let envelope = Envelope::from_body(json!({
      "success": true,
      "data": {"slug": "price-cap"},
      "relatedNews": null
    }))
    .unwrap();
    assert!(envelope.success);
    assert!(envelope.related_news.is_empty());

    let envelope = Envelope::from_body(json!({"success": null, "data": []})).unwrap();
    assert!(!envelope.success);
  }

  #[test]
  fn test_params_builder() {
    let params = Params::new().with("limit", 3).with("category", "energy");
    assert_eq!(params.get("limit"), Some("3"));
    assert_eq!(params.iter().count(), 2);
  }
}
