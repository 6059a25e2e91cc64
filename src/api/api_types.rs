//! Serde-deserializable shapes that need normalizing before they are cached.
//!
//! These are separate from the content types so the cached payload stays in
//! one canonical form whatever variant the API sends.

use serde::Deserialize;
use serde_json::Value;

use super::types::{HowWeWorkStep, NewsTag};

// ============================================================================
// How-we-work steps
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStep {
  pub title: Option<String>,
  pub description: Option<String>,
  pub icon: Option<String>,
  pub icon_name: Option<String>,
  /// Either a URL or `{ "url": ... }`
  pub image: Option<Value>,
  pub order: Option<u32>,
}

/// Icons cycled through when a step has neither an icon nor a telling title.
const STEP_ICONS: [&str; 4] = ["Phone", "FileText", "Code", "Rocket"];

impl ApiStep {
  pub fn into_step(self, index: usize) -> HowWeWorkStep {
    let title = self
      .title
      .filter(|t| !t.is_empty())
      .unwrap_or_else(|| format!("Step {}", index + 1));

    let icon_name = self
      .icon
      .or(self.icon_name)
      .filter(|i| !i.is_empty())
      .unwrap_or_else(|| infer_step_icon(&title, index).to_string());

    let image = match self.image {
      Some(Value::Object(map)) => map
        .get("url")
        .and_then(Value::as_str)
        .map(String::from),
      Some(Value::String(url)) if !url.is_empty() => Some(url),
      _ => None,
    }
    .or_else(|| HowWeWorkStep::default_image(index).map(String::from))
    .unwrap_or_default();

    HowWeWorkStep {
      id: index as u32,
      title,
      description: self.description.unwrap_or_default(),
      icon_name,
      image,
      order: self.order.filter(|o| *o > 0).unwrap_or(index as u32 + 1),
    }
  }
}

fn infer_step_icon(title: &str, index: usize) -> &'static str {
  let title = title.to_lowercase();
  let mentions = |words: &[&str]| words.iter().any(|w| title.contains(w));

  if mentions(&["discovery", "call", "book"]) {
    "Phone"
  } else if mentions(&["strategy", "session", "plan"]) {
    "FileText"
  } else if mentions(&["design", "development", "implement"]) {
    "Code"
  } else if mentions(&["launch", "support", "ongoing"]) {
    "Rocket"
  } else {
    STEP_ICONS[index % STEP_ICONS.len()]
  }
}

// ============================================================================
// News tags
// ============================================================================

/// Tags arrive either as plain names or as `{ name|tag, count }` objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiTag {
  Name(String),
  Counted {
    #[serde(alias = "tag", alias = "_id")]
    name: String,
    count: Option<u64>,
  },
}

impl From<ApiTag> for NewsTag {
  fn from(tag: ApiTag) -> Self {
    match tag {
      ApiTag::Name(name) => NewsTag { name, count: None },
      ApiTag::Counted { name, count } => NewsTag { name, count },
    }
  }
}
