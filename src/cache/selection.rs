//! Single-item lookups by slug (article pages, service pages).
//!
//! These are never persisted and carry no freshness: a selection is whatever
//! the last lookup returned.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::store::{ContentContext, ContentStore};
use super::traits::{Envelope, FetchError, FetchOutcome, Params};

/// An item type fetched individually by slug.
pub trait DetailKind: Send + Sync + Sized + 'static {
  type Item: Clone + PartialEq + fmt::Debug + Send + Sync + DeserializeOwned + 'static;
  type Related: Clone + PartialEq + fmt::Debug + Send + Sync + DeserializeOwned + 'static;

  const KEY: &'static str;

  /// Message recorded when the API has no such item.
  const NOT_FOUND: &'static str;

  /// Path the slug is appended to, e.g. `/news/slug`.
  const PATH: &'static str;

  /// Endpoint for `slug`, escaped as a single path segment.
  fn endpoint(slug: &str) -> String {
    format!("{}/{}", Self::PATH, urlencoding::encode(slug))
  }

  /// Related items carried next to the main item, if any.
  fn related(_envelope: &Envelope) -> Vec<Value> {
    Vec::new()
  }
}

/// Currently selected item for a detail kind.
pub struct Selection<D: DetailKind> {
  slug: Option<String>,
  item: Option<Arc<D::Item>>,
  related: Arc<Vec<D::Related>>,
  loading: bool,
  error: Option<String>,
}

impl<D: DetailKind> Selection<D> {
  pub fn slug(&self) -> Option<&str> {
    self.slug.as_deref()
  }

  pub fn item(&self) -> Option<&Arc<D::Item>> {
    self.item.as_ref()
  }

  pub fn related(&self) -> &Arc<Vec<D::Related>> {
    &self.related
  }

  pub fn loading(&self) -> bool {
    self.loading
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }
}

impl<D: DetailKind> Default for Selection<D> {
  fn default() -> Self {
    Self {
      slug: None,
      item: None,
      related: Arc::new(Vec::new()),
      loading: false,
      error: None,
    }
  }
}

impl<D: DetailKind> Clone for Selection<D> {
  fn clone(&self) -> Self {
    Self {
      slug: self.slug.clone(),
      item: self.item.clone(),
      related: Arc::clone(&self.related),
      loading: self.loading,
      error: self.error.clone(),
    }
  }
}

impl<D: DetailKind> fmt::Debug for Selection<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Selection")
      .field("key", &D::KEY)
      .field("slug", &self.slug)
      .field("item", &self.item)
      .field("loading", &self.loading)
      .field("error", &self.error)
      .finish_non_exhaustive()
  }
}

impl ContentStore {
  pub fn selection<D: DetailKind>(&self) -> Selection<D> {
    self.cell::<Selection<D>>().borrow().clone()
  }

  fn update_selection<D: DetailKind>(&self, update: impl FnOnce(&mut Selection<D>)) {
    self.cell::<Selection<D>>().send_modify(update);
  }
}

/// Look up one item by slug and make it the current selection.
///
/// On failure the previous selection is dropped, mirroring a detail page
/// that navigated to something that does not exist.
pub async fn select<D: DetailKind>(ctx: &ContentContext, slug: &str) -> FetchOutcome {
  let store = &ctx.store;
  store.update_selection::<D>(|s| {
    s.loading = true;
    s.error = None;
    s.slug = Some(slug.to_string());
  });
  debug!(detail = D::KEY, slug, "selecting");

  // Escaping cannot stop dot segments from being resolved away
  let result = if slug.trim().is_empty() || slug == "." || slug == ".." {
    Err(not_found::<D>())
  } else {
    match ctx.source.get(&D::endpoint(slug), &Params::new()).await {
      Ok(envelope) => decode::<D>(envelope),
      Err(e) => Err(e),
    }
  };

  match result {
    Ok((item, related)) => {
      let mut replaced = true;
      store.update_selection::<D>(|s| {
        s.loading = false;
        replaced = s.item.as_deref() != Some(&item);
        if replaced {
          s.item = Some(Arc::new(item));
        }
        s.related = Arc::new(related);
      });
      if replaced {
        FetchOutcome::Updated
      } else {
        FetchOutcome::Unchanged
      }
    }
    Err(e) => {
      warn!(detail = D::KEY, slug, error = %e, "selection failed");
      store.update_selection::<D>(|s| {
        s.loading = false;
        s.item = None;
        s.related = Arc::new(Vec::new());
        s.error = Some(e.to_string());
      });
      FetchOutcome::Failed(e)
    }
  }
}

/// Forget the current selection.
pub fn clear_selection<D: DetailKind>(ctx: &ContentContext) {
  ctx.store.update_selection::<D>(|s| *s = Selection::default());
}

fn not_found<D: DetailKind>() -> FetchError {
  FetchError::Server {
    status: None,
    message: D::NOT_FOUND.to_string(),
  }
}

fn decode<D: DetailKind>(envelope: Envelope) -> Result<(D::Item, Vec<D::Related>), FetchError> {
  if !envelope.success || envelope.data.is_null() {
    return Err(not_found::<D>());
  }

  let related = D::related(&envelope)
    .into_iter()
    .filter_map(|value| serde_json::from_value(value).ok())
    .collect();
  let item = serde_json::from_value(envelope.data).map_err(|e| FetchError::Decode {
    key: D::KEY,
    message: e.to_string(),
  })?;
  Ok((item, related))
}
