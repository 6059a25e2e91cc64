//! Per-content-type state and its reducer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::traits::ContentKind;

/// Pagination metadata reported alongside collection payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
  pub total: u64,
  pub total_pages: u64,
  pub current_page: u64,
}

impl Default for PageMeta {
  fn default() -> Self {
    Self {
      total: 0,
      total_pages: 1,
      current_page: 1,
    }
  }
}

/// Actions that mutate a slice.
#[derive(Debug)]
pub enum SliceAction<K: ContentKind> {
  /// A fetch was dispatched.
  Pending,
  /// A fetch returned content.
  Fulfilled {
    payload: K::Payload,
    page: PageMeta,
    at: DateTime<Utc>,
  },
  /// A fetch failed.
  Rejected { message: String },
  /// Seed from a durable snapshot at startup.
  Rehydrated {
    items: K::Payload,
    last_fetched_at: DateTime<Utc>,
  },
  /// Mark the slice as wanting a refresh.
  RequestRefresh,
  ResetNeedsRefresh,
  /// Drop cached content and freshness.
  Clear,
}

/// What a reduction changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
  /// Any observable field changed.
  pub changed: bool,
  /// `items` now points at a new allocation.
  pub items_replaced: bool,
  /// `items` or `last_fetched_at` changed, so the snapshot is out of date.
  pub durable: bool,
}

/// Authoritative in-memory state for one content type.
pub struct Slice<K: ContentKind> {
  items: Arc<K::Payload>,
  loading: bool,
  error: Option<String>,
  last_fetched_at: Option<DateTime<Utc>>,
  needs_refresh: bool,
  page: PageMeta,
}

impl<K: ContentKind> Slice<K> {
  pub fn new() -> Self {
    Self {
      items: Arc::new(K::default_payload()),
      loading: false,
      error: None,
      last_fetched_at: None,
      needs_refresh: false,
      page: PageMeta::default(),
    }
  }

  pub fn items(&self) -> &Arc<K::Payload> {
    &self.items
  }

  pub fn loading(&self) -> bool {
    self.loading
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
    self.last_fetched_at
  }

  pub fn needs_refresh(&self) -> bool {
    self.needs_refresh
  }

  pub fn page(&self) -> PageMeta {
    self.page
  }

  /// True when a refresh was requested, nothing was ever fetched, or the
  /// cached collection is empty.
  pub fn should_fetch(&self) -> bool {
    self.needs_refresh || self.last_fetched_at.is_none() || K::is_empty(&self.items)
  }

  /// Apply one action.
  pub fn reduce(&mut self, action: SliceAction<K>) -> Applied {
    match action {
      SliceAction::Pending => {
        let changed = !self.loading || self.error.is_some();
        self.loading = true;
        self.error = None;
        Applied {
          changed,
          ..Applied::default()
        }
      }
      SliceAction::Fulfilled { payload, page, at } => {
        let items_replaced = !K::same_content(&self.items, &payload);
        if items_replaced {
          self.items = Arc::new(payload);
        }
        self.loading = false;
        self.error = None;
        self.last_fetched_at = Some(at);
        self.needs_refresh = false;
        self.page = page;
        Applied {
          changed: true,
          items_replaced,
          durable: true,
        }
      }
      SliceAction::Rejected { message } => {
        let message = if message.trim().is_empty() {
          format!("Failed to fetch {}", K::KEY)
        } else {
          message
        };
        self.loading = false;
        self.error = Some(message);
        self.needs_refresh = false;
        Applied {
          changed: true,
          ..Applied::default()
        }
      }
      SliceAction::Rehydrated {
        items,
        last_fetched_at,
      } => {
        self.items = Arc::new(items);
        self.last_fetched_at = Some(last_fetched_at);
        self.loading = false;
        self.error = None;
        Applied {
          changed: true,
          items_replaced: true,
          durable: false,
        }
      }
      SliceAction::RequestRefresh => {
        let changed = !self.needs_refresh;
        self.needs_refresh = true;
        Applied {
          changed,
          ..Applied::default()
        }
      }
      SliceAction::ResetNeedsRefresh => {
        let changed = self.needs_refresh;
        self.needs_refresh = false;
        Applied {
          changed,
          ..Applied::default()
        }
      }
      SliceAction::Clear => {
        *self = Self::new();
        Applied {
          changed: true,
          items_replaced: true,
          durable: true,
        }
      }
    }
  }
}

impl<K: ContentKind> Default for Slice<K> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K: ContentKind> Clone for Slice<K> {
  fn clone(&self) -> Self {
    Self {
      items: Arc::clone(&self.items),
      loading: self.loading,
      error: self.error.clone(),
      last_fetched_at: self.last_fetched_at,
      needs_refresh: self.needs_refresh,
      page: self.page,
    }
  }
}

impl<K: ContentKind> fmt::Debug for Slice<K> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Slice")
      .field("key", &K::KEY)
      .field("items", &self.items)
      .field("loading", &self.loading)
      .field("error", &self.error)
      .field("last_fetched_at", &self.last_fetched_at)
      .field("needs_refresh", &self.needs_refresh)
      .finish_non_exhaustive()
  }
}
