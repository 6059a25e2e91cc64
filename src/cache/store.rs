//! Explicitly constructed content store shared through a context value.

use chrono::{DateTime, Utc};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tokio::sync::watch;
use tracing::debug;

use super::persist::PersistSink;
use super::slice::{Applied, Slice, SliceAction};
use super::traits::{ContentKind, ContentSource};

/// Source of "now" for freshness timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Holds one watched cell per content type (and per detail selection).
///
/// Cheap to clone; every clone refers to the same state. Slices are only
/// mutated through [`ContentStore::dispatch`].
#[derive(Clone)]
pub struct ContentStore {
  inner: Arc<StoreInner>,
}

struct StoreInner {
  cells: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
  clock: Clock,
  sink: OnceLock<PersistSink>,
}

impl ContentStore {
  pub fn new() -> Self {
    Self::with_clock(Arc::new(Utc::now))
  }

  /// Store whose freshness timestamps come from `clock`.
  pub fn with_clock(clock: Clock) -> Self {
    Self {
      inner: Arc::new(StoreInner {
        cells: RwLock::new(HashMap::new()),
        clock,
        sink: OnceLock::new(),
      }),
    }
  }

  pub fn now(&self) -> DateTime<Utc> {
    (self.inner.clock)()
  }

  /// Snapshot of a slice. Cloning only bumps the payload's refcount.
  pub fn select<K: ContentKind>(&self) -> Slice<K> {
    self.cell::<Slice<K>>().borrow().clone()
  }

  /// Receiver notified whenever the slice changes.
  pub fn subscribe<K: ContentKind>(&self) -> watch::Receiver<Slice<K>> {
    self.cell::<Slice<K>>().subscribe()
  }

  /// Apply an action to the slice for `K` and schedule a durable write when
  /// the persisted part changed.
  pub fn dispatch<K: ContentKind>(&self, action: SliceAction<K>) -> Applied {
    let cell = self.cell::<Slice<K>>();
    let mut applied = Applied::default();
    cell.send_if_modified(|slice| {
      applied = slice.reduce(action);
      applied.changed
    });

    if applied.durable {
      if let Some(sink) = self.inner.sink.get() {
        sink.enqueue(&cell.borrow());
      }
    }
    debug!(slice = K::KEY, changed = applied.changed, "dispatched");
    applied
  }

  /// Connect the persistence writer. Only the first sink is kept.
  pub(crate) fn install_sink(&self, sink: PersistSink) -> bool {
    self.inner.sink.set(sink).is_ok()
  }

  /// Watched cell holding a `T`, created with `T::default()` on first use.
  pub(crate) fn cell<T>(&self) -> Arc<watch::Sender<T>>
  where
    T: Default + Send + Sync + 'static,
  {
    let id = TypeId::of::<T>();
    {
      let cells = self
        .inner
        .cells
        .read()
        .unwrap_or_else(PoisonError::into_inner);
      if let Some(cell) = cells.get(&id) {
        return downcast(Arc::clone(cell));
      }
    }

    let mut cells = self
      .inner
      .cells
      .write()
      .unwrap_or_else(PoisonError::into_inner);
    let cell = cells
      .entry(id)
      .or_insert_with(|| -> Arc<dyn Any + Send + Sync> { Arc::new(watch::channel(T::default()).0) });
    downcast(Arc::clone(cell))
  }
}

impl Default for ContentStore {
  fn default() -> Self {
    Self::new()
  }
}

fn downcast<T: Send + Sync + 'static>(cell: Arc<dyn Any + Send + Sync>) -> Arc<watch::Sender<T>> {
  match cell.downcast::<watch::Sender<T>>() {
    Ok(cell) => cell,
    Err(_) => unreachable!("cells are keyed by their state type"),
  }
}

/// Composition root handed to hooks and actions.
#[derive(Clone)]
pub struct ContentContext {
  pub store: ContentStore,
  pub source: Arc<dyn ContentSource>,
}

impl ContentContext {
  pub fn new(store: ContentStore, source: Arc<dyn ContentSource>) -> Self {
    Self { store, source }
  }
}
