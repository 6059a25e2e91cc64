//! Durable snapshots of whitelisted slices.
//!
//! Rehydration is synchronous and must run before anything dispatches to the
//! store. After that, [`Persistor::start`] connects a background writer that
//! coalesces changes per slice and flushes them once the store goes quiet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::slice::{Slice, SliceAction};
use super::storage::{SnapshotStorage, StoredSlice};
use super::store::ContentStore;
use super::traits::ContentKind;

/// Bump whenever a persisted payload shape changes incompatibly.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a, P> {
  items: &'a P,
  last_fetched_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct Snapshot<P> {
  items: P,
  last_fetched_at: DateTime<Utc>,
}

/// Owner of the durable snapshot: the only reader at startup and the only
/// writer afterwards.
#[derive(Clone)]
pub struct Persistor {
  storage: Arc<dyn SnapshotStorage>,
  namespace: String,
  whitelist: Arc<BTreeSet<String>>,
  debounce: Duration,
  max_wait: Duration,
}

impl Persistor {
  pub fn new<I, S>(storage: Arc<dyn SnapshotStorage>, namespace: &str, whitelist: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      storage,
      namespace: namespace.to_string(),
      whitelist: Arc::new(whitelist.into_iter().map(Into::into).collect()),
      debounce: Duration::from_millis(250),
      max_wait: Duration::from_secs(2),
    }
  }

  /// Set how long the writer waits for more changes before writing.
  pub fn with_debounce(mut self, debounce: Duration) -> Self {
    self.debounce = debounce;
    self
  }

  /// Cap how long a change may wait while the store never goes quiet.
  pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
    self.max_wait = max_wait;
    self
  }

  pub fn namespace(&self) -> &str {
    &self.namespace
  }

  pub fn is_persisted(&self, key: &str) -> bool {
    self.whitelist.contains(key)
  }

  /// Seed the slice for `K` from durable storage.
  ///
  /// Returns whether anything was restored. Missing, corrupt or
  /// incompatible snapshots leave the slice untouched and are discarded.
  pub fn rehydrate<K: ContentKind>(&self, store: &ContentStore) -> bool {
    if !self.is_persisted(K::KEY) {
      return false;
    }

    let stored = match self.storage.load(&self.namespace, K::KEY) {
      Ok(Some(stored)) => stored,
      Ok(None) => return false,
      Err(e) => {
        warn!(slice = K::KEY, error = %e, "snapshot unreadable, starting empty");
        return false;
      }
    };

    match decode::<K>(&stored) {
      Ok(snapshot) => {
        store.dispatch::<K>(SliceAction::Rehydrated {
          items: snapshot.items,
          last_fetched_at: snapshot.last_fetched_at,
        });
        debug!(slice = K::KEY, last_fetched_at = %snapshot.last_fetched_at, "rehydrated");
        true
      }
      Err(reason) => {
        warn!(slice = K::KEY, %reason, "discarding persisted snapshot");
        if let Err(e) = self.storage.remove(&self.namespace, K::KEY) {
          warn!(slice = K::KEY, error = %e, "failed to discard snapshot");
        }
        false
      }
    }
  }

  /// Connect the store to a background writer.
  ///
  /// Must be called from within a tokio runtime.
  pub fn start(&self, store: &ContentStore) -> PersistWorker {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = PersistSink {
      tx,
      whitelist: Arc::clone(&self.whitelist),
    };
    if !store.install_sink(sink.clone()) {
      warn!("store already has a persistence writer");
    }

    let task = tokio::spawn(run_writer(
      Arc::clone(&self.storage),
      self.namespace.clone(),
      rx,
      self.debounce,
      self.max_wait,
    ));

    PersistWorker { sink, task }
  }

  /// Drop every persisted slice in this namespace.
  pub fn purge(&self) -> color_eyre::Result<usize> {
    let removed = self.storage.clear(&self.namespace)?;
    info!(namespace = %self.namespace, removed, "purged snapshots");
    Ok(removed)
  }
}

fn decode<K: ContentKind>(stored: &StoredSlice) -> Result<Snapshot<K::Payload>, String> {
  if stored.version != SNAPSHOT_VERSION {
    return Err(format!(
      "version {} does not match {}",
      stored.version, SNAPSHOT_VERSION
    ));
  }
  if checksum(&stored.data) != stored.checksum {
    return Err("checksum mismatch".to_string());
  }
  serde_json::from_slice(&stored.data).map_err(|e| format!("invalid payload: {}", e))
}

fn encode<K: ContentKind>(slice: &Slice<K>) -> Option<StoredSlice> {
  let last_fetched_at = slice.last_fetched_at()?;
  let snapshot = SnapshotRef {
    items: slice.items().as_ref(),
    last_fetched_at,
  };
  match serde_json::to_vec(&snapshot) {
    Ok(data) => Some(StoredSlice {
      key: K::KEY.to_string(),
      version: SNAPSHOT_VERSION,
      checksum: checksum(&data),
      data,
      last_fetched_at,
    }),
    Err(e) => {
      warn!(slice = K::KEY, error = %e, "failed to serialize snapshot");
      None
    }
  }
}

fn checksum(data: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(data);
  hex::encode(hasher.finalize())
}

pub(crate) enum PersistMsg {
  /// Latest state for a slice; `None` removes it.
  Write {
    key: &'static str,
    snapshot: Option<StoredSlice>,
  },
  Flush(oneshot::Sender<()>),
}

/// Store-side handle used to schedule writes.
#[derive(Clone)]
pub struct PersistSink {
  tx: mpsc::UnboundedSender<PersistMsg>,
  whitelist: Arc<BTreeSet<String>>,
}

impl PersistSink {
  pub(crate) fn enqueue<K: ContentKind>(&self, slice: &Slice<K>) {
    if !self.whitelist.contains(K::KEY) {
      return;
    }
    let msg = PersistMsg::Write {
      key: K::KEY,
      snapshot: encode(slice),
    };
    // Ignore send errors - the writer only stops at shutdown
    let _ = self.tx.send(msg);
  }
}

/// Running background writer.
pub struct PersistWorker {
  sink: PersistSink,
  task: JoinHandle<()>,
}

impl PersistWorker {
  /// Write everything pending now and wait until it hits storage.
  pub async fn flush(&self) {
    let (done_tx, done_rx) = oneshot::channel();
    if self.sink.tx.send(PersistMsg::Flush(done_tx)).is_ok() {
      let _ = done_rx.await;
    }
  }

  /// Flush and stop the writer.
  pub async fn shutdown(self) {
    self.flush().await;
    self.task.abort();
    let _ = self.task.await;
  }
}

async fn run_writer(
  storage: Arc<dyn SnapshotStorage>,
  namespace: String,
  mut rx: mpsc::UnboundedReceiver<PersistMsg>,
  debounce: Duration,
  max_wait: Duration,
) {
  let mut pending: BTreeMap<&'static str, Option<StoredSlice>> = BTreeMap::new();
  // When the oldest pending change must be written regardless of activity
  let mut deadline: Option<Instant> = None;

  loop {
    let msg = match deadline {
      Some(at) if !pending.is_empty() => {
        let wait = debounce.min(at.saturating_duration_since(Instant::now()));
        match tokio::time::timeout(wait, rx.recv()).await {
          Ok(msg) => msg,
          Err(_) => {
            write_pending(storage.as_ref(), &namespace, &mut pending);
            deadline = None;
            continue;
          }
        }
      }
      _ => rx.recv().await,
    };

    match msg {
      Some(PersistMsg::Write { key, snapshot }) => {
        pending.insert(key, snapshot);
        deadline.get_or_insert_with(|| Instant::now() + max_wait);
      }
      Some(PersistMsg::Flush(done)) => {
        write_pending(storage.as_ref(), &namespace, &mut pending);
        deadline = None;
        let _ = done.send(());
      }
      None => {
        write_pending(storage.as_ref(), &namespace, &mut pending);
        break;
      }
    }
  }
}

fn write_pending(
  storage: &dyn SnapshotStorage,
  namespace: &str,
  pending: &mut BTreeMap<&'static str, Option<StoredSlice>>,
) {
  for (key, snapshot) in std::mem::take(pending) {
    let result = match &snapshot {
      Some(stored) => storage.save(namespace, stored),
      None => storage.remove(namespace, key),
    };
    match result {
      Ok(()) => debug!(slice = key, "snapshot written"),
      Err(e) => warn!(slice = key, error = %e, "snapshot write failed"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::slice::tests::Notes;
  use crate::cache::slice::PageMeta;
  use crate::cache::storage::{NoopStorage, SqliteStorage};
  use serde_json::Value;

  fn persistor(storage: Arc<dyn SnapshotStorage>) -> Persistor {
    Persistor::new(storage, "test", ["notes"]).with_debounce(Duration::from_millis(5))
  }

  fn fetch_into(store: &ContentStore, items: Vec<Value>) {
    store.dispatch::<Notes>(SliceAction::Pending);
    store.dispatch::<Notes>(SliceAction::Fulfilled {
      payload: items,
      page: PageMeta::default(),
      at: store.now(),
    });
  }

  #[tokio::test]
  async fn test_round_trip_across_restart() {
    let storage: Arc<dyn SnapshotStorage> = Arc::new(SqliteStorage::open_in_memory().unwrap());

    let before = {
      let store = ContentStore::new();
      let worker = persistor(Arc::clone(&storage)).start(&store);
      fetch_into(&store, vec![Value::from("a"), Value::from("b")]);
      store.dispatch::<Notes>(SliceAction::Pending);
      worker.shutdown().await;
      store.select::<Notes>()
    };

    // "Restart": a fresh store seeded from the same storage
    let store = ContentStore::new();
    assert!(persistor(Arc::clone(&storage)).rehydrate::<Notes>(&store));
    let after = store.select::<Notes>();

    assert_eq!(after.items(), before.items());
    assert_eq!(after.last_fetched_at(), before.last_fetched_at());
    assert!(!after.loading());
    assert!(after.error().is_none());
  }

  #[tokio::test]
  async fn test_writes_are_coalesced_until_flush() {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let store = ContentStore::new();
    let worker = Persistor::new(storage.clone(), "test", ["notes"])
      .with_debounce(Duration::from_secs(60))
      .start(&store);

    fetch_into(&store, vec![Value::from(1)]);
    fetch_into(&store, vec![Value::from(2)]);
    tokio::task::yield_now().await;
    assert!(storage.load("test", "notes").unwrap().is_none());

    worker.flush().await;
    let stored = storage.load("test", "notes").unwrap().unwrap();
    let snapshot: Snapshot<Vec<Value>> = serde_json::from_slice(&stored.data).unwrap();
    assert_eq!(snapshot.items, vec![Value::from(2)]);
  }

  #[tokio::test]
  async fn test_steady_changes_are_written_by_max_wait() {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let store = ContentStore::new();
    let worker = Persistor::new(storage.clone(), "test", ["notes"])
      .with_debounce(Duration::from_millis(40))
      .with_max_wait(Duration::from_millis(100))
      .start(&store);

    // A change every 10ms never leaves the writer a quiet period
    let mut written = false;
    for i in 0..60 {
      fetch_into(&store, vec![Value::from(i)]);
      tokio::time::sleep(Duration::from_millis(10)).await;
      if storage.load("test", "notes").unwrap().is_some() {
        written = true;
        break;
      }
    }
    assert!(written);
    worker.shutdown().await;
  }

  #[tokio::test]
  async fn test_non_whitelisted_slice_is_not_written() {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let store = ContentStore::new();
    let worker = Persistor::new(storage.clone(), "test", ["theme"]).start(&store);

    fetch_into(&store, vec![Value::from(1)]);
    worker.flush().await;
    assert!(storage.keys("test").unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_clear_removes_snapshot() {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let store = ContentStore::new();
    let worker = persistor(storage.clone()).start(&store);

    fetch_into(&store, vec![Value::from(1)]);
    worker.flush().await;
    assert!(storage.load("test", "notes").unwrap().is_some());

    store.dispatch::<Notes>(SliceAction::Clear);
    worker.flush().await;
    assert!(storage.load("test", "notes").unwrap().is_none());
  }

  #[test]
  fn test_version_mismatch_degrades_to_empty() {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let mut slice: Slice<Notes> = Slice::new();
    slice.reduce(SliceAction::Fulfilled {
      payload: vec![Value::from(1)],
      page: PageMeta::default(),
      at: Utc::now(),
    });
    let mut stored = encode(&slice).unwrap();
    stored.version = SNAPSHOT_VERSION + 1;
    storage.save("test", &stored).unwrap();

    let store = ContentStore::new();
    assert!(!persistor(storage.clone()).rehydrate::<Notes>(&store));
    assert!(store.select::<Notes>().last_fetched_at().is_none());
    assert!(storage.load("test", "notes").unwrap().is_none());
  }

  #[test]
  fn test_corrupt_snapshot_degrades_to_empty() {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let data = b"{not json".to_vec();
    storage
      .save(
        "test",
        &StoredSlice {
          key: "notes".to_string(),
          version: SNAPSHOT_VERSION,
          checksum: checksum(&data),
          data,
          last_fetched_at: Utc::now(),
        },
      )
      .unwrap();

    let store = ContentStore::new();
    assert!(!persistor(storage).rehydrate::<Notes>(&store));
    assert!(store.select::<Notes>().items().is_empty());
  }

  #[test]
  fn test_tampered_snapshot_fails_checksum() {
    let mut slice: Slice<Notes> = Slice::new();
    slice.reduce(SliceAction::Fulfilled {
      payload: vec![Value::from(1)],
      page: PageMeta::default(),
      at: Utc::now(),
    });
    let mut stored = encode(&slice).unwrap();
    stored.data = br#"{"items":[2],"last_fetched_at":"2025-01-01T00:00:00Z"}"#.to_vec();
    assert_eq!(decode::<Notes>(&stored).err().as_deref(), Some("checksum mismatch"));
  }

  #[test]
  fn test_noop_storage_never_rehydrates() {
    let store = ContentStore::new();
    assert!(!persistor(Arc::new(NoopStorage)).rehydrate::<Notes>(&store));
  }
}
