//! Stale-while-revalidate content cache.
//!
//! This module is independent of the site's content types. It provides:
//! - Slices holding `{ items, loading, error, last_fetched_at }` per content kind
//! - Reconciliation that keeps payload identity when refreshed content is equal
//! - Durable, versioned snapshots rehydrated before first use
//! - Access hooks that fetch once per mount and hide loading once cached

pub mod actions;
mod hook;
mod persist;
mod selection;
mod slice;
mod storage;
mod store;
mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use hook::{ContentHook, HookView, Identity, Memo, MountState};
pub use persist::{PersistSink, PersistWorker, Persistor, SNAPSHOT_VERSION};
pub use selection::{clear_selection, select, DetailKind, Selection};
pub use slice::{Applied, PageMeta, Slice, SliceAction};
pub use storage::{NoopStorage, SnapshotStorage, SqliteStorage, StoredSlice};
pub use store::{Clock, ContentContext, ContentStore};
pub use traits::{
  null_as_default, ContentKind, ContentSource, Envelope, FetchError, FetchOutcome, Params,
};
