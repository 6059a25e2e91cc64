//! Access hooks: the consumer-facing side of a slice.
//!
//! A hook is owned by one mounted consumer. The first render starts the
//! kind's mount effect in the background; later renders only read the store.
//! Dropping the hook is the unmount. The effect is not cancelled and keeps
//! updating the shared slice.

use futures::FutureExt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::slice::Slice;
use super::store::ContentContext;
use super::traits::{ContentKind, FetchError, FetchOutcome, Params};

/// Lifecycle of the one refresh a mount performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
  NotStarted,
  InFlight,
  Done,
}

/// What a consumer renders from.
#[derive(Debug, Clone)]
pub struct HookView<P> {
  pub data: Arc<P>,
  /// Only true while nothing was ever fetched and a fetch is running
  pub loading: bool,
  pub error: Option<String>,
}

impl<P> HookView<P> {
  pub fn from_slice<K: ContentKind<Payload = P>>(slice: &Slice<K>) -> Self {
    Self {
      data: Arc::clone(slice.items()),
      loading: slice.last_fetched_at().is_none() && slice.loading(),
      error: slice.error().map(String::from),
    }
  }
}

/// Stale-while-revalidate access to one content type.
pub struct ContentHook<K: ContentKind> {
  ctx: ContentContext,
  params: Params,
  state: MountState,
  task: Option<JoinHandle<FetchOutcome>>,
  outcome: Option<FetchOutcome>,
  rx: watch::Receiver<Slice<K>>,
  _kind: PhantomData<K>,
}

impl<K: ContentKind> ContentHook<K> {
  pub fn new(ctx: &ContentContext) -> Self {
    Self::with_params(ctx, Params::new())
  }

  pub fn with_params(ctx: &ContentContext, params: Params) -> Self {
    Self {
      ctx: ctx.clone(),
      params,
      state: MountState::NotStarted,
      task: None,
      outcome: None,
      rx: ctx.store.subscribe::<K>(),
      _kind: PhantomData,
    }
  }

  /// Current view. The first call also starts the mount effect.
  pub fn render(&mut self) -> HookView<K::Payload> {
    let view = self.view();
    if self.state == MountState::NotStarted {
      self.start();
    }
    self.rx.borrow_and_update();
    view
  }

  /// Current view without touching the lifecycle.
  pub fn view(&self) -> HookView<K::Payload> {
    HookView::from_slice(&self.ctx.store.select::<K>())
  }

  pub fn slice(&self) -> Slice<K> {
    self.ctx.store.select::<K>()
  }

  pub fn state(&self) -> MountState {
    self.state
  }

  pub fn context(&self) -> &ContentContext {
    &self.ctx
  }

  pub fn outcome(&self) -> Option<&FetchOutcome> {
    self.outcome.as_ref()
  }

  /// Pick up the effect's result if it already finished.
  ///
  /// Returns `true` if the hook moved to [`MountState::Done`].
  pub fn poll(&mut self) -> bool {
    let finished = self.task.as_ref().is_some_and(|t| t.is_finished());
    if !finished {
      return false;
    }
    match self.task.take().and_then(|t| t.now_or_never()) {
      Some(result) => {
        self.finish(result);
        true
      }
      None => false,
    }
  }

  /// Wait for the mount effect to finish.
  pub async fn settled(&mut self) -> Option<&FetchOutcome> {
    if let Some(task) = self.task.take() {
      let result = task.await;
      self.finish(result);
    }
    self.outcome.as_ref()
  }

  /// Wait until the slice changes after the last render.
  /// Returns `false` if the store is gone.
  pub async fn changed(&mut self) -> bool {
    self.rx.changed().await.is_ok()
  }

  fn start(&mut self) {
    let cached = self.ctx.store.select::<K>().last_fetched_at().is_some();
    if cached {
      debug!(slice = K::KEY, "using cached content, checking for updates");
    } else {
      debug!(slice = K::KEY, "no cached content, fetching");
    }
    let effect = K::mount_effect(self.ctx.clone(), self.params.clone());
    self.task = Some(tokio::spawn(effect));
    self.state = MountState::InFlight;
  }

  fn finish(&mut self, result: Result<FetchOutcome, tokio::task::JoinError>) {
    let outcome = result.unwrap_or_else(|e| {
      warn!(slice = K::KEY, error = %e, "refresh task ended abnormally");
      FetchOutcome::Failed(FetchError::Transport(format!("refresh task ended: {}", e)))
    });
    self.outcome = Some(outcome);
    self.state = MountState::Done;
  }
}

/// Dependencies compared by identity rather than value.
pub trait Identity: Clone {
  fn same(&self, other: &Self) -> bool;
}

impl<T: ?Sized> Identity for Arc<T> {
  fn same(&self, other: &Self) -> bool {
    Arc::ptr_eq(self, other)
  }
}

impl<A: Identity, B: Identity> Identity for (A, B) {
  fn same(&self, other: &Self) -> bool {
    self.0.same(&other.0) && self.1.same(&other.1)
  }
}

/// Derived value recomputed only when its dependencies' identity changes.
pub struct Memo<D: Identity, V> {
  cached: Option<(D, V)>,
  computations: usize,
}

impl<D: Identity, V> Memo<D, V> {
  pub fn new() -> Self {
    Self {
      cached: None,
      computations: 0,
    }
  }

  pub fn get(&mut self, deps: D, compute: impl FnOnce(&D) -> V) -> &V {
    let fresh = matches!(&self.cached, Some((prev, _)) if prev.same(&deps));
    if !fresh {
      self.cached = None;
      self.computations += 1;
    }
    let (_, value) = self.cached.get_or_insert_with(|| {
      let value = compute(&deps);
      (deps, value)
    });
    value
  }

  /// How many times the value was computed.
  pub fn computations(&self) -> usize {
    self.computations
  }
}

impl<D: Identity, V> Default for Memo<D, V> {
  fn default() -> Self {
    Self::new()
  }
}
