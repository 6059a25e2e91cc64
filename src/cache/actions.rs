//! Fetch actions: the only code that talks to the content source and then
//! dispatches the result into the store.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::slice::{PageMeta, SliceAction};
use super::store::ContentContext;
use super::traits::{ContentKind, Envelope, FetchError, FetchOutcome, Params};

/// Fetch content for `K` and reconcile it into the slice.
///
/// Never returns an error: failures are recorded on the slice and reported
/// through [`FetchOutcome::Failed`].
pub async fn fetch<K: ContentKind>(ctx: &ContentContext, params: &Params) -> FetchOutcome {
  ctx.store.dispatch::<K>(SliceAction::Pending);
  debug!(slice = K::KEY, endpoint = K::ENDPOINT, "fetch dispatched");

  let result = match ctx.source.get(K::ENDPOINT, params).await {
    Ok(envelope) => decode::<K>(envelope),
    Err(e) => Err(e),
  };

  match result {
    Ok((payload, page)) => {
      let at = ctx.store.now();
      let applied = ctx
        .store
        .dispatch::<K>(SliceAction::Fulfilled { payload, page, at });
      if applied.items_replaced {
        info!(slice = K::KEY, "content updated");
        FetchOutcome::Updated
      } else {
        debug!(slice = K::KEY, "content unchanged, keeping cached version");
        FetchOutcome::Unchanged
      }
    }
    Err(e) => {
      warn!(slice = K::KEY, error = %e, "fetch failed, keeping cached content");
      ctx.store.dispatch::<K>(SliceAction::Rejected {
        message: e.to_string(),
      });
      FetchOutcome::Failed(e)
    }
  }
}

/// Fetch, then clear the needs-refresh marker whatever the outcome.
pub async fn fetch_and_reset<K: ContentKind>(ctx: &ContentContext, params: &Params) -> FetchOutcome {
  let outcome = fetch::<K>(ctx, params).await;
  ctx.store.dispatch::<K>(SliceAction::ResetNeedsRefresh);
  outcome
}

/// Ask for a refresh on the next mount.
pub fn request_refresh<K: ContentKind>(ctx: &ContentContext) {
  ctx.store.dispatch::<K>(SliceAction::RequestRefresh);
}

/// Drop cached content for `K`, including its durable snapshot.
pub fn clear<K: ContentKind>(ctx: &ContentContext) {
  ctx.store.dispatch::<K>(SliceAction::Clear);
}

fn decode<K: ContentKind>(envelope: Envelope) -> Result<(K::Payload, PageMeta), FetchError> {
  if !envelope.success {
    return Err(FetchError::Server {
      status: None,
      message: envelope
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Failed to fetch {}", K::KEY)),
    });
  }

  let page = envelope.page_meta();
  let payload = match envelope.data {
    Value::Null => K::default_payload(),
    data => K::from_data(data).map_err(|e| FetchError::Decode {
      key: K::KEY,
      message: e.to_string(),
    })?,
  };
  Ok((payload, page))
}
