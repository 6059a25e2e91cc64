//! Scripted content source for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use super::traits::{ContentSource, Envelope, FetchError, Params};

/// Answers each endpoint with a canned result and records every call.
#[derive(Default)]
pub struct ScriptedSource {
  responses: Mutex<HashMap<String, Result<Envelope, FetchError>>>,
  calls: Mutex<Vec<(String, Params)>>,
  gate: Mutex<Option<Arc<Semaphore>>>,
}

impl ScriptedSource {
  pub fn new() -> Self {
    Self::default()
  }

  /// Answer `endpoint` with `response` from now on.
  pub fn respond(&self, endpoint: &str, response: Result<Envelope, FetchError>) {
    self
      .responses
      .lock()
      .unwrap()
      .insert(endpoint.to_string(), response);
  }

  /// Make every request wait for a permit on the returned semaphore.
  pub fn hold(&self) -> Arc<Semaphore> {
    let gate = Arc::new(Semaphore::new(0));
    *self.gate.lock().unwrap() = Some(gate.clone());
    gate
  }

  pub fn calls(&self, endpoint: &str) -> usize {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter(|(e, _)| e == endpoint)
      .count()
  }

  pub fn total_calls(&self) -> usize {
    self.calls.lock().unwrap().len()
  }

  pub fn last_params(&self, endpoint: &str) -> Option<Params> {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .rev()
      .find(|(e, _)| e == endpoint)
      .map(|(_, p)| p.clone())
  }
}

#[async_trait]
impl ContentSource for ScriptedSource {
  async fn get(&self, endpoint: &str, params: &Params) -> Result<Envelope, FetchError> {
    self
      .calls
      .lock()
      .unwrap()
      .push((endpoint.to_string(), params.clone()));

    let gate = self.gate.lock().unwrap().clone();
    if let Some(gate) = gate {
      if let Ok(permit) = gate.acquire().await {
        permit.forget();
      }
    }

    self
      .responses
      .lock()
      .unwrap()
      .get(endpoint)
      .cloned()
      .unwrap_or_else(|| Err(FetchError::Transport(format!("no response scripted for {}", endpoint))))
  }
}

/// Let spawned tasks run until `done` holds or the budget runs out.
pub async fn settle(mut done: impl FnMut() -> bool) -> bool {
  for _ in 0..100 {
    if done() {
      return true;
    }
    tokio::task::yield_now().await;
  }
  done()
}
