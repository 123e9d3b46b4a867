use axum::http::HeaderValue;
use futures::future::{BoxFuture, FutureExt, Shared};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub type RefreshOutcome = Option<Vec<HeaderValue>>;

type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Coalesces concurrent refreshes of the same session into one call.
///
/// Keyed by a digest of the caller's cookie header so raw tokens are never
/// held as map keys. Entries live only while the refresh is in flight.
#[derive(Default)]
pub struct RefreshGate {
    inflight: Mutex<HashMap<[u8; 32], (u64, InFlight)>>,
    next_id: AtomicU64,
}

impl RefreshGate {
    pub fn key_for(cookie: Option<&HeaderValue>) -> [u8; 32] {
        let digest = Sha256::digest(cookie.map(HeaderValue::as_bytes).unwrap_or_default());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        key
    }

    /// Join the refresh already running for `key`, or start one with `start`
    pub async fn run<F>(&self, key: [u8; 32], start: F) -> RefreshOutcome
    where
        F: FnOnce() -> BoxFuture<'static, RefreshOutcome>,
    {
        let (id, shared) = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            match inflight.get(&key) {
                Some((id, shared)) => {
                    tracing::debug!("Joining in-flight session refresh");
                    (*id, shared.clone())
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let shared = start().shared();
                    inflight.insert(key, (id, shared.clone()));
                    (id, shared)
                }
            }
        };

        let outcome = shared.await;

        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if inflight.get(&key).map(|(current, _)| *current == id).unwrap_or(false) {
            inflight.remove(&key);
        }
        outcome
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.inflight.lock().map(|m| m.len()).unwrap_or(0)
    }
}
