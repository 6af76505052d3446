//! Per-key single-flight coordination.
//!
//! Concurrent callers asking for the same key share one execution of the
//! generation work. The first caller becomes the leader and spawns the work
//! onto the runtime; everyone (leader included) then waits on a `watch`
//! channel for the shared result.
//!
//! Spawning detaches the work from the callers: if every caller goes away
//! (for example an HTTP client disconnects) the generation still runs to
//! completion and populates the cache for the next request.
//!
//! Failures are fanned out to the current waiters and then forgotten. The key
//! leaves the in-flight map as soon as the work finishes, so the next request
//! starts a fresh attempt.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::debug;

use crate::error::TileError;

type FlightResult<T> = Option<Result<T, TileError>>;

/// Map of in-flight generations keyed by cache key.
pub struct SingleFlight<K, T> {
    in_flight: Arc<Mutex<HashMap<K, watch::Receiver<FlightResult<T>>>>>,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `work` for `key`, or join the run already in progress.
    ///
    /// `work` is only polled if this caller becomes the leader. The returned
    /// flag is `true` when the result came from another caller's run.
    pub async fn run<F>(&self, key: K, work: F) -> (Result<T, TileError>, bool)
    where
        F: Future<Output = Result<T, TileError>> + Send + 'static,
    {
        let (mut rx, joined) = {
            let mut in_flight = self.in_flight.lock().await;

            if let Some(rx) = in_flight.get(&key) {
                debug!(key = ?key, "Joining in-flight generation");
                (rx.clone(), true)
            } else {
                let (tx, rx) = watch::channel(None);
                in_flight.insert(key.clone(), rx.clone());
                drop(in_flight);

                let in_flight = Arc::clone(&self.in_flight);
                tokio::spawn(async move {
                    // A panic inside the work surfaces as a JoinError here, so
                    // the key is always released.
                    let result = match tokio::spawn(work).await {
                        Ok(result) => result,
                        Err(e) => Err(TileError::conversion(format!(
                            "generation task aborted: {}",
                            e
                        ))),
                    };

                    in_flight.lock().await.remove(&key);
                    let _ = tx.send(Some(result));
                });

                (rx, false)
            }
        };

        let result = match rx.wait_for(Option::is_some).await {
            Ok(value) => value
                .clone()
                .unwrap_or_else(|| Err(TileError::conversion("generation produced no result"))),
            Err(_) => Err(TileError::conversion("generation task dropped its result")),
        };

        (result, joined)
    }

    /// Number of keys currently generating.
    #[cfg(test)]
    async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
