use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;

use crate::error::{AppError, AppResult};

type Outcome<T> = Result<T, String>;
type FlightTable<T> = Arc<Mutex<HashMap<String, broadcast::Sender<Outcome<T>>>>>;

/// Per-key request coalescing.
///
/// At most one computation per key is in flight. The first caller to arrive
/// spawns it as a detached task; every caller for that key, the first
/// included, waits for the published outcome for at most `wait_timeout`.
/// A caller that gives up does not cancel the computation.
pub struct SingleFlight<T> {
    in_flight: FlightTable<T>,
    wait_timeout: Duration,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            wait_timeout,
        }
    }

    /// Number of keys with a computation currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().map(|table| table.len()).unwrap_or(0)
    }

    /// Joins the flight for `key`, starting it with `compute` if none is running.
    ///
    /// Failures of the computation, a lost computation and an expired wait
    /// all surface as [`AppError::RecommendationUnavailable`].
    pub async fn run<F, Fut>(&self, key: &str, compute: F) -> AppResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let (mut rx, leader) = {
            let mut table = self
                .in_flight
                .lock()
                .map_err(|_| AppError::Internal("single-flight table poisoned".to_string()))?;

            match table.get(key) {
                Some(tx) => (tx.subscribe(), false),
                None => {
                    let (tx, rx) = broadcast::channel(1);
                    table.insert(key.to_string(), tx);
                    (rx, true)
                }
            }
        };

        if leader {
            tracing::debug!(key = %key, "Starting computation");
            let flight = Flight {
                key: key.to_string(),
                table: self.in_flight.clone(),
                landed: false,
            };
            let computation = compute();
            tokio::spawn(async move {
                let outcome = computation.await.map_err(|e| match e {
                    AppError::RecommendationUnavailable(message) => message,
                    other => other.to_string(),
                });
                flight.land(outcome);
            });
        } else {
            tracing::debug!(key = %key, "Joining in-flight computation");
        }

        match tokio::time::timeout(self.wait_timeout, rx.recv()).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(message))) => Err(AppError::RecommendationUnavailable(message)),
            Ok(Err(_)) => Err(AppError::RecommendationUnavailable(
                "computation ended without a result".to_string(),
            )),
            Err(_) => {
                tracing::warn!(
                    key = %key,
                    wait_ms = self.wait_timeout.as_millis() as u64,
                    "Gave up waiting for in-flight computation"
                );
                Err(AppError::RecommendationUnavailable(format!(
                    "timed out after {}ms waiting for computation",
                    self.wait_timeout.as_millis()
                )))
            }
        }
    }
}

/// Owned by the computation task. Removes the table entry exactly once, on
/// landing or when the task unwinds.
struct Flight<T> {
    key: String,
    table: FlightTable<T>,
    landed: bool,
}

impl<T> Flight<T> {
    fn take_sender(&mut self) -> Option<broadcast::Sender<Outcome<T>>> {
        self.landed = true;
        self.table.lock().ok()?.remove(&self.key)
    }

    fn land(mut self, outcome: Outcome<T>) {
        // Removed before sending: later callers start a fresh flight.
        if let Some(tx) = self.take_sender() {
            let _ = tx.send(outcome);
        }
    }
}

impl<T> Drop for Flight<T> {
    fn drop(&mut self) {
        if !self.landed {
            // Dropping the sender wakes every waiter with a closed channel.
            let _ = self.take_sender();
        }
    }
}
