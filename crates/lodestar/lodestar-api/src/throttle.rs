use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum spacing between consecutive requests.
///
/// Not a token bucket: a request waits until `spacing` has passed since the
/// previous one completed. Requests are serialized while waiting.
pub struct Throttle {
    spacing: Duration,
    last_done: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last_done: Mutex::new(None),
        }
    }

    pub async fn run<F, T>(&self, request: F) -> T
    where
        F: Future<Output = T>,
    {
        let mut last_done = self.last_done.lock().await;
        if let Some(prev) = *last_done {
            let elapsed = prev.elapsed();
            if elapsed < self.spacing {
                tokio::time::sleep(self.spacing - elapsed).await;
            }
        }
        let out = request.await;
        *last_done = Some(Instant::now());
        out
    }
}
