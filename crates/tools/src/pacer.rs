//! Batch pacer — an explicit delay-between-batches primitive.
//!
//! Multi-record handlers that fan out one remote call per record must not
//! hammer the CRM's rate limits. The pacer pauses after every full batch;
//! handlers call `pause_if_batch_end` with the index they just processed.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Pacer {
    batch_size: usize,
    delay: Duration,
}

impl Pacer {
    pub fn new(batch_size: usize, delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            delay,
        }
    }

    /// Sleep once per completed batch. `index` is zero-based; the pause
    /// lands after items batch_size-1, 2*batch_size-1, and so on, but never
    /// after the final item (the caller passes `total` to suppress it).
    pub async fn pause_if_batch_end(&self, index: usize, total: usize) {
        let is_batch_end = (index + 1) % self.batch_size == 0;
        let is_last = index + 1 == total;
        if is_batch_end && !is_last && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl Default for Pacer {
    /// 5 records per batch, half a second between batches.
    fn default() -> Self {
        Self::new(5, Duration::from_millis(500))
    }
}
