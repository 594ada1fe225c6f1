//! Bookkeeping for long-lived streaming calls.
//!
//! Every server-streaming, client-streaming and bidirectional call registers
//! with [`StreamLifecycle`] and holds the returned [`StreamGuard`] until it
//! finishes. Shutdown uses the in-flight count to drain gracefully and a
//! shared [`CancellationToken`] to interrupt whatever is left.

use crate::server::telemetry::{
    decrement_streams_inflight, increment_streams_inflight, record_stream_duration,
};
use core::time::Duration;
use employee_tonic_core::Error;
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use std::{sync::Arc, time::Instant};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct StreamLifecycle {
    accepting: AtomicBool,
    inflight: Arc<AtomicUsize>,
    shutdown_token: CancellationToken,
    drain_timeout: Duration,
}

/// Held by a streaming call for as long as it produces or consumes messages.
#[derive(Debug)]
pub struct StreamGuard {
    inflight: Arc<AtomicUsize>,
    started: Instant,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.inflight.fetch_sub(1, Ordering::AcqRel);
        decrement_streams_inflight();
        record_stream_duration(self.started.elapsed().as_millis() as f64);
    }
}

impl StreamLifecycle {
    pub fn new(drain_timeout: Duration) -> Self {
        Self {
            accepting: AtomicBool::new(true),
            inflight: Arc::new(AtomicUsize::new(0)),
            shutdown_token: CancellationToken::new(),
            drain_timeout,
        }
    }

    /// Registers a new streaming call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceShutdown`] once shutdown has begun.
    pub fn register(&self) -> Result<StreamGuard, Error> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(Error::ServiceShutdown);
        }

        self.inflight.fetch_add(1, Ordering::AcqRel);
        increment_streams_inflight();
        Ok(StreamGuard {
            inflight: Arc::clone(&self.inflight),
            started: Instant::now(),
        })
    }

    /// Token cancelled once the drain window has elapsed.
    pub fn token(&self) -> CancellationToken {
        self.shutdown_token.child_token()
    }

    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    /// Gracefully winds down all streaming calls.
    ///
    /// - Refuses new streams.
    /// - Waits up to the drain timeout for in-flight streams to finish.
    /// - Cancels the shared token so that remaining streams stop.
    pub async fn shutdown(&self) {
        // === Phase 0: Stop accepting new streams ===
        tracing::info!("Refusing new streams");
        self.accepting.store(false, Ordering::Release);

        // === Phase 1: Wait for in-flight streams to drain ===
        tracing::info!("Draining in-flight streams ({} active)", self.inflight());
        let drain_result = timeout(self.drain_timeout, async {
            while self.inflight() > 0 {
                sleep(Duration::from_millis(50)).await;
            }
        })
        .await;

        match drain_result {
            Ok(()) => tracing::debug!("All in-flight streams drained"),
            Err(_) => tracing::warn!(
                "Graceful drain timed out ({} streams still active)",
                self.inflight()
            ),
        }

        // === Phase 2: Interrupt whatever is left ===
        tracing::debug!("Cancelling remaining streams via shutdown token");
        self.shutdown_token.cancel();
    }
}
