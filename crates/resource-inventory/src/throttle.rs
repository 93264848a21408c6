// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Outbound API call throttling.
//!
//! Two guards compose here: a requests-per-second window budget (the primary
//! throttle) and an in-flight concurrency ceiling (the secondary guard, which
//! should rarely trigger because the window budget kicks in first). Callers
//! `acquire()` before every provider call; the returned permit bounds
//! concurrency for as long as it is held.
//!
//! The window counters are the only mutable state shared between concurrent
//! enumeration tasks; they sit behind an async mutex.

use std::time::Duration;

use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::{sleep, Instant};

const WINDOW: Duration = Duration::from_secs(1);

struct Window {
    started: Instant,
    used: u32,
}

/// A per-service call budget: at most `requests_per_second` acquisitions per
/// one-second window, and at most `max_in_flight` permits held at once.
pub struct Throttle {
    limit: u32,
    window: Mutex<Window>,
    in_flight: Semaphore,
}

/// Held for the duration of one in-flight call.
pub struct ThrottlePermit<'a> {
    _permit: SemaphorePermit<'a>,
}

impl Throttle {
    /// `requests_per_second` is clamped to at least 1 so an integer budget
    /// split (e.g. a shared rate divided across call types) can never stall
    /// the pipeline entirely.
    #[must_use]
    pub fn new(requests_per_second: u32, max_in_flight: usize) -> Self {
        Throttle {
            limit: requests_per_second.max(1),
            window: Mutex::new(Window {
                started: Instant::now(),
                used: 0,
            }),
            in_flight: Semaphore::new(max_in_flight),
        }
    }

    /// Waits until both the window budget and an in-flight slot are
    /// available.
    pub async fn acquire(&self) -> ThrottlePermit<'_> {
        // The semaphore is never closed, so acquisition can only fail if the
        // throttle itself is gone.
        #[allow(clippy::expect_used)]
        let permit = self
            .in_flight
            .acquire()
            .await
            .expect("throttle semaphore closed");

        loop {
            let mut window = self.window.lock().await;
            let now = Instant::now();
            if now.duration_since(window.started) >= WINDOW {
                window.started = now;
                window.used = 0;
            }
            if window.used < self.limit {
                window.used += 1;
                return ThrottlePermit { _permit: permit };
            }
            let wait = WINDOW - now.duration_since(window.started);
            drop(window);
            sleep(wait).await;
        }
    }
}
