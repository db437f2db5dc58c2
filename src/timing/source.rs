// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Monotonic time sources.
//!
//! Every timestamp in the rhythm core is a millisecond offset read from a
//! [`TimeSource`]. Production code uses [`SystemTimeSource`]; tests and the
//! headless simulation drive a [`ManualTimeSource`] by hand.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Timestamp in milliseconds from an arbitrary, fixed origin
pub type Millis = f64;

/// A monotonic, high-resolution clock.
pub trait TimeSource: Send + Sync {
    /// Current time in milliseconds. Never decreases.
    fn now_ms(&self) -> Millis;
}

/// Wall-clock time source backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    /// Create a time source whose origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// The instant corresponding to `0.0` ms
    pub fn origin(&self) -> Instant {
        self.origin
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven time source for tests and simulation
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now: Mutex<Millis>,
}

impl ManualTimeSource {
    /// Create a manual time source starting at `start_ms`
    pub fn new(start_ms: Millis) -> Self {
        Self {
            now: Mutex::new(start_ms),
        }
    }

    /// Jump to an absolute time. Earlier times are ignored so the source
    /// stays monotonic.
    pub fn set(&self, ms: Millis) {
        if let Ok(mut now) = self.now.lock() {
            if ms > *now {
                *now = ms;
            }
        }
    }

    /// Advance by a number of milliseconds
    pub fn advance(&self, ms: Millis) {
        if let Ok(mut now) = self.now.lock() {
            *now += ms.max(0.0);
        }
    }

    /// Advance by a [`Duration`]
    pub fn advance_by(&self, duration: Duration) {
        self.advance(duration.as_secs_f64() * 1000.0);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> Millis {
        self.now.lock().map(|now| *now).unwrap_or_default()
    }
}

/// Convert a millisecond span to a [`Duration`], clamping negatives to zero
pub fn millis_to_duration(ms: Millis) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}
