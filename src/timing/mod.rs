// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing and clock module.
//!
//! This module provides monotonic time sources, the drift-free beat clock
//! and the thread that drives it.

pub mod clock;
pub mod runner;
pub mod source;

pub use clock::{BeatClock, BeatEvent, BeatListener, ClockState, MAX_BPM, MIN_BPM};
pub use runner::{BeatClockHandle, ClockCommand};
pub use source::{millis_to_duration, ManualTimeSource, Millis, SystemTimeSource, TimeSource};
