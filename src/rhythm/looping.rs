// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Background music loop handling.
//!
//! The music track loops every `loop_duration_ms`. Shortly before the loop
//! boundary the engine is told to prepare; when playback wraps the engine's
//! counters are reset and the beat clock is re-anchored to the new loop.

use std::sync::Arc;

use tracing::{debug, warn};

use super::engine::RhythmEngine;
use crate::config::MusicLoopConfig;
use crate::error::Result;
use crate::timing::{BeatClock, BeatClockHandle, Millis, TimeSource};

/// Loop boundary notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopSignal {
    /// Playback entered the lead window before the loop boundary
    Prepare,
    /// Playback wrapped to the start of the track
    Restart,
}

/// Watches a music playback position for loop boundaries
#[derive(Debug, Clone)]
pub struct MusicLoopMonitor {
    config: MusicLoopConfig,
    last_position: Option<Millis>,
    prepared: bool,
    loops: u32,
}

impl MusicLoopMonitor {
    pub fn new(config: MusicLoopConfig) -> Self {
        Self {
            config,
            last_position: None,
            prepared: false,
            loops: 0,
        }
    }

    /// Track length
    pub fn loop_duration_ms(&self) -> Millis {
        self.config.loop_duration_ms
    }

    /// Completed loops seen so far
    pub fn loops(&self) -> u32 {
        self.loops
    }

    /// Playback position within the track after `elapsed_ms` of playback
    pub fn position_at(&self, elapsed_ms: Millis) -> Millis {
        elapsed_ms.max(0.0) % self.config.loop_duration_ms
    }

    /// Feed the current playback position.
    ///
    /// Returns [`LoopSignal::Prepare`] once per loop when the position enters
    /// the lead window, and [`LoopSignal::Restart`] when the position moves
    /// backwards.
    pub fn poll(&mut self, position_ms: Millis) -> Option<LoopSignal> {
        let previous = self.last_position.replace(position_ms);

        if previous.is_some_and(|p| position_ms < p) {
            self.prepared = false;
            self.loops += 1;
            return Some(LoopSignal::Restart);
        }

        let lead_start = self.config.loop_duration_ms - self.config.prepare_lead_ms;
        if !self.prepared && position_ms >= lead_start {
            self.prepared = true;
            return Some(LoopSignal::Prepare);
        }
        None
    }

    /// Forget the last position, e.g. when playback is restarted manually
    pub fn reset(&mut self) {
        self.last_position = None;
        self.prepared = false;
    }
}

/// A beat clock that can be re-anchored on a loop restart
pub trait LoopClock {
    fn restart_clock(&mut self) -> Result<()>;
}

impl LoopClock for BeatClock {
    fn restart_clock(&mut self) -> Result<()> {
        self.restart();
        Ok(())
    }
}

impl LoopClock for BeatClockHandle {
    fn restart_clock(&mut self) -> Result<()> {
        self.restart()
    }
}

/// Drives the loop restart protocol from elapsed playback time
pub struct LoopCoordinator {
    monitor: MusicLoopMonitor,
    time: Arc<dyn TimeSource>,
    track_started_at: Millis,
}

impl LoopCoordinator {
    /// Start tracking a track that begins playing now
    pub fn new(config: MusicLoopConfig, time: Arc<dyn TimeSource>) -> Self {
        let track_started_at = time.now_ms();
        Self {
            monitor: MusicLoopMonitor::new(config),
            time,
            track_started_at,
        }
    }

    /// Treat the track as starting over now
    pub fn restart_track(&mut self) {
        self.track_started_at = self.time.now_ms();
        self.monitor.reset();
    }

    /// Current playback position within the track
    pub fn position_ms(&self) -> Millis {
        self.monitor
            .position_at(self.time.now_ms() - self.track_started_at)
    }

    /// The underlying monitor
    pub fn monitor(&self) -> &MusicLoopMonitor {
        &self.monitor
    }

    /// Check the playback position and apply any loop signal to the engine
    /// and clock.
    ///
    /// The engine lock must not be held by the clock thread while this runs.
    pub fn poll<C: LoopClock + ?Sized>(
        &mut self,
        engine: &mut RhythmEngine,
        clock: &mut C,
    ) -> Option<LoopSignal> {
        let signal = self.monitor.poll(self.position_ms())?;
        match signal {
            LoopSignal::Prepare => engine.prepare_for_loop_restart(),
            LoopSignal::Restart => {
                engine.restart_for_loop();
                if let Err(e) = clock.restart_clock() {
                    warn!("Failed to restart beat clock for loop: {}", e);
                }
                debug!(loops = self.monitor.loops(), "Loop restart applied");
            }
        }
        Some(signal)
    }
}
