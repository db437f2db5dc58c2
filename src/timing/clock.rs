// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Drift-free beat clock.
//!
//! Beat deadlines are always computed from a fixed reference timestamp
//! (`reference + n * interval`), never by chaining fixed delays, so
//! scheduling error on one beat never carries over into the next.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::source::{millis_to_duration, Millis, TimeSource};

/// Slowest supported tempo
pub const MIN_BPM: f64 = 20.0;
/// Fastest supported tempo
pub const MAX_BPM: f64 = 300.0;

/// Shortest delay the clock will ask a timer to wait
pub const MIN_SCHEDULE_DELAY: Duration = Duration::from_millis(1);

/// How early a timer may wake and still fire its beat
const EARLY_FIRE_TOLERANCE_MS: Millis = 0.5;

/// Beat clock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
}

/// One fired beat
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    /// Beat index since the last (re)start, starting at 0
    pub index: u64,
    /// Absolute time the beat was due
    pub scheduled_ms: Millis,
    /// Time the beat actually fired
    pub fired_ms: Millis,
}

impl BeatEvent {
    /// How late the beat fired relative to its deadline
    pub fn lateness_ms(&self) -> Millis {
        self.fired_ms - self.scheduled_ms
    }
}

/// Receiver of beat notifications.
pub trait BeatListener {
    /// Called exactly once per fired beat
    fn handle_beat(&mut self, event: &BeatEvent);

    /// Whether the listener still wants beats. The clock checks this before
    /// every beat and stops rescheduling once it returns false.
    fn is_listening(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingBeat {
    index: u64,
    deadline: Millis,
}

/// Precision beat scheduler anchored to a monotonic time source
pub struct BeatClock {
    time: Arc<dyn TimeSource>,
    /// Current tempo in BPM
    bpm: f64,
    state: ClockState,
    /// Time of the beat at `reference_index`; set lazily on the first tick
    reference_beat_time: Option<Millis>,
    reference_index: u64,
    /// Index of the next beat that has not fired yet
    next_index: u64,
    pending: Option<PendingBeat>,
    last_beat: Option<BeatEvent>,
    beats_fired: u64,
    /// Beats dropped because the clock woke more than an interval late
    skipped_beats: u64,
}

impl BeatClock {
    /// Create a stopped clock at the given tempo
    pub fn new(time: Arc<dyn TimeSource>, bpm: f64) -> Self {
        Self {
            time,
            bpm: sanitize_bpm(bpm, 120.0),
            state: ClockState::Stopped,
            reference_beat_time: None,
            reference_index: 0,
            next_index: 0,
            pending: None,
            last_beat: None,
            beats_fired: 0,
            skipped_beats: 0,
        }
    }

    /// Current tempo in BPM
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Milliseconds between beats
    pub fn beat_interval_ms(&self) -> Millis {
        60_000.0 / self.bpm
    }

    /// Current clock state
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Whether the clock is running
    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    /// Reference timestamp of the current grid, if established
    pub fn reference_beat_time(&self) -> Option<Millis> {
        self.reference_beat_time
    }

    /// Beats fired since the last (re)start
    pub fn beats_fired(&self) -> u64 {
        self.beats_fired
    }

    /// Beats skipped because of stalls since the last (re)start
    pub fn skipped_beats(&self) -> u64 {
        self.skipped_beats
    }

    /// The most recently fired beat
    pub fn last_beat(&self) -> Option<BeatEvent> {
        self.last_beat
    }

    /// Deadline of the beat currently scheduled
    pub fn pending_deadline(&self) -> Option<Millis> {
        self.pending.map(|p| p.deadline)
    }

    /// Start the clock. Nothing fires until the first [`schedule_next`]
    /// call establishes the reference time.
    ///
    /// [`schedule_next`]: BeatClock::schedule_next
    pub fn start(&mut self, bpm: f64) {
        self.bpm = sanitize_bpm(bpm, self.bpm);
        self.state = ClockState::Running;
        self.reset_grid();
        info!(bpm = self.bpm, interval_ms = self.beat_interval_ms(), "Beat clock started");
    }

    /// Restart the grid at the current tempo. The next tick becomes the new
    /// reference, exactly as after [`start`](BeatClock::start).
    pub fn restart(&mut self) {
        let bpm = self.bpm;
        self.start(bpm);
    }

    /// Stop the clock and cancel the pending beat
    pub fn stop(&mut self) {
        if self.state == ClockState::Running {
            info!(beats_fired = self.beats_fired, "Beat clock stopped");
        }
        self.state = ClockState::Stopped;
        self.pending = None;
    }

    /// Change tempo. While running, the grid is re-anchored on the last
    /// fired beat so beat indices stay continuous.
    pub fn set_bpm(&mut self, bpm: f64) {
        let bpm = sanitize_bpm(bpm, self.bpm);
        if (bpm - self.bpm).abs() < f64::EPSILON {
            return;
        }
        self.bpm = bpm;
        if let Some(last) = self.last_beat {
            self.reference_beat_time = Some(last.scheduled_ms);
            self.reference_index = last.index;
        }
        self.pending = None;
        debug!(bpm, "Beat clock tempo changed");
    }

    /// Compute the next beat deadline and return how long to wait for it.
    ///
    /// Returns `None` when the clock is stopped.
    pub fn schedule_next(&mut self) -> Option<Duration> {
        if self.state != ClockState::Running {
            return None;
        }

        let now = self.time.now_ms();
        let interval = self.beat_interval_ms();

        let Some(reference) = self.reference_beat_time else {
            // First tick: this instant is beat 0
            self.reference_beat_time = Some(now);
            self.reference_index = self.next_index;
            self.pending = Some(PendingBeat {
                index: self.next_index,
                deadline: now,
            });
            return Some(MIN_SCHEDULE_DELAY);
        };

        // The first unfired beat is always `next_index`; stale beats are
        // dropped in `fire`, not here, so a beat that is due but unfired
        // still fires exactly once.
        let deadline = reference + (self.next_index - self.reference_index) as f64 * interval;
        self.pending = Some(PendingBeat {
            index: self.next_index,
            deadline,
        });

        Some(millis_to_duration(deadline - now).max(MIN_SCHEDULE_DELAY))
    }

    /// Fire the pending beat if its deadline has been reached.
    pub fn fire(&mut self) -> Option<BeatEvent> {
        if self.state != ClockState::Running {
            return None;
        }

        let pending = self.pending?;
        let now = self.time.now_ms();
        if now + EARLY_FIRE_TOLERANCE_MS < pending.deadline {
            return None;
        }

        // A late wake fires the most recent due beat, never a burst of
        // catch-up beats.
        let (index, scheduled_ms) = match self.reference_beat_time {
            Some(reference) => {
                let interval = self.beat_interval_ms();
                let beats_elapsed = ((now - reference) / interval).floor().max(0.0) as u64;
                let latest_due = self.reference_index + beats_elapsed;
                if latest_due > pending.index {
                    let skipped = latest_due - pending.index;
                    self.skipped_beats += skipped;
                    debug!(skipped, from = pending.index, "Beat clock stalled, skipping stale beats");
                    let deadline =
                        reference + (latest_due - self.reference_index) as f64 * interval;
                    (latest_due, deadline)
                } else {
                    (pending.index, pending.deadline)
                }
            }
            None => (pending.index, pending.deadline),
        };

        self.pending = None;
        self.next_index = index + 1;
        self.beats_fired += 1;

        let event = BeatEvent {
            index,
            scheduled_ms,
            fired_ms: now,
        };
        self.last_beat = Some(event);
        Some(event)
    }

    /// Deliver the pending beat to `listener`, then schedule the next one.
    ///
    /// Stops the clock silently if the listener is no longer listening.
    /// Returns the delay until the following beat, or `None` once stopped.
    pub fn fire_into<L: BeatListener + ?Sized>(&mut self, listener: &mut L) -> Option<Duration> {
        if !listener.is_listening() {
            debug!("Beat listener went away, stopping clock");
            self.stop();
            return None;
        }

        if let Some(event) = self.fire() {
            listener.handle_beat(&event);
        }
        self.schedule_next()
    }

    /// Time until the pending beat is due
    pub fn time_until_next_beat(&self) -> Duration {
        match (self.state, self.pending) {
            (ClockState::Running, Some(pending)) => {
                millis_to_duration(pending.deadline - self.time.now_ms())
            }
            _ => Duration::ZERO,
        }
    }

    fn reset_grid(&mut self) {
        self.reference_beat_time = None;
        self.reference_index = 0;
        self.next_index = 0;
        self.pending = None;
        self.last_beat = None;
        self.beats_fired = 0;
        self.skipped_beats = 0;
    }
}

impl std::fmt::Debug for BeatClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeatClock")
            .field("bpm", &self.bpm)
            .field("state", &self.state)
            .field("reference_beat_time", &self.reference_beat_time)
            .field("next_index", &self.next_index)
            .field("beats_fired", &self.beats_fired)
            .finish()
    }
}

fn sanitize_bpm(bpm: f64, fallback: f64) -> f64 {
    if bpm.is_finite() && bpm > 0.0 {
        bpm.clamp(MIN_BPM, MAX_BPM)
    } else {
        warn!(bpm, fallback, "Ignoring invalid BPM");
        fallback
    }
}
