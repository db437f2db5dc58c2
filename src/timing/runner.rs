// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Dedicated beat clock thread.
//!
//! The thread owns a [`BeatClock`] and sleeps until each absolute deadline
//! by waiting on its command channel with `recv_timeout`. A command wakes it
//! early; a timeout means the beat is due.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::clock::{BeatClock, BeatListener};
use super::source::Millis;
use crate::error::{Result, RhythmError};

/// Commands accepted by the clock thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockCommand {
    /// Re-anchor the grid; the next tick becomes beat 0
    Restart,
    /// Change tempo, keeping beat indices continuous
    SetBpm(f64),
    /// Stop the clock and end the thread
    Stop,
}

/// Counters shared between the clock thread and its handle
#[derive(Debug, Default)]
struct Heartbeat {
    alive: AtomicBool,
    beats_fired: AtomicU64,
    /// Bits of the `f64` fire time of the last beat
    last_beat_ms: AtomicU64,
}

/// Handle to a running beat clock thread
pub struct BeatClockHandle {
    commands: Sender<ClockCommand>,
    heartbeat: Arc<Heartbeat>,
    thread: Option<JoinHandle<()>>,
}

impl BeatClockHandle {
    /// Spawn the clock thread, delivering beats to `listener`.
    ///
    /// The clock is started at its current tempo if it is not running yet.
    pub fn spawn<L>(mut clock: BeatClock, listener: Arc<Mutex<L>>) -> Result<Self>
    where
        L: BeatListener + Send + 'static,
    {
        if !clock.is_running() {
            let bpm = clock.bpm();
            clock.start(bpm);
        }

        let (tx, rx) = mpsc::channel();
        let heartbeat = Arc::new(Heartbeat::default());
        heartbeat.alive.store(true, Ordering::SeqCst);

        let thread_heartbeat = Arc::clone(&heartbeat);
        let thread = thread::Builder::new()
            .name("beat-clock".to_string())
            .spawn(move || {
                run_clock(clock, listener, rx, &thread_heartbeat);
                thread_heartbeat.alive.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                warn!(error = %e, "Beat clock thread could not be started");
                heartbeat.alive.store(false, Ordering::SeqCst);
                RhythmError::ClockSpawn(e)
            })?;

        Ok(Self {
            commands: tx,
            heartbeat,
            thread: Some(thread),
        })
    }

    /// Whether the clock thread is still scheduling beats
    pub fn is_alive(&self) -> bool {
        self.heartbeat.alive.load(Ordering::SeqCst)
    }

    /// Total beats delivered since the thread started
    pub fn beats_fired(&self) -> u64 {
        self.heartbeat.beats_fired.load(Ordering::SeqCst)
    }

    /// Fire time of the last delivered beat
    pub fn last_beat_ms(&self) -> Option<Millis> {
        if self.beats_fired() == 0 {
            return None;
        }
        Some(f64::from_bits(self.heartbeat.last_beat_ms.load(Ordering::SeqCst)))
    }

    /// Re-anchor the beat grid on the next tick
    pub fn restart(&self) -> Result<()> {
        self.send(ClockCommand::Restart)
    }

    /// Change the tempo of the running clock
    pub fn set_bpm(&self, bpm: f64) -> Result<()> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(RhythmError::InvalidBpm(bpm));
        }
        self.send(ClockCommand::SetBpm(bpm))
    }

    /// Stop the clock and wait for the thread to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn send(&self, command: ClockCommand) -> Result<()> {
        if !self.is_alive() {
            return Err(RhythmError::ClockStopped);
        }
        self.commands
            .send(command)
            .map_err(|_| RhythmError::ClockStopped)
    }

    fn shutdown(&mut self) {
        let _ = self.commands.send(ClockCommand::Stop);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for BeatClockHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_clock<L>(
    mut clock: BeatClock,
    listener: Arc<Mutex<L>>,
    commands: Receiver<ClockCommand>,
    heartbeat: &Heartbeat,
) where
    L: BeatListener,
{
    info!(bpm = clock.bpm(), "Beat clock thread running");

    while let Some(delay) = clock.schedule_next() {
        match commands.recv_timeout(delay) {
            Ok(ClockCommand::Restart) => {
                clock.restart();
                continue;
            }
            Ok(ClockCommand::SetBpm(bpm)) => {
                clock.set_bpm(bpm);
                continue;
            }
            Ok(ClockCommand::Stop) | Err(RecvTimeoutError::Disconnected) => {
                clock.stop();
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        let Ok(mut listener) = listener.lock() else {
            warn!("Beat listener lock poisoned, stopping clock");
            clock.stop();
            break;
        };

        if !listener.is_listening() {
            debug!("Beat listener stopped listening");
            clock.stop();
            break;
        }

        if let Some(event) = clock.fire() {
            listener.handle_beat(&event);
            heartbeat
                .last_beat_ms
                .store(event.fired_ms.to_bits(), Ordering::SeqCst);
            heartbeat.beats_fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    info!(
        beats_fired = clock.beats_fired(),
        skipped = clock.skipped_beats(),
        "Beat clock thread finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::{BeatEvent, SystemTimeSource};
    use std::time::Duration;

    struct Collector {
        events: Vec<BeatEvent>,
        listening: bool,
    }

    impl BeatListener for Collector {
        fn handle_beat(&mut self, event: &BeatEvent) {
            self.events.push(*event);
        }

        fn is_listening(&self) -> bool {
            self.listening
        }
    }

    fn collector() -> Arc<Mutex<Collector>> {
        Arc::new(Mutex::new(Collector {
            events: Vec::new(),
            listening: true,
        }))
    }

    #[test]
    fn test_thread_delivers_beats() {
        let time = Arc::new(SystemTimeSource::new());
        let clock = BeatClock::new(time, 300.0); // 200ms interval
        let listener = collector();

        let handle = BeatClockHandle::spawn(clock, Arc::clone(&listener)).unwrap();
        thread::sleep(Duration::from_millis(750));
        assert!(handle.is_alive());
        handle.stop();

        let events = listener.lock().unwrap().events.clone();
        assert!(events.len() >= 3, "got {} beats", events.len());
        for (k, event) in events.iter().enumerate() {
            assert_eq!(event.index, k as u64);
        }
    }

    #[test]
    fn test_thread_stops_when_listener_leaves() {
        let time = Arc::new(SystemTimeSource::new());
        let clock = BeatClock::new(time, 300.0);
        let listener = collector();

        let handle = BeatClockHandle::spawn(clock, Arc::clone(&listener)).unwrap();
        thread::sleep(Duration::from_millis(50));
        listener.lock().unwrap().listening = false;
        thread::sleep(Duration::from_millis(400));

        assert!(!handle.is_alive());
        assert!(matches!(handle.restart(), Err(RhythmError::ClockStopped)));
    }

    #[test]
    fn test_set_bpm_rejects_invalid() {
        let time = Arc::new(SystemTimeSource::new());
        let clock = BeatClock::new(time, 120.0);
        let handle = BeatClockHandle::spawn(clock, collector()).unwrap();

        assert!(matches!(handle.set_bpm(0.0), Err(RhythmError::InvalidBpm(_))));
        assert!(handle.set_bpm(140.0).is_ok());
    }

    #[test]
    fn test_restart_reanchors_grid() {
        let time = Arc::new(SystemTimeSource::new());
        let clock = BeatClock::new(time, 300.0);
        let listener = collector();

        let handle = BeatClockHandle::spawn(clock, Arc::clone(&listener)).unwrap();
        thread::sleep(Duration::from_millis(300));
        handle.restart().unwrap();
        thread::sleep(Duration::from_millis(100));
        handle.stop();

        let events = listener.lock().unwrap().events.clone();
        // Indices start over at 0 after the restart
        let restarts = events.iter().filter(|e| e.index == 0).count();
        assert_eq!(restarts, 2);
    }
}
