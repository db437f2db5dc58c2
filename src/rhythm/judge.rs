// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Hit-timing judgement.
//!
//! An input is judged by its distance to the nearest beat boundary, either
//! the beat that just happened or the one about to happen. There is no
//! offset or drift compensation: the windows are applied to the raw
//! distance.

use crate::timing::Millis;

use super::target::TargetId;

/// Timing tier of a judged input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitTiming {
    Perfect,
    Excellent,
    Miss,
}

impl HitTiming {
    /// Whether this tier counts as a hit
    pub fn is_hit(&self) -> bool {
        !matches!(self, HitTiming::Miss)
    }
}

/// Outcome of [`handle_input`](super::RhythmEngine::handle_input)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTiming {
    /// Within the perfect window
    Perfect,
    /// Within the excellent window
    Excellent,
    /// Outside every window; combo was reset
    Miss,
    /// The engine is hidden or stopped
    Inactive,
    /// No beat has been received yet
    Waiting,
    /// A music loop restart is in progress
    Restarting,
    /// Too soon after the previous judged input
    Cooldown,
    /// A second success for a beat that was already credited
    Duplicate,
}

impl InputTiming {
    /// Whether this outcome changed combo state
    pub fn is_judged(&self) -> bool {
        matches!(self, InputTiming::Perfect | InputTiming::Excellent | InputTiming::Miss)
    }
}

impl From<HitTiming> for InputTiming {
    fn from(timing: HitTiming) -> Self {
        match timing {
            HitTiming::Perfect => InputTiming::Perfect,
            HitTiming::Excellent => InputTiming::Excellent,
            HitTiming::Miss => InputTiming::Miss,
        }
    }
}

/// Player action that triggered an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Attack; a successful hit may damage a target
    Attack,
    /// Movement action; judged for combo only
    Dash,
}

impl ActionKind {
    /// Whether a successful hit with this action can damage a target
    pub fn deals_damage(&self) -> bool {
        matches!(self, ActionKind::Attack)
    }
}

/// Result of a single input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputResult {
    /// Action that was judged
    pub action: ActionKind,
    /// Whether the input was a perfect or excellent hit
    pub hit: bool,
    /// Judgement or neutral status
    pub timing: InputTiming,
    /// Combo after the input
    pub combo: u32,
    /// Target that received damage, if any
    pub target: Option<TargetId>,
    /// Distance to the nearest beat, when judged
    pub distance_ms: Option<Millis>,
}

impl InputResult {
    /// A result that changed nothing
    pub fn neutral(action: ActionKind, timing: InputTiming, combo: u32) -> Self {
        Self {
            action,
            hit: false,
            timing,
            combo,
            target: None,
            distance_ms: None,
        }
    }
}

/// Which beat boundary an input was closest to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearestBeat {
    /// The beat that was last received
    Previous,
    /// The beat expected next
    Next,
}

/// Perfect and excellent window widths
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitWindows {
    pub perfect_ms: Millis,
    pub excellent_ms: Millis,
}

impl HitWindows {
    /// Create windows
    pub fn new(perfect_ms: Millis, excellent_ms: Millis) -> Self {
        Self {
            perfect_ms,
            excellent_ms,
        }
    }

    /// Classify a distance to the nearest beat
    pub fn classify(&self, distance_ms: Millis) -> HitTiming {
        if distance_ms <= self.perfect_ms {
            HitTiming::Perfect
        } else if distance_ms <= self.excellent_ms {
            HitTiming::Excellent
        } else {
            HitTiming::Miss
        }
    }
}

impl Default for HitWindows {
    fn default() -> Self {
        Self::new(60.0, 100.0)
    }
}

/// Distance from an input to the nearest beat boundary.
///
/// `since_last_beat` is measured from the last received beat. The expected
/// next beat is one interval later; an input past that point is measured
/// against it as well, so a stalled clock cannot make late inputs perfect.
pub fn nearest_beat_distance(since_last_beat: Millis, interval_ms: Millis) -> (Millis, NearestBeat) {
    let since = since_last_beat.max(0.0);
    let to_next = (interval_ms - since).abs();
    if since <= to_next {
        (since, NearestBeat::Previous)
    } else {
        (to_next, NearestBeat::Next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Millis = 60_000.0 / 146.0;

    #[test]
    fn test_classify_tiers() {
        let windows = HitWindows::default();
        assert_eq!(windows.classify(0.0), HitTiming::Perfect);
        assert_eq!(windows.classify(60.0), HitTiming::Perfect);
        assert_eq!(windows.classify(60.1), HitTiming::Excellent);
        assert_eq!(windows.classify(100.0), HitTiming::Excellent);
        assert_eq!(windows.classify(100.1), HitTiming::Miss);
    }

    #[test]
    fn test_nearest_previous_beat() {
        let (distance, nearest) = nearest_beat_distance(59.0, INTERVAL);
        assert_eq!(distance, 59.0);
        assert_eq!(nearest, NearestBeat::Previous);
    }

    #[test]
    fn test_nearest_next_beat() {
        let (distance, nearest) = nearest_beat_distance(INTERVAL - 59.0, INTERVAL);
        assert!((distance - 59.0).abs() < 1e-9);
        assert_eq!(nearest, NearestBeat::Next);
    }

    #[test]
    fn test_late_input_after_missing_beat() {
        // No beat arrived for 1.5 intervals: distance is to the overdue beat
        let (distance, nearest) = nearest_beat_distance(INTERVAL * 1.5, INTERVAL);
        assert!((distance - INTERVAL * 0.5).abs() < 1e-9);
        assert_eq!(nearest, NearestBeat::Next);
        assert_eq!(HitWindows::default().classify(distance), HitTiming::Miss);
    }

    #[test]
    fn test_negative_elapsed_clamped() {
        let (distance, nearest) = nearest_beat_distance(-5.0, INTERVAL);
        assert_eq!(distance, 0.0);
        assert_eq!(nearest, NearestBeat::Previous);
    }

    #[test]
    fn test_input_timing_from_hit() {
        assert_eq!(InputTiming::from(HitTiming::Excellent), InputTiming::Excellent);
        assert!(InputTiming::Miss.is_judged());
        assert!(!InputTiming::Cooldown.is_judged());
        assert!(HitTiming::Perfect.is_hit());
        assert!(!HitTiming::Miss.is_hit());
    }
}
