// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Rhythm gameplay core.
//!
//! This module counts beats into a tempo-establishment phase followed by
//! bars and phrases, judges player inputs against the beat, and tracks the
//! combo-driven power arc.

pub mod combo;
pub mod effects;
pub mod engine;
pub mod judge;
pub mod looping;
pub mod phrase;
pub mod target;

pub use combo::ComboTracker;
pub use effects::{Effect, EffectKind, EffectQueue};
pub use engine::{BeatIgnored, BeatOutcome, RhythmEngine};
pub use judge::{ActionKind, HitTiming, HitWindows, InputResult, InputTiming};
pub use looping::{LoopClock, LoopCoordinator, LoopSignal, MusicLoopMonitor};
pub use phrase::{BeatAdvance, PhraseCounter};
pub use target::{DamageableTarget, Position, PositionProvider, SharedTarget, TargetId};

/// Where the engine is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RhythmPhase {
    /// Not counting beats
    Stopped,
    /// A music loop restart is in progress
    Restarting,
    /// Counting priming beats
    TempoEstablishing { beat: u32, target: u32 },
    /// Tracking bar and beat within the phrase
    SteadyState { bar: u32, beat: u32 },
}

impl RhythmPhase {
    /// Whether inputs can be judged in this phase
    pub fn accepts_input(&self) -> bool {
        matches!(
            self,
            RhythmPhase::TempoEstablishing { .. } | RhythmPhase::SteadyState { .. }
        )
    }
}

/// Read-only view of the engine for one rendered frame
#[derive(Debug, Clone, PartialEq)]
pub struct RhythmSnapshot {
    pub phase: RhythmPhase,
    pub running: bool,
    pub active: bool,
    pub combo: u32,
    pub max_combo: u32,
    pub arc_growth_level: u32,
    pub power_arc_active: bool,
    pub power_arc_intensity: f32,
    pub bar_progress: f64,
    pub phrase_progress: f64,
    pub tempo_progress: f64,
    pub global_beat_count: u64,
    pub loop_restart_count: u32,
    pub effects: Vec<Effect>,
}
