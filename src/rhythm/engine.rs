// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! The rhythm engine.
//!
//! Two entry points mutate engine state:
//! - [`RhythmEngine::on_beat`] advances beat and phrase counters. It never
//!   judges inputs.
//! - [`RhythmEngine::handle_input`] judges an input against the last beat and
//!   updates combo and growth. It never touches beat counters.
//!
//! [`RhythmEngine::update`] runs once per frame and only ages visual state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use super::combo::ComboTracker;
use super::effects::{Effect, EffectKind, EffectQueue};
use super::judge::{
    nearest_beat_distance, ActionKind, HitTiming, HitWindows, InputResult, InputTiming,
    NearestBeat,
};
use super::phrase::{BeatAdvance, PhraseCounter};
use super::target::{nearest_in_range, PositionProvider, SharedTarget, TargetId};
use super::{RhythmPhase, RhythmSnapshot};
use crate::config::RhythmConfig;
use crate::error::RhythmError;
use crate::timing::{BeatEvent, BeatListener, Millis, TimeSource, MAX_BPM, MIN_BPM};

/// Why a beat notification was not counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatIgnored {
    /// The engine is not running
    NotRunning,
    /// Arrived too soon after the previous beat
    Debounced,
}

/// Result of a beat notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BeatOutcome {
    /// The beat was counted
    Counted {
        global_beat_count: u64,
        advance: BeatAdvance,
    },
    /// The beat was dropped
    Ignored(BeatIgnored),
}

impl BeatOutcome {
    /// Whether the beat advanced the counters
    pub fn is_counted(&self) -> bool {
        matches!(self, BeatOutcome::Counted { .. })
    }
}

/// Beat-synchronised rhythm state machine
pub struct RhythmEngine {
    config: RhythmConfig,
    time: Arc<dyn TimeSource>,
    bpm: f64,

    running: bool,
    active: bool,
    /// Activate on the first counted beat (set by `start`)
    show_requested: bool,
    track_started: bool,
    started_at: Option<Millis>,

    phrase: PhraseCounter,
    last_beat_time: Option<Millis>,
    bar_progress: f64,
    debounced_beats: u64,

    combo: ComboTracker,
    windows: HitWindows,
    effects: EffectQueue,
    last_input_time: Option<Millis>,
    last_hit_time: Option<Millis>,
    /// Global index of the beat credited by the last successful hit
    last_hit_beat: Option<u64>,

    loop_restart_mode: bool,
    loop_restart_count: u32,

    targets: Vec<SharedTarget>,
    player: Option<Box<dyn PositionProvider>>,
}

impl RhythmEngine {
    /// Create a stopped engine
    pub fn new(config: RhythmConfig, time: Arc<dyn TimeSource>) -> Self {
        let phrase = PhraseCounter::new(
            config.tempo_establishment_beats,
            config.beats_per_bar,
            config.bars_per_phrase,
        );
        Self {
            bpm: config.bpm.clamp(MIN_BPM, MAX_BPM),
            combo: ComboTracker::new(config.max_arc_growth),
            windows: HitWindows::new(config.perfect_window_ms, config.excellent_window_ms),
            effects: EffectQueue::new(config.effect_lifetime_ms),
            phrase,
            config,
            time,
            running: false,
            active: false,
            show_requested: false,
            track_started: false,
            started_at: None,
            last_beat_time: None,
            bar_progress: 0.0,
            debounced_beats: 0,
            last_input_time: None,
            last_hit_time: None,
            last_hit_beat: None,
            loop_restart_mode: false,
            loop_restart_count: 0,
            targets: Vec::new(),
            player: None,
        }
    }

    /// Set the player position provider
    pub fn with_player(mut self, player: impl PositionProvider + 'static) -> Self {
        self.player = Some(Box::new(player));
        self
    }

    /// Register a damageable target
    pub fn with_target(mut self, target: SharedTarget) -> Self {
        self.targets.push(target);
        self
    }

    /// Replace the player position provider
    pub fn set_player(&mut self, player: Box<dyn PositionProvider>) {
        self.player = Some(player);
    }

    /// Register a damageable target
    pub fn add_target(&mut self, target: SharedTarget) {
        self.targets.push(target);
    }

    /// Remove every registered target
    pub fn clear_targets(&mut self) {
        self.targets.clear();
    }

    /// Apply new tuning. Beat counters are left alone; phrase shape and
    /// tempo changes take effect on the next start or loop restart.
    pub fn apply_config(&mut self, config: RhythmConfig) -> Result<(), RhythmError> {
        config.validate()?;
        self.windows = HitWindows::new(config.perfect_window_ms, config.excellent_window_ms);
        self.combo.set_max_growth(config.max_arc_growth);
        self.effects.set_lifetime(config.effect_lifetime_ms);
        info!(
            perfect_ms = config.perfect_window_ms,
            excellent_ms = config.excellent_window_ms,
            "Rhythm tuning applied"
        );
        self.config = config;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start beat counting and show the engine once the first beat arrives
    pub fn start(&mut self, bpm: f64) {
        self.start_background_rhythm(bpm);
        self.show_requested = true;
    }

    /// Start beat counting without showing the engine
    pub fn start_background_rhythm(&mut self, bpm: f64) {
        if bpm.is_finite() && bpm > 0.0 {
            self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        } else {
            warn!(bpm, fallback = self.bpm, "Ignoring invalid BPM");
        }
        self.running = true;
        self.active = false;
        self.show_requested = false;
        self.loop_restart_mode = false;
        self.reset_beat_counter();
        self.restart();
        info!(bpm = self.bpm, "Rhythm started");
    }

    /// Stop beat counting and hide
    pub fn stop(&mut self) {
        if self.running {
            info!(beats = self.phrase.global_beat_count(), "Rhythm stopped");
        }
        self.running = false;
        self.active = false;
        self.show_requested = false;
        self.loop_restart_mode = false;
    }

    /// Make the engine visible and accept input.
    ///
    /// Refused until the first beat has been counted. Returns whether the
    /// engine is active afterwards.
    pub fn show(&mut self) -> bool {
        if !self.running || !self.track_started || self.phrase.global_beat_count() == 0 {
            warn!(
                running = self.running,
                track_started = self.track_started,
                "Refusing to show rhythm before the first beat"
            );
            return false;
        }
        if !self.active {
            self.restart();
            self.active = true;
            debug!("Rhythm shown");
        }
        true
    }

    /// Hide the engine; beat counting continues
    pub fn hide(&mut self) {
        if self.active {
            debug!("Rhythm hidden");
        }
        self.active = false;
        self.show_requested = false;
    }

    /// Reset gameplay state only: combo, best combo, growth, effects and the
    /// input guards. Beat and phrase timing is untouched.
    pub fn restart(&mut self) {
        self.combo.reset();
        self.effects.clear();
        self.last_input_time = None;
        self.last_hit_time = None;
        self.last_hit_beat = None;
    }

    /// Zero every beat and phrase counter. The stall heartbeat restarts
    /// from now.
    pub fn reset_beat_counter(&mut self) {
        self.started_at = Some(self.time.now_ms());
        self.phrase.reset(
            self.config.tempo_establishment_beats,
            self.config.beats_per_bar,
            self.config.bars_per_phrase,
        );
        self.track_started = false;
        self.last_beat_time = None;
        self.bar_progress = 0.0;
        self.last_hit_beat = None;
    }

    /// Change tempo while running. Judgement and debounce use the new
    /// interval from the next call; counters are untouched.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), RhythmError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(RhythmError::InvalidBpm(bpm));
        }
        let bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        if (bpm - self.bpm).abs() >= f64::EPSILON {
            debug!(from = self.bpm, to = bpm, "Rhythm tempo changed");
            self.bpm = bpm;
        }
        Ok(())
    }

    /// Enter loop restart mode ahead of a music loop boundary. Counters keep
    /// running until [`restart_for_loop`](Self::restart_for_loop).
    pub fn prepare_for_loop_restart(&mut self) {
        if !self.loop_restart_mode {
            info!(
                beats = self.phrase.global_beat_count(),
                "Preparing for music loop restart"
            );
        }
        self.loop_restart_mode = true;
    }

    /// Reset for a music loop that just restarted. Loop restart mode stays
    /// on until the next beat.
    pub fn restart_for_loop(&mut self) {
        self.loop_restart_mode = true;
        self.loop_restart_count += 1;
        self.reset_beat_counter();
        self.combo.reset();
        self.effects.clear();
        self.last_input_time = None;
        self.last_hit_time = None;
        info!(loop_restarts = self.loop_restart_count, "Music loop restarted");
    }

    // ------------------------------------------------------------------
    // Beats
    // ------------------------------------------------------------------

    /// Count one beat timestamped now
    pub fn on_beat(&mut self) -> BeatOutcome {
        let now = self.time.now_ms();
        self.on_beat_at(now)
    }

    /// Count one beat that was due at `beat_time`. The only place beat and
    /// phrase counters advance.
    ///
    /// Debounce and judgement both use `beat_time`, so a late wake-up does
    /// not shift the grid or swallow the following beat.
    pub fn on_beat_at(&mut self, beat_time: Millis) -> BeatOutcome {
        if !self.running {
            return BeatOutcome::Ignored(BeatIgnored::NotRunning);
        }

        if let Some(last) = self.last_beat_time {
            let min_gap = self.beat_interval_ms() * self.config.beat_debounce_ratio;
            if beat_time - last < min_gap {
                self.debounced_beats += 1;
                trace!(gap_ms = beat_time - last, "Debounced duplicate beat");
                return BeatOutcome::Ignored(BeatIgnored::Debounced);
            }
        }

        let first_beat = !self.track_started;
        if first_beat && self.loop_restart_mode {
            self.loop_restart_mode = false;
            info!(loop_restarts = self.loop_restart_count, "Loop restart complete");
        }

        self.track_started = true;
        self.last_beat_time = Some(beat_time);
        self.bar_progress = 0.0;

        let advance = self.phrase.advance();
        match advance {
            BeatAdvance::TempoCount(n) => self.effects.spawn(EffectKind::TempoCount(n)),
            BeatAdvance::TempoEstablished => {
                info!(beats = self.phrase.global_beat_count(), "Tempo established");
                self.effects.spawn(EffectKind::TempoEstablished);
            }
            BeatAdvance::Beat { .. } => self.effects.spawn(EffectKind::Beat),
            BeatAdvance::Downbeat { .. } => self.effects.spawn(EffectKind::Downbeat),
            BeatAdvance::PhraseStart => self.effects.spawn(EffectKind::PhraseStart),
        }

        if first_beat && self.show_requested {
            self.show_requested = false;
            self.active = true;
            debug!("Rhythm shown on first beat");
        }

        BeatOutcome::Counted {
            global_beat_count: self.phrase.global_beat_count(),
            advance,
        }
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Judge a player input against the nearest beat
    pub fn handle_input(&mut self, action: ActionKind) -> InputResult {
        let combo = self.combo.combo();

        if !self.active {
            return InputResult::neutral(action, InputTiming::Inactive, combo);
        }
        if self.loop_restart_mode {
            return InputResult::neutral(action, InputTiming::Restarting, combo);
        }
        let last_beat = match self.last_beat_time {
            Some(t) if self.track_started => t,
            _ => return InputResult::neutral(action, InputTiming::Waiting, combo),
        };

        let now = self.time.now_ms();
        if let Some(last_input) = self.last_input_time {
            if now - last_input < self.config.input_cooldown_ms {
                trace!(since_ms = now - last_input, "Input during cooldown");
                return InputResult::neutral(action, InputTiming::Cooldown, combo);
            }
        }
        self.last_input_time = Some(now);

        let (distance, nearest) = nearest_beat_distance(now - last_beat, self.beat_interval_ms());
        let timing = self.windows.classify(distance);

        if timing == HitTiming::Miss {
            self.combo.register_miss();
            self.effects.spawn(EffectKind::Judgement(HitTiming::Miss));
            debug!(distance_ms = distance, "Miss");
            return InputResult {
                action,
                hit: false,
                timing: InputTiming::Miss,
                combo: 0,
                target: None,
                distance_ms: Some(distance),
            };
        }

        let beat_index = match nearest {
            NearestBeat::Previous => self.phrase.global_beat_count(),
            NearestBeat::Next => self.phrase.global_beat_count() + 1,
        };
        let too_soon = self
            .last_hit_time
            .is_some_and(|t| now - t < self.config.duplicate_hit_guard_ms);
        if too_soon || self.last_hit_beat == Some(beat_index) {
            trace!(beat_index, "Duplicate hit ignored");
            return InputResult {
                distance_ms: Some(distance),
                ..InputResult::neutral(action, InputTiming::Duplicate, combo)
            };
        }

        let combo = self.combo.register_hit();
        self.last_hit_time = Some(now);
        self.last_hit_beat = Some(beat_index);
        self.effects.spawn(EffectKind::Judgement(timing));

        let target = if action.deals_damage() {
            self.strike_target()
        } else {
            None
        };

        debug!(?timing, distance_ms = distance, combo, "Hit");
        InputResult {
            action,
            hit: true,
            timing: timing.into(),
            combo,
            target,
            distance_ms: Some(distance),
        }
    }

    /// Damage the nearest active target in range of the player
    fn strike_target(&self) -> Option<TargetId> {
        let origin = self.player.as_ref()?.position();
        let radius = self.damage_radius();
        let target = nearest_in_range(&self.targets, origin, radius)?;
        let Ok(mut target) = target.lock() else {
            warn!("Target lock poisoned, hit dropped");
            return None;
        };
        target.apply_hit(self.config.hit_damage);
        Some(target.id())
    }

    // ------------------------------------------------------------------
    // Frame tick
    // ------------------------------------------------------------------

    /// Per-frame update: ages effects, eases the arc intensity and refreshes
    /// bar progress. Never advances beat counters.
    pub fn update(&mut self, delta: Duration) {
        self.effects.update(delta);
        self.combo.update(delta, self.config.intensity_smoothing);

        self.bar_progress = match (self.loop_restart_mode, self.last_beat_time) {
            (false, Some(last)) => {
                ((self.time.now_ms() - last) / self.beat_interval_ms()).clamp(0.0, 1.0)
            }
            _ => 0.0,
        };
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Whether the engine is visible and accepting input
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether beats are being counted
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether a beat has been counted since the last (re)start
    pub fn track_started(&self) -> bool {
        self.track_started
    }

    /// Current tempo
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Milliseconds between beats
    pub fn beat_interval_ms(&self) -> Millis {
        60_000.0 / self.bpm
    }

    /// Current phase of the state machine
    pub fn phase(&self) -> RhythmPhase {
        if !self.running {
            RhythmPhase::Stopped
        } else if self.loop_restart_mode {
            RhythmPhase::Restarting
        } else if !self.phrase.tempo_established() {
            RhythmPhase::TempoEstablishing {
                beat: self.phrase.current_tempo_beat(),
                target: self.phrase.tempo_target(),
            }
        } else {
            RhythmPhase::SteadyState {
                bar: self.phrase.current_bar(),
                beat: self.phrase.current_beat(),
            }
        }
    }

    /// Current combo
    pub fn combo(&self) -> u32 {
        self.combo.combo()
    }

    /// Best combo since the last gameplay reset
    pub fn max_combo(&self) -> u32 {
        self.combo.max_combo()
    }

    /// Current arc growth level
    pub fn arc_growth_level(&self) -> u32 {
        self.combo.growth_level()
    }

    /// Whether the power arc is charged
    pub fn is_power_arc_active(&self) -> bool {
        self.active && self.combo.growth_level() > 0
    }

    /// Smoothed power-arc intensity in `[0, 1]`
    pub fn power_arc_intensity(&self) -> f32 {
        self.combo.displayed_intensity()
    }

    /// Damage radius for the current growth level
    pub fn damage_radius(&self) -> f32 {
        self.combo
            .damage_radius(self.config.base_damage_radius, self.config.max_damage_radius)
    }

    /// Priming beats counted
    pub fn current_tempo_beat(&self) -> u32 {
        self.phrase.current_tempo_beat()
    }

    /// Whether tempo establishment is complete
    pub fn tempo_established(&self) -> bool {
        self.phrase.tempo_established()
    }

    /// Bar within the phrase
    pub fn current_bar(&self) -> u32 {
        self.phrase.current_bar()
    }

    /// Beat within the bar
    pub fn current_beat(&self) -> u32 {
        self.phrase.current_beat()
    }

    /// Every beat counted since the last (re)start
    pub fn global_beat_count(&self) -> u64 {
        self.phrase.global_beat_count()
    }

    /// Beats dropped by the debounce guard
    pub fn debounced_beats(&self) -> u64 {
        self.debounced_beats
    }

    /// Fraction of the current beat elapsed, as of the last `update`
    pub fn bar_progress(&self) -> f64 {
        self.bar_progress
    }

    /// Position within the phrase in `[0, 1]`
    pub fn phrase_progress(&self) -> f64 {
        if self.loop_restart_mode {
            return 0.0;
        }
        self.phrase.phrase_progress(self.bar_progress)
    }

    /// Tempo establishment progress in `[0, 1]`
    pub fn tempo_progress(&self) -> f64 {
        self.phrase.tempo_progress()
    }

    /// Timestamp of the last counted beat
    pub fn last_beat_time(&self) -> Option<Millis> {
        self.last_beat_time
    }

    /// Whether a music loop restart is in progress
    pub fn is_loop_restarting(&self) -> bool {
        self.loop_restart_mode
    }

    /// Music loop restarts since construction
    pub fn loop_restart_count(&self) -> u32 {
        self.loop_restart_count
    }

    /// Live visual effects
    pub fn effects(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    /// Time since the last counted beat, or since start if none arrived
    pub fn time_since_last_beat(&self) -> Option<Millis> {
        let reference = self.last_beat_time.or(self.started_at)?;
        Some(self.time.now_ms() - reference)
    }

    /// Whether the engine is running but beats stopped arriving
    pub fn is_stalled(&self) -> bool {
        self.running
            && self
                .time_since_last_beat()
                .is_some_and(|since| since > self.beat_interval_ms() * 2.0)
    }

    /// Everything a renderer needs for one frame
    pub fn snapshot(&self) -> RhythmSnapshot {
        RhythmSnapshot {
            phase: self.phase(),
            running: self.running,
            active: self.active,
            combo: self.combo.combo(),
            max_combo: self.combo.max_combo(),
            arc_growth_level: self.combo.growth_level(),
            power_arc_active: self.is_power_arc_active(),
            power_arc_intensity: self.power_arc_intensity(),
            bar_progress: self.bar_progress,
            phrase_progress: self.phrase_progress(),
            tempo_progress: self.tempo_progress(),
            global_beat_count: self.phrase.global_beat_count(),
            loop_restart_count: self.loop_restart_count,
            effects: self.effects.iter().copied().collect(),
        }
    }
}

impl BeatListener for RhythmEngine {
    fn handle_beat(&mut self, event: &BeatEvent) {
        if let BeatOutcome::Ignored(reason) = self.on_beat_at(event.scheduled_ms) {
            trace!(index = event.index, late_ms = event.lateness_ms(), ?reason, "Clock beat not counted");
        }
    }

    fn is_listening(&self) -> bool {
        self.running
    }
}

impl std::fmt::Debug for RhythmEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RhythmEngine")
            .field("phase", &self.phase())
            .field("active", &self.active)
            .field("global_beat_count", &self.phrase.global_beat_count())
            .field("combo", &self.combo.combo())
            .field("targets", &self.targets.len())
            .finish()
    }
}
