// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration system for the rhythm core.
//!
//! This module provides data structures for loading and validating the
//! rhythm tuning (tempo, hit windows, arc growth) and the background music
//! loop settings from YAML.

pub mod watcher;

pub use watcher::{validate_config, ConfigEvent, ConfigWatcher};

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::RhythmError;

/// Root configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RhythmFile {
    /// Beat counting and judgement tuning
    #[serde(default)]
    pub rhythm: RhythmConfig,
    /// Background music loop settings
    #[serde(default)]
    pub music_loop: MusicLoopConfig,
}

impl RhythmFile {
    /// Load a configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: Self =
            serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")?;
        file.validate()?;
        Ok(file)
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }

    /// Validate both sections
    pub fn validate(&self) -> std::result::Result<(), RhythmError> {
        self.rhythm.validate()?;
        self.music_loop.validate()
    }
}

/// Beat counting, judgement and arc growth tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RhythmConfig {
    /// Tempo in BPM
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    /// Priming beats counted before phrase tracking starts
    #[serde(default = "default_tempo_establishment_beats")]
    pub tempo_establishment_beats: u32,
    /// Beats per bar
    #[serde(default = "default_four")]
    pub beats_per_bar: u32,
    /// Bars per phrase
    #[serde(default = "default_four")]
    pub bars_per_phrase: u32,
    /// Distance to the nearest beat judged perfect (ms)
    #[serde(default = "default_perfect_window_ms")]
    pub perfect_window_ms: f64,
    /// Distance to the nearest beat judged excellent (ms)
    #[serde(default = "default_excellent_window_ms")]
    pub excellent_window_ms: f64,
    /// Minimum time between judged inputs (ms)
    #[serde(default = "default_input_cooldown_ms")]
    pub input_cooldown_ms: f64,
    /// Window in which a second successful hit is a duplicate (ms)
    #[serde(default = "default_duplicate_hit_guard_ms")]
    pub duplicate_hit_guard_ms: f64,
    /// Beats closer than this fraction of an interval are debounced
    #[serde(default = "default_beat_debounce_ratio")]
    pub beat_debounce_ratio: f64,
    /// Highest arc growth level
    #[serde(default = "default_max_arc_growth")]
    pub max_arc_growth: u32,
    /// Damage radius at growth level 0
    #[serde(default = "default_base_damage_radius")]
    pub base_damage_radius: f32,
    /// Damage radius at the highest growth level
    #[serde(default = "default_max_damage_radius")]
    pub max_damage_radius: f32,
    /// Damage applied to a target per successful hit
    #[serde(default = "default_hit_damage")]
    pub hit_damage: u32,
    /// Lifetime of spawned beat and hit effects (ms)
    #[serde(default = "default_effect_lifetime_ms")]
    pub effect_lifetime_ms: f64,
    /// Rate at which the displayed arc intensity follows its target (1/s)
    #[serde(default = "default_intensity_smoothing")]
    pub intensity_smoothing: f32,
}

fn default_bpm() -> f64 {
    146.0
}
fn default_tempo_establishment_beats() -> u32 {
    32
}
fn default_four() -> u32 {
    4
}
fn default_perfect_window_ms() -> f64 {
    60.0
}
fn default_excellent_window_ms() -> f64 {
    100.0
}
fn default_input_cooldown_ms() -> f64 {
    150.0
}
fn default_duplicate_hit_guard_ms() -> f64 {
    100.0
}
fn default_beat_debounce_ratio() -> f64 {
    0.7
}
fn default_max_arc_growth() -> u32 {
    10
}
fn default_base_damage_radius() -> f32 {
    120.0
}
fn default_max_damage_radius() -> f32 {
    320.0
}
fn default_hit_damage() -> u32 {
    1
}
fn default_effect_lifetime_ms() -> f64 {
    400.0
}
fn default_intensity_smoothing() -> f32 {
    8.0
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            bpm: default_bpm(),
            tempo_establishment_beats: default_tempo_establishment_beats(),
            beats_per_bar: default_four(),
            bars_per_phrase: default_four(),
            perfect_window_ms: default_perfect_window_ms(),
            excellent_window_ms: default_excellent_window_ms(),
            input_cooldown_ms: default_input_cooldown_ms(),
            duplicate_hit_guard_ms: default_duplicate_hit_guard_ms(),
            beat_debounce_ratio: default_beat_debounce_ratio(),
            max_arc_growth: default_max_arc_growth(),
            base_damage_radius: default_base_damage_radius(),
            max_damage_radius: default_max_damage_radius(),
            hit_damage: default_hit_damage(),
            effect_lifetime_ms: default_effect_lifetime_ms(),
            intensity_smoothing: default_intensity_smoothing(),
        }
    }
}

impl RhythmConfig {
    /// Milliseconds between beats at the configured tempo
    pub fn beat_interval_ms(&self) -> f64 {
        60_000.0 / self.bpm
    }

    /// Beats in one phrase
    pub fn beats_per_phrase(&self) -> u32 {
        self.beats_per_bar * self.bars_per_phrase
    }

    /// Check the tuning for values the engine cannot work with
    pub fn validate(&self) -> std::result::Result<(), RhythmError> {
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(RhythmError::InvalidBpm(self.bpm));
        }
        if self.tempo_establishment_beats == 0 {
            return Err(invalid("tempo_establishment_beats must be at least 1"));
        }
        if self.beats_per_bar == 0 || self.bars_per_phrase == 0 {
            return Err(invalid("beats_per_bar and bars_per_phrase must be at least 1"));
        }
        if !(self.perfect_window_ms >= 0.0) || !(self.excellent_window_ms >= 0.0) {
            return Err(invalid("hit windows must be non-negative"));
        }
        if self.perfect_window_ms > self.excellent_window_ms {
            return Err(invalid(format!(
                "perfect window ({}ms) is wider than excellent window ({}ms)",
                self.perfect_window_ms, self.excellent_window_ms
            )));
        }
        if self.excellent_window_ms * 2.0 > self.beat_interval_ms() {
            return Err(invalid(format!(
                "excellent window ({}ms) overlaps between beats at {} BPM",
                self.excellent_window_ms, self.bpm
            )));
        }
        if !(self.input_cooldown_ms >= 0.0) || !(self.duplicate_hit_guard_ms >= 0.0) {
            return Err(invalid("cooldowns must be non-negative"));
        }
        if !(self.beat_debounce_ratio > 0.0 && self.beat_debounce_ratio <= 1.0) {
            return Err(invalid(format!(
                "beat_debounce_ratio {} must be in (0, 1]",
                self.beat_debounce_ratio
            )));
        }
        if self.max_arc_growth == 0 {
            return Err(invalid("max_arc_growth must be at least 1"));
        }
        if self.base_damage_radius < 0.0 || self.max_damage_radius < self.base_damage_radius {
            return Err(invalid("damage radius must grow from base to max"));
        }
        if !(self.effect_lifetime_ms > 0.0) {
            return Err(invalid("effect_lifetime_ms must be positive"));
        }
        Ok(())
    }
}

/// Background music loop settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MusicLoopConfig {
    /// Length of the music track before it loops (ms)
    #[serde(default = "default_loop_duration_ms")]
    pub loop_duration_ms: f64,
    /// How long before the loop boundary the engine is prepared (ms)
    #[serde(default = "default_prepare_lead_ms")]
    pub prepare_lead_ms: f64,
}

fn default_loop_duration_ms() -> f64 {
    211_000.0
}
fn default_prepare_lead_ms() -> f64 {
    1_500.0
}

impl Default for MusicLoopConfig {
    fn default() -> Self {
        Self {
            loop_duration_ms: default_loop_duration_ms(),
            prepare_lead_ms: default_prepare_lead_ms(),
        }
    }
}

impl MusicLoopConfig {
    /// Check the loop settings
    pub fn validate(&self) -> std::result::Result<(), RhythmError> {
        if !(self.loop_duration_ms > 0.0) {
            return Err(invalid("loop_duration_ms must be positive"));
        }
        if !(self.prepare_lead_ms >= 0.0) || self.prepare_lead_ms >= self.loop_duration_ms {
            return Err(invalid("prepare_lead_ms must be shorter than the loop"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> RhythmError {
    RhythmError::InvalidConfig(msg.into())
}
