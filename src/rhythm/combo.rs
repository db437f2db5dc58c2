// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Combo and power-arc growth bookkeeping.

use std::time::Duration;

/// Combo counter with the arc growth level derived from it.
///
/// The growth level is always `min(max_growth, combo)`; a miss drops both to
/// zero in the same call.
#[derive(Debug, Clone)]
pub struct ComboTracker {
    combo: u32,
    max_combo: u32,
    growth_level: u32,
    max_growth: u32,
    /// Smoothed intensity for display, follows `intensity()`
    displayed_intensity: f32,
}

impl ComboTracker {
    /// Create a tracker whose growth saturates at `max_growth`
    pub fn new(max_growth: u32) -> Self {
        Self {
            combo: 0,
            max_combo: 0,
            growth_level: 0,
            max_growth: max_growth.max(1),
            displayed_intensity: 0.0,
        }
    }

    /// Current combo
    pub fn combo(&self) -> u32 {
        self.combo
    }

    /// Best combo since the last reset
    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    /// Current arc growth level
    pub fn growth_level(&self) -> u32 {
        self.growth_level
    }

    /// Highest growth level
    pub fn max_growth(&self) -> u32 {
        self.max_growth
    }

    /// Change the growth ceiling, clamping the current level
    pub fn set_max_growth(&mut self, max_growth: u32) {
        self.max_growth = max_growth.max(1);
        self.growth_level = self.combo.min(self.max_growth);
    }

    /// Record a successful hit and return the new combo
    pub fn register_hit(&mut self) -> u32 {
        self.combo = self.combo.saturating_add(1);
        self.max_combo = self.max_combo.max(self.combo);
        self.growth_level = self.combo.min(self.max_growth);
        self.combo
    }

    /// Record a miss
    pub fn register_miss(&mut self) {
        self.combo = 0;
        self.growth_level = 0;
    }

    /// Clear combo, best combo and growth
    pub fn reset(&mut self) {
        self.combo = 0;
        self.max_combo = 0;
        self.growth_level = 0;
        self.displayed_intensity = 0.0;
    }

    /// Power-arc intensity in `[0, 1]` for the current growth level
    pub fn intensity(&self) -> f32 {
        self.growth_level as f32 / self.max_growth as f32
    }

    /// Smoothed intensity for rendering
    pub fn displayed_intensity(&self) -> f32 {
        self.displayed_intensity
    }

    /// Damage radius interpolated between `base` and `max` across the
    /// growth levels
    pub fn damage_radius(&self, base: f32, max: f32) -> f32 {
        base + (max - base) * self.intensity()
    }

    /// Ease the displayed intensity toward the current target
    pub fn update(&mut self, delta: Duration, smoothing: f32) {
        let target = self.intensity();
        let t = (delta.as_secs_f32() * smoothing).clamp(0.0, 1.0);
        self.displayed_intensity += (target - self.displayed_intensity) * t;
        if (target - self.displayed_intensity).abs() < 1e-3 {
            self.displayed_intensity = target;
        }
    }
}

impl Default for ComboTracker {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_follows_combo() {
        let mut combo = ComboTracker::new(10);
        for expected in 1..=12 {
            assert_eq!(combo.register_hit(), expected);
            assert_eq!(combo.growth_level(), expected.min(10));
        }
        assert_eq!(combo.max_combo(), 12);
        assert_eq!(combo.intensity(), 1.0);
    }

    #[test]
    fn test_miss_resets_combo_and_growth() {
        let mut combo = ComboTracker::new(10);
        combo.register_hit();
        combo.register_hit();
        combo.register_hit();

        combo.register_miss();
        assert_eq!(combo.combo(), 0);
        assert_eq!(combo.growth_level(), 0);
        assert_eq!(combo.max_combo(), 3);
    }

    #[test]
    fn test_damage_radius() {
        let mut combo = ComboTracker::new(10);
        assert_eq!(combo.damage_radius(100.0, 300.0), 100.0);

        for _ in 0..5 {
            combo.register_hit();
        }
        assert!((combo.damage_radius(100.0, 300.0) - 200.0).abs() < 1e-4);

        for _ in 0..10 {
            combo.register_hit();
        }
        assert!((combo.damage_radius(100.0, 300.0) - 300.0).abs() < 1e-4);
    }

    #[test]
    fn test_displayed_intensity_eases() {
        let mut combo = ComboTracker::new(4);
        combo.register_hit();
        combo.register_hit();

        combo.update(Duration::from_millis(16), 8.0);
        let first = combo.displayed_intensity();
        assert!(first > 0.0 && first < 0.5);

        for _ in 0..120 {
            combo.update(Duration::from_millis(16), 8.0);
        }
        assert_eq!(combo.displayed_intensity(), 0.5);
    }

    #[test]
    fn test_set_max_growth_clamps() {
        let mut combo = ComboTracker::new(10);
        for _ in 0..8 {
            combo.register_hit();
        }
        combo.set_max_growth(5);
        assert_eq!(combo.growth_level(), 5);
    }
}
