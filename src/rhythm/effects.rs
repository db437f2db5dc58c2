// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Queue of short-lived visual effect states.
//!
//! Beats and judged inputs spawn entries here; the frame tick ages them.
//! Drawing them is left to the renderer.

use std::collections::VecDeque;
use std::time::Duration;

use super::judge::HitTiming;

/// Maximum number of live effects; the oldest are dropped first
pub const MAX_EFFECTS: usize = 64;

/// Kind of effect to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    /// Priming beat pulse with its 1-based count
    TempoCount(u32),
    /// Tempo establishment completed
    TempoEstablished,
    /// Ordinary beat pulse
    Beat,
    /// First beat of a bar
    Downbeat,
    /// First beat of a phrase
    PhraseStart,
    /// Judged input feedback
    Judgement(HitTiming),
}

/// A live effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effect {
    pub kind: EffectKind,
    /// Time since spawn (ms)
    pub age_ms: f64,
    /// Total lifetime (ms)
    pub lifetime_ms: f64,
}

impl Effect {
    /// Fraction of the lifetime elapsed, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        (self.age_ms / self.lifetime_ms).clamp(0.0, 1.0)
    }

    /// Whether the effect has run its course
    pub fn is_expired(&self) -> bool {
        self.age_ms >= self.lifetime_ms
    }
}

/// FIFO of live effects
#[derive(Debug, Clone)]
pub struct EffectQueue {
    effects: VecDeque<Effect>,
    lifetime_ms: f64,
}

impl EffectQueue {
    /// Create an empty queue whose effects live `lifetime_ms`
    pub fn new(lifetime_ms: f64) -> Self {
        Self {
            effects: VecDeque::with_capacity(MAX_EFFECTS),
            lifetime_ms,
        }
    }

    /// Change the lifetime of effects spawned from now on
    pub fn set_lifetime(&mut self, lifetime_ms: f64) {
        self.lifetime_ms = lifetime_ms;
    }

    /// Spawn a new effect
    pub fn spawn(&mut self, kind: EffectKind) {
        if self.effects.len() == MAX_EFFECTS {
            self.effects.pop_front();
        }
        self.effects.push_back(Effect {
            kind,
            age_ms: 0.0,
            lifetime_ms: self.lifetime_ms,
        });
    }

    /// Age every effect and drop the expired ones
    pub fn update(&mut self, delta: Duration) {
        let delta_ms = delta.as_secs_f64() * 1000.0;
        for effect in self.effects.iter_mut() {
            effect.age_ms += delta_ms;
        }
        self.effects.retain(|effect| !effect.is_expired());
    }

    /// Remove every effect
    pub fn clear(&mut self) {
        self.effects.clear();
    }

    /// Iterate live effects, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    /// Number of live effects
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether no effects are live
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effects_expire() {
        let mut queue = EffectQueue::new(100.0);
        queue.spawn(EffectKind::Beat);
        queue.update(Duration::from_millis(60));
        queue.spawn(EffectKind::Downbeat);

        assert_eq!(queue.len(), 2);
        let first = queue.iter().next().unwrap();
        assert!((first.progress() - 0.6).abs() < 1e-9);

        queue.update(Duration::from_millis(50));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.iter().next().unwrap().kind, EffectKind::Downbeat);

        queue.update(Duration::from_millis(50));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_is_bounded() {
        let mut queue = EffectQueue::new(1_000.0);
        for n in 0..(MAX_EFFECTS as u32 + 10) {
            queue.spawn(EffectKind::TempoCount(n));
        }
        assert_eq!(queue.len(), MAX_EFFECTS);
        assert_eq!(queue.iter().next().unwrap().kind, EffectKind::TempoCount(10));
    }

    #[test]
    fn test_clear() {
        let mut queue = EffectQueue::new(100.0);
        queue.spawn(EffectKind::Judgement(HitTiming::Perfect));
        queue.clear();
        assert!(queue.is_empty());
    }
}
