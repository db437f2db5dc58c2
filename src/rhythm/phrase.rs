// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Beat counting: tempo establishment, then bar/beat position in a phrase.

/// What a single counted beat did to the phrase position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatAdvance {
    /// A priming beat during tempo establishment (1-based count)
    TempoCount(u32),
    /// The priming beat that completed tempo establishment
    TempoEstablished,
    /// A beat inside a bar
    Beat { bar: u32, beat: u32 },
    /// The first beat of a bar
    Downbeat { bar: u32 },
    /// The first beat of a new phrase
    PhraseStart,
}

/// Phrase position counter.
///
/// Counts `tempo_target` priming beats first. Once tempo is established each
/// beat advances `current_beat`, wrapping into `current_bar`. Tempo
/// establishment is one-way until [`reset`](PhraseCounter::reset).
#[derive(Debug, Clone)]
pub struct PhraseCounter {
    tempo_target: u32,
    beats_per_bar: u32,
    bars_per_phrase: u32,
    current_tempo_beat: u32,
    tempo_established: bool,
    current_bar: u32,
    current_beat: u32,
    global_beat_count: u64,
}

impl PhraseCounter {
    /// Create a counter with the given tempo target and phrase shape
    pub fn new(tempo_target: u32, beats_per_bar: u32, bars_per_phrase: u32) -> Self {
        Self {
            tempo_target: tempo_target.max(1),
            beats_per_bar: beats_per_bar.max(1),
            bars_per_phrase: bars_per_phrase.max(1),
            current_tempo_beat: 0,
            tempo_established: false,
            current_bar: 0,
            current_beat: 0,
            global_beat_count: 0,
        }
    }

    /// Zero every counter, optionally reshaping the phrase
    pub fn reset(&mut self, tempo_target: u32, beats_per_bar: u32, bars_per_phrase: u32) {
        *self = Self::new(tempo_target, beats_per_bar, bars_per_phrase);
    }

    /// Count one beat
    pub fn advance(&mut self) -> BeatAdvance {
        self.global_beat_count += 1;

        if !self.tempo_established {
            self.current_tempo_beat += 1;
            if self.current_tempo_beat >= self.tempo_target {
                self.current_tempo_beat = self.tempo_target;
                self.tempo_established = true;
                return BeatAdvance::TempoEstablished;
            }
            return BeatAdvance::TempoCount(self.current_tempo_beat);
        }

        self.current_beat = (self.current_beat + 1) % self.beats_per_bar;
        if self.current_beat != 0 {
            return BeatAdvance::Beat {
                bar: self.current_bar,
                beat: self.current_beat,
            };
        }

        self.current_bar = (self.current_bar + 1) % self.bars_per_phrase;
        if self.current_bar == 0 {
            BeatAdvance::PhraseStart
        } else {
            BeatAdvance::Downbeat {
                bar: self.current_bar,
            }
        }
    }

    /// Priming beats counted so far
    pub fn current_tempo_beat(&self) -> u32 {
        self.current_tempo_beat
    }

    /// Priming beats required
    pub fn tempo_target(&self) -> u32 {
        self.tempo_target
    }

    /// Whether tempo establishment is complete
    pub fn tempo_established(&self) -> bool {
        self.tempo_established
    }

    /// Bar within the phrase
    pub fn current_bar(&self) -> u32 {
        self.current_bar
    }

    /// Beat within the bar
    pub fn current_beat(&self) -> u32 {
        self.current_beat
    }

    /// Beats per bar
    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    /// Beats in a phrase
    pub fn beats_per_phrase(&self) -> u32 {
        self.beats_per_bar * self.bars_per_phrase
    }

    /// All beats counted since the last reset
    pub fn global_beat_count(&self) -> u64 {
        self.global_beat_count
    }

    /// Tempo establishment progress in `[0, 1]`
    pub fn tempo_progress(&self) -> f64 {
        self.current_tempo_beat as f64 / self.tempo_target as f64
    }

    /// Phrase progress in `[0, 1)`, interpolated by `beat_fraction`
    pub fn phrase_progress(&self, beat_fraction: f64) -> f64 {
        if !self.tempo_established {
            return 0.0;
        }
        let position = (self.current_bar * self.beats_per_bar + self.current_beat) as f64
            + beat_fraction.clamp(0.0, 1.0);
        (position / self.beats_per_phrase() as f64).min(1.0)
    }
}

impl Default for PhraseCounter {
    fn default() -> Self {
        Self::new(32, 4, 4)
    }
}
