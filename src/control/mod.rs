// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Keyboard control for the rhythm engine.
//!
//! Key events are mapped to [`ControlAction`]s, which are then applied to a
//! [`RhythmEngine`]. Gameplay inputs go through the engine's judgement; the
//! rest drive its lifecycle.

pub mod keyboard;

pub use keyboard::{format_shortcut, KeyBinding, KeyboardController, Shortcut};

use tracing::{debug, warn};

use crate::rhythm::{ActionKind, InputResult, RhythmEngine};

/// Action that can be triggered by controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    /// No action
    None,

    // Gameplay
    /// Judged player input
    Input(ActionKind),

    // Lifecycle
    /// Start beat counting and show on the first beat
    Start,
    /// Stop beat counting
    Stop,
    /// Show or hide the engine
    ToggleVisible,
    /// Reset combo and effects
    Restart,

    // Tempo
    /// Adjust tempo by delta; applied on the next start
    AdjustTempo(f64),

    // UI
    /// Toggle help display
    ToggleHelp,
    /// Quit application
    Quit,
}

impl ControlAction {
    /// Check if this action is judged by the engine
    pub fn is_gameplay(&self) -> bool {
        matches!(self, ControlAction::Input(_))
    }

    /// Check if this is a lifecycle action
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            ControlAction::Start
                | ControlAction::Stop
                | ControlAction::ToggleVisible
                | ControlAction::Restart
        )
    }
}

/// Apply an action to the engine.
///
/// `bpm` is the tempo used by [`ControlAction::Start`] and is updated by
/// [`ControlAction::AdjustTempo`]. Returns the judgement for gameplay inputs.
pub fn apply_action(
    action: ControlAction,
    engine: &mut RhythmEngine,
    bpm: &mut f64,
) -> Option<InputResult> {
    match action {
        ControlAction::Input(kind) => return Some(engine.handle_input(kind)),
        ControlAction::Start => engine.start(*bpm),
        ControlAction::Stop => engine.stop(),
        ControlAction::ToggleVisible => {
            if engine.is_active() {
                engine.hide();
            } else {
                engine.show();
            }
        }
        ControlAction::Restart => engine.restart(),
        ControlAction::AdjustTempo(delta) => {
            *bpm = (*bpm + delta).clamp(crate::timing::MIN_BPM, crate::timing::MAX_BPM);
            if engine.is_running() {
                if let Err(e) = engine.set_bpm(*bpm) {
                    warn!("Tempo change rejected: {}", e);
                }
            }
            debug!(bpm = *bpm, "Tempo adjusted");
        }
        ControlAction::ToggleHelp | ControlAction::Quit | ControlAction::None => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RhythmConfig;
    use crate::rhythm::InputTiming;
    use crate::timing::ManualTimeSource;
    use std::sync::Arc;

    fn engine() -> (Arc<ManualTimeSource>, RhythmEngine) {
        let time = Arc::new(ManualTimeSource::new(0.0));
        let engine = RhythmEngine::new(RhythmConfig::default(), time.clone());
        (time, engine)
    }

    #[test]
    fn test_action_categories() {
        assert!(ControlAction::Input(ActionKind::Attack).is_gameplay());
        assert!(ControlAction::Start.is_lifecycle());
        assert!(!ControlAction::Quit.is_lifecycle());
    }

    #[test]
    fn test_apply_start_and_input() {
        let (time, mut engine) = engine();
        let mut bpm = 146.0;

        apply_action(ControlAction::Start, &mut engine, &mut bpm);
        assert!(engine.is_running());
        engine.on_beat();

        time.advance(20.0);
        let result = apply_action(ControlAction::Input(ActionKind::Attack), &mut engine, &mut bpm);
        assert_eq!(result.map(|r| r.timing), Some(InputTiming::Perfect));
    }

    #[test]
    fn test_toggle_visible() {
        let (_, mut engine) = engine();
        let mut bpm = 146.0;
        engine.start_background_rhythm(bpm);
        engine.on_beat();

        apply_action(ControlAction::ToggleVisible, &mut engine, &mut bpm);
        assert!(engine.is_active());
        apply_action(ControlAction::ToggleVisible, &mut engine, &mut bpm);
        assert!(!engine.is_active());
        assert!(engine.is_running());
    }

    #[test]
    fn test_adjust_tempo_clamped() {
        let (_, mut engine) = engine();
        let mut bpm = 295.0;
        apply_action(ControlAction::AdjustTempo(10.0), &mut engine, &mut bpm);
        assert_eq!(bpm, crate::timing::MAX_BPM);
    }

    #[test]
    fn test_adjust_tempo_retimes_running_engine() {
        let (_, mut engine) = engine();
        let mut bpm = 146.0;
        apply_action(ControlAction::AdjustTempo(4.0), &mut engine, &mut bpm);
        // Stopped engines pick the tempo up on the next start
        assert_eq!(engine.bpm(), RhythmConfig::default().bpm);

        apply_action(ControlAction::Start, &mut engine, &mut bpm);
        assert_eq!(engine.bpm(), 150.0);
        apply_action(ControlAction::AdjustTempo(-10.0), &mut engine, &mut bpm);
        assert_eq!(bpm, 140.0);
        assert_eq!(engine.bpm(), 140.0);
    }
}
