// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Keyboard bindings.
//!
//! Maps crossterm key events to gameplay, lifecycle and tempo actions.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyModifiers};

use super::ControlAction;
use crate::rhythm::ActionKind;

/// A keyboard shortcut definition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcut {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl Shortcut {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Shortcut with no modifiers
    pub fn key(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    /// Shortcut with Ctrl held
    pub fn ctrl(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::CONTROL)
    }

    /// Shortcut with Shift held
    pub fn shift(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::SHIFT)
    }
}

/// A shortcut bound to an action
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub shortcut: Shortcut,
    pub action: ControlAction,
    /// Description for help display
    pub description: String,
    /// Category for grouping in help
    pub category: String,
}

impl KeyBinding {
    pub fn new(shortcut: Shortcut, action: ControlAction, description: impl Into<String>) -> Self {
        Self {
            shortcut,
            action,
            description: description.into(),
            category: "General".to_string(),
        }
    }

    /// Set the category
    pub fn category(mut self, cat: impl Into<String>) -> Self {
        self.category = cat.into();
        self
    }
}

/// Keyboard controller with configurable bindings
pub struct KeyboardController {
    bindings: HashMap<Shortcut, KeyBinding>,
}

impl KeyboardController {
    /// Create a controller with no bindings
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Create a controller with the default bindings
    pub fn with_defaults() -> Self {
        let mut controller = Self::new();
        controller.add_default_bindings();
        controller
    }

    fn add_default_bindings(&mut self) {
        let attack = ControlAction::Input(ActionKind::Attack);
        let dash = ControlAction::Input(ActionKind::Dash);

        // Gameplay
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Char(' ')), attack, "Attack").category("Gameplay"));
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Char('j')), attack, "Attack").category("Gameplay"));
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Char('k')), dash, "Dash").category("Gameplay"));
        self.add(
            KeyBinding::new(Shortcut::shift(KeyCode::Char('K')), dash, "Dash").category("Gameplay"),
        );

        // Rhythm
        self.add(
            KeyBinding::new(Shortcut::key(KeyCode::Enter), ControlAction::Start, "Start rhythm")
                .category("Rhythm"),
        );
        self.add(
            KeyBinding::new(Shortcut::key(KeyCode::Esc), ControlAction::Stop, "Stop rhythm")
                .category("Rhythm"),
        );
        self.add(
            KeyBinding::new(Shortcut::key(KeyCode::Tab), ControlAction::ToggleVisible, "Show/Hide")
                .category("Rhythm"),
        );
        self.add(
            KeyBinding::new(Shortcut::key(KeyCode::Char('r')), ControlAction::Restart, "Reset combo")
                .category("Rhythm"),
        );

        // Tempo
        self.add(
            KeyBinding::new(Shortcut::key(KeyCode::Up), ControlAction::AdjustTempo(1.0), "Tempo +1 BPM")
                .category("Tempo"),
        );
        self.add(
            KeyBinding::new(Shortcut::key(KeyCode::Down), ControlAction::AdjustTempo(-1.0), "Tempo -1 BPM")
                .category("Tempo"),
        );
        self.add(
            KeyBinding::new(Shortcut::shift(KeyCode::Up), ControlAction::AdjustTempo(10.0), "Tempo +10 BPM")
                .category("Tempo"),
        );
        self.add(
            KeyBinding::new(Shortcut::shift(KeyCode::Down), ControlAction::AdjustTempo(-10.0), "Tempo -10 BPM")
                .category("Tempo"),
        );

        // UI
        self.add(
            KeyBinding::new(Shortcut::key(KeyCode::Char('?')), ControlAction::ToggleHelp, "Toggle Help")
                .category("UI"),
        );
        self.add(
            KeyBinding::new(Shortcut::key(KeyCode::Char('q')), ControlAction::Quit, "Quit").category("UI"),
        );
        self.add(
            KeyBinding::new(Shortcut::ctrl(KeyCode::Char('c')), ControlAction::Quit, "Quit").category("UI"),
        );
    }

    /// Add a key binding, replacing any binding for the same shortcut
    pub fn add(&mut self, binding: KeyBinding) {
        self.bindings.insert(binding.shortcut.clone(), binding);
    }

    /// Remove a key binding
    pub fn remove(&mut self, shortcut: &Shortcut) -> Option<KeyBinding> {
        self.bindings.remove(shortcut)
    }

    /// Action bound to a key event
    pub fn action_for(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<ControlAction> {
        self.bindings
            .get(&Shortcut::new(code, modifiers))
            .map(|b| b.action)
    }

    /// All bindings, for help display
    pub fn bindings(&self) -> impl Iterator<Item = &KeyBinding> {
        self.bindings.values()
    }

    /// Bindings grouped by category
    pub fn bindings_by_category(&self) -> HashMap<String, Vec<&KeyBinding>> {
        let mut grouped: HashMap<String, Vec<&KeyBinding>> = HashMap::new();
        for binding in self.bindings.values() {
            grouped
                .entry(binding.category.clone())
                .or_default()
                .push(binding);
        }
        grouped
    }
}

impl Default for KeyboardController {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Format a shortcut for display
pub fn format_shortcut(shortcut: &Shortcut) -> String {
    let mut parts = Vec::new();

    if shortcut.modifiers.contains(KeyModifiers::CONTROL) {
        parts.push("Ctrl".to_string());
    }
    if shortcut.modifiers.contains(KeyModifiers::SHIFT) {
        parts.push("Shift".to_string());
    }

    parts.push(match shortcut.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_uppercase().to_string(),
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        _ => "?".to_string(),
    });
    parts.join("+")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gameplay_keys() {
        let controller = KeyboardController::with_defaults();

        assert_eq!(
            controller.action_for(KeyCode::Char(' '), KeyModifiers::NONE),
            Some(ControlAction::Input(ActionKind::Attack))
        );
        assert_eq!(
            controller.action_for(KeyCode::Char('k'), KeyModifiers::NONE),
            Some(ControlAction::Input(ActionKind::Dash))
        );
        assert_eq!(
            controller.action_for(KeyCode::Esc, KeyModifiers::NONE),
            Some(ControlAction::Stop)
        );
    }

    #[test]
    fn test_modifiers_distinguish_bindings() {
        let controller = KeyboardController::with_defaults();
        assert_eq!(
            controller.action_for(KeyCode::Up, KeyModifiers::SHIFT),
            Some(ControlAction::AdjustTempo(10.0))
        );
        assert_eq!(
            controller.action_for(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(ControlAction::Quit)
        );
        assert_eq!(controller.action_for(KeyCode::Char('c'), KeyModifiers::NONE), None);
    }

    #[test]
    fn test_add_remove_binding() {
        let mut controller = KeyboardController::new();
        controller.add(KeyBinding::new(
            Shortcut::key(KeyCode::Char('x')),
            ControlAction::Input(ActionKind::Attack),
            "Custom Attack",
        ));
        assert!(controller.action_for(KeyCode::Char('x'), KeyModifiers::NONE).is_some());

        controller.remove(&Shortcut::key(KeyCode::Char('x')));
        assert!(controller.action_for(KeyCode::Char('x'), KeyModifiers::NONE).is_none());
    }

    #[test]
    fn test_format_shortcut() {
        assert_eq!(format_shortcut(&Shortcut::key(KeyCode::Char(' '))), "Space");
        assert_eq!(format_shortcut(&Shortcut::ctrl(KeyCode::Char('c'))), "Ctrl+C");
        assert_eq!(format_shortcut(&Shortcut::shift(KeyCode::Up)), "Shift+↑");
    }

    #[test]
    fn test_bindings_by_category() {
        let controller = KeyboardController::with_defaults();
        let grouped = controller.bindings_by_category();
        assert!(grouped.contains_key("Gameplay"));
        assert!(grouped.contains_key("Rhythm"));
        assert!(grouped.contains_key("Tempo"));
        assert_eq!(grouped["UI"].len(), 3);
    }
}
