// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Collaborator interfaces for hit damage.
//!
//! Successful hits can damage the nearest active target within the current
//! damage radius around the player. Targets and the player position are
//! handed to the engine at composition time.

use std::sync::{Arc, Mutex};

/// A point in world space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Create a new position
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Identifier of a damageable target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub u32);

/// Something a successful hit can damage (a jammer, a boss).
pub trait DamageableTarget: Send {
    /// Stable identifier reported in input results
    fn id(&self) -> TargetId;

    /// Whether the target can currently take damage
    fn is_active(&self) -> bool;

    /// Current world position
    fn position(&self) -> Position;

    /// Apply one hit of `amount` damage
    fn apply_hit(&mut self, amount: u32);
}

/// Target shared between the engine and the game systems that own it
pub type SharedTarget = Arc<Mutex<dyn DamageableTarget>>;

/// Source of the player's current position.
pub trait PositionProvider: Send {
    fn position(&self) -> Position;
}

impl PositionProvider for Position {
    fn position(&self) -> Position {
        *self
    }
}

impl PositionProvider for Arc<Mutex<Position>> {
    fn position(&self) -> Position {
        self.lock().map(|p| *p).unwrap_or_default()
    }
}

/// Find the nearest active target within `radius` of `origin`
pub fn nearest_in_range(targets: &[SharedTarget], origin: Position, radius: f32) -> Option<&SharedTarget> {
    targets
        .iter()
        .filter_map(|target| {
            let guard = target.lock().ok()?;
            if !guard.is_active() {
                return None;
            }
            let distance = guard.position().distance_to(origin);
            (distance <= radius).then_some((target, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(target, _)| target)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        id: u32,
        active: bool,
        position: Position,
        damage: u32,
    }

    impl DamageableTarget for Dummy {
        fn id(&self) -> TargetId {
            TargetId(self.id)
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn position(&self) -> Position {
            self.position
        }

        fn apply_hit(&mut self, amount: u32) {
            self.damage += amount;
        }
    }

    fn dummy(id: u32, x: f32, active: bool) -> SharedTarget {
        Arc::new(Mutex::new(Dummy {
            id,
            active,
            position: Position::new(x, 0.0),
            damage: 0,
        }))
    }

    #[test]
    fn test_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
    }

    #[test]
    fn test_nearest_in_range() {
        let targets = vec![dummy(1, 200.0, true), dummy(2, 80.0, true), dummy(3, 50.0, false)];
        let origin = Position::default();

        let found = nearest_in_range(&targets, origin, 250.0).unwrap();
        assert_eq!(found.lock().unwrap().id(), TargetId(2));

        assert!(nearest_in_range(&targets, origin, 60.0).is_none());
        assert!(nearest_in_range(&[], origin, 1_000.0).is_none());
    }

    #[test]
    fn test_shared_player_position() {
        let player = Arc::new(Mutex::new(Position::new(1.0, 2.0)));
        assert_eq!(PositionProvider::position(&player), Position::new(1.0, 2.0));

        *player.lock().unwrap() = Position::new(5.0, 5.0);
        assert_eq!(PositionProvider::position(&player), Position::new(5.0, 5.0));
    }
}
