// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for the rhythm core.
//!
//! Engine operations report status values instead of errors; these variants
//! only surface from configuration validation and the beat clock thread.

use std::io;

/// Error type for rhythm core setup
#[derive(thiserror::Error, Debug)]
pub enum RhythmError {
    /// BPM is not a positive finite number
    #[error("Invalid BPM: {0}")]
    InvalidBpm(f64),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The beat clock thread could not be spawned
    #[error("Failed to spawn beat clock thread: {0}")]
    ClockSpawn(#[source] io::Error),

    /// The beat clock thread is no longer running
    #[error("Beat clock is stopped")]
    ClockStopped,
}

/// Result type for rhythm core operations
pub type Result<T> = std::result::Result<T, RhythmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(RhythmError::InvalidBpm(-1.0).to_string(), "Invalid BPM: -1");
        assert_eq!(
            RhythmError::InvalidConfig("perfect window too wide".to_string()).to_string(),
            "Invalid configuration: perfect window too wide"
        );
        assert_eq!(RhythmError::ClockStopped.to_string(), "Beat clock is stopped");
    }

    #[test]
    fn test_clock_spawn_keeps_source() {
        use std::error::Error;

        let err = RhythmError::ClockSpawn(io::Error::new(io::ErrorKind::Other, "no threads"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("no threads"));
    }
}
