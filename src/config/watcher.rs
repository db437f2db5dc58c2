// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! File watcher for hot-reloading rhythm tuning.
//!
//! Edits to the tuning file are picked up without stopping the beat clock;
//! the engine applies them through `RhythmEngine::apply_config`.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::debug;

use super::RhythmFile;

/// Events emitted by the config watcher
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    /// Configuration file was modified and successfully reloaded
    Reloaded(Box<RhythmFile>),
    /// Configuration file was modified but failed to parse or validate
    Error(String),
}

/// Configuration file watcher with debouncing and validation
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    event_receiver: Receiver<ConfigEvent>,
    watched_path: PathBuf,
}

impl ConfigWatcher {
    /// Create a new watcher for a single YAML file.
    ///
    /// # Arguments
    /// * `path` - Tuning file to watch
    /// * `debounce_ms` - Debounce duration in milliseconds (default: 500)
    pub fn new<P: AsRef<Path>>(path: P, debounce_ms: Option<u64>) -> Result<Self> {
        let watched_path = path.as_ref().to_path_buf();
        let debounce_duration = Duration::from_millis(debounce_ms.unwrap_or(500));

        let (event_tx, event_rx): (Sender<ConfigEvent>, Receiver<ConfigEvent>) = mpsc::channel();
        let (notify_tx, notify_rx): (Sender<Event>, Receiver<Event>) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = notify_tx.send(event);
                }
            },
            Config::default(),
        )
        .map_err(|e| anyhow!("Failed to create file watcher: {}", e))?;

        // Watch the parent directory so editors that replace the file on
        // save are still seen
        let watch_dir = watched_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| anyhow!("Failed to watch path {:?}: {}", watch_dir, e))?;

        let target = watched_path.clone();
        std::thread::spawn(move || {
            let mut last_event_time: Option<Instant> = None;

            loop {
                match notify_rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(event) => {
                        let touches_target = event.paths.iter().any(|p| same_file(p, &target));
                        if touches_target
                            && matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                        {
                            last_event_time = Some(Instant::now());
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        let Some(last_time) = last_event_time else {
                            continue;
                        };
                        if last_time.elapsed() < debounce_duration {
                            continue;
                        }
                        last_event_time = None;

                        let event = match RhythmFile::load(&target) {
                            Ok(config) => ConfigEvent::Reloaded(Box::new(config)),
                            Err(e) => ConfigEvent::Error(format!(
                                "Failed to load {:?}: {:#}",
                                target, e
                            )),
                        };
                        debug!(path = ?target, "Rhythm config changed");
                        if event_tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        // Watcher was dropped, exit thread
                        break;
                    }
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            event_receiver: event_rx,
            watched_path,
        })
    }

    /// Try to receive the next config event (non-blocking)
    pub fn try_recv(&self) -> Option<ConfigEvent> {
        self.event_receiver.try_recv().ok()
    }

    /// Receive all pending config events
    pub fn recv_all(&self) -> Vec<ConfigEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }

    /// Get the path being watched
    pub fn watched_path(&self) -> &Path {
        &self.watched_path
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.file_name() == b.file_name(),
    }
}

/// Validate a configuration without applying it
pub fn validate_config<P: AsRef<Path>>(path: P) -> Result<RhythmFile> {
    RhythmFile::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_validate_config() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("rhythm.yaml");

        fs::write(&file_path, "rhythm:\n  bpm: 140\n").unwrap();

        let config = validate_config(&file_path).unwrap();
        assert_eq!(config.rhythm.bpm, 140.0);
    }

    #[test]
    fn test_validate_invalid_config() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("invalid.yaml");

        fs::write(&file_path, "this is not valid yaml: [").unwrap();
        assert!(validate_config(&file_path).is_err());

        fs::write(&file_path, "rhythm:\n  bpm: -5\n").unwrap();
        assert!(validate_config(&file_path).is_err());
    }

    #[test]
    fn test_watcher_creation() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("watch_test.yaml");
        fs::write(&file_path, "rhythm:\n  bpm: 120\n").unwrap();

        let watcher = ConfigWatcher::new(&file_path, Some(100)).unwrap();
        assert_eq!(watcher.watched_path(), file_path.as_path());
    }

    #[test]
    fn test_watcher_detects_changes() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("detect_test.yaml");
        fs::write(&file_path, "rhythm:\n  bpm: 120\n").unwrap();

        let watcher = ConfigWatcher::new(&file_path, Some(100)).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let mut file = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&file_path)
            .unwrap();
        file.write_all(b"rhythm:\n  bpm: 150\n").unwrap();
        file.flush().unwrap();
        drop(file);

        std::thread::sleep(Duration::from_millis(300));

        let events = watcher.recv_all();
        let reloaded_event = events.iter().find(|e| matches!(e, ConfigEvent::Reloaded(_)));

        if let Some(ConfigEvent::Reloaded(config)) = reloaded_event {
            assert_eq!(config.rhythm.bpm, 150.0);
        }
        // Note: file events may not fire in CI environments, so the
        // reload itself is not asserted
    }
}
