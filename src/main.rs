// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use anyhow::{anyhow, Context, Result};
use barcode_rhythm::config::{validate_config, ConfigEvent, ConfigWatcher, RhythmFile};
use barcode_rhythm::control::{apply_action, format_shortcut, ControlAction, KeyboardController};
use barcode_rhythm::rhythm::{
    ActionKind, InputTiming, LoopCoordinator, LoopSignal, RhythmEngine, RhythmPhase,
};
use barcode_rhythm::timing::{
    BeatClock, BeatClockHandle, BeatEvent, BeatListener, ManualTimeSource, SystemTimeSource,
    TimeSource,
};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal;
use rand::Rng;
use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!("BARCODE RHYTHM - Beat-synchronised rhythm core");
    println!();
    println!("Usage: barcode-rhythm [--config <FILE>] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  --simulate [BPM] [BEATS]  Run a headless session with a scripted player");
    println!("  --drift [BEATS]           Measure beat clock drift on a real thread");
    println!("  --play [BPM]              Play interactively in the terminal");
    println!("  --check-config <FILE>     Validate a tuning file and exit");
    println!("  --help                    Show this help message");
    println!();
    println!("Options:");
    println!("  --config <FILE>           Load tuning from a YAML file (hot-reloaded in --play)");
}

/// Tally of judged inputs
#[derive(Debug, Default)]
struct Tally {
    perfect: u32,
    excellent: u32,
    miss: u32,
    ignored: u32,
}

impl Tally {
    fn record(&mut self, timing: InputTiming) {
        match timing {
            InputTiming::Perfect => self.perfect += 1,
            InputTiming::Excellent => self.excellent += 1,
            InputTiming::Miss => self.miss += 1,
            _ => self.ignored += 1,
        }
    }
}

fn run_simulation(file: &RhythmFile, bpm: f64, beats: u64) -> Result<()> {
    let time = Arc::new(ManualTimeSource::new(0.0));
    let mut engine = RhythmEngine::new(file.rhythm.clone(), time.clone());
    let mut clock = BeatClock::new(time.clone(), bpm);
    let mut coordinator = LoopCoordinator::new(file.music_loop.clone(), time.clone());
    let mut rng = rand::thread_rng();

    let interval = 60_000.0 / bpm;
    let jitter = file.rhythm.excellent_window_ms * 1.2;
    let mut tally = Tally::default();

    println!("Simulating {} beats at {} BPM ({:.1}ms per beat)", beats, bpm, interval);

    engine.start(bpm);
    clock.start(bpm);
    let mut wait = clock.schedule_next();
    let mut delivered = 0u64;

    while delivered < beats {
        let Some(delay) = wait else { break };
        time.advance_by(delay);

        let before = clock.beats_fired();
        wait = clock.fire_into(&mut engine);
        if clock.beats_fired() == before {
            continue;
        }
        delivered += 1;

        // The player presses roughly once per beat, aiming at the nearest one
        if rng.gen_bool(0.9) {
            let offset: f64 = rng.gen_range(-jitter..=jitter);
            let press_at = if offset >= 0.0 { offset } else { interval + offset };
            time.advance(press_at);
            let action = if rng.gen_bool(0.75) { ActionKind::Attack } else { ActionKind::Dash };
            let result = engine.handle_input(action);
            tally.record(result.timing);
            wait = wait.map(|_| clock.time_until_next_beat());
        }

        engine.update(Duration::from_secs_f64(interval / 1000.0));

        if let Some(LoopSignal::Restart) = coordinator.poll(&mut engine, &mut clock) {
            wait = clock.schedule_next();
        }

        if let RhythmPhase::SteadyState { bar: 0, beat: 0 } = engine.phase() {
            println!(
                "beat {:>5}  combo {:>3}  growth {:>2}  radius {:>5.1}",
                delivered,
                engine.combo(),
                engine.arc_growth_level(),
                engine.damage_radius()
            );
        }
    }

    println!();
    println!("Beats delivered:  {}", delivered);
    println!("Skipped beats:    {}", clock.skipped_beats());
    println!("Perfect:          {}", tally.perfect);
    println!("Excellent:        {}", tally.excellent);
    println!("Miss:             {}", tally.miss);
    println!("Not judged:       {}", tally.ignored);
    println!("Best combo:       {}", engine.max_combo());
    println!("Loop restarts:    {}", engine.loop_restart_count());
    Ok(())
}

/// Records beat lateness until enough beats were seen
struct DriftProbe {
    target: usize,
    lateness: Vec<f64>,
}

impl BeatListener for DriftProbe {
    fn handle_beat(&mut self, event: &BeatEvent) {
        self.lateness.push(event.lateness_ms());
    }

    fn is_listening(&self) -> bool {
        self.lateness.len() < self.target
    }
}

fn run_drift(file: &RhythmFile, beats: usize) -> Result<()> {
    let bpm = file.rhythm.bpm;
    let time = Arc::new(SystemTimeSource::new());
    let probe = Arc::new(Mutex::new(DriftProbe {
        target: beats,
        lateness: Vec::with_capacity(beats),
    }));

    println!("Measuring {} beats at {} BPM...", beats, bpm);
    let started = Instant::now();
    let handle = BeatClockHandle::spawn(BeatClock::new(time, bpm), Arc::clone(&probe))?;
    while handle.is_alive() {
        thread::sleep(Duration::from_millis(10));
    }
    let elapsed = started.elapsed();
    handle.stop();

    let probe = probe.lock().map_err(|_| anyhow!("Drift probe lock poisoned"))?;
    let count = probe.lateness.len().max(1) as f64;
    let mean = probe.lateness.iter().sum::<f64>() / count;
    let max = probe.lateness.iter().copied().fold(0.0, f64::max);
    let expected = (beats.saturating_sub(1)) as f64 * 60.0 / bpm;

    println!("Beats:          {}", probe.lateness.len());
    println!("Mean lateness:  {:.3}ms", mean);
    println!("Max lateness:   {:.3}ms", max);
    println!(
        "Wall time:      {:.3}s (grid {:.3}s)",
        elapsed.as_secs_f64(),
        expected
    );
    Ok(())
}

fn run_interactive(file: RhythmFile, config_path: Option<PathBuf>, bpm: f64) -> Result<()> {
    let time: Arc<dyn TimeSource> = Arc::new(SystemTimeSource::new());
    let engine = Arc::new(Mutex::new(RhythmEngine::new(file.rhythm.clone(), Arc::clone(&time))));
    let mut coordinator = LoopCoordinator::new(file.music_loop.clone(), Arc::clone(&time));
    let keyboard = KeyboardController::with_defaults();
    let watcher = config_path
        .map(|path| ConfigWatcher::new(path, None))
        .transpose()?;

    println!("Keys:");
    let mut bindings: Vec<_> = keyboard.bindings().collect();
    bindings.sort_by(|a, b| a.category.cmp(&b.category).then(a.description.cmp(&b.description)));
    for binding in bindings {
        println!("  {:<10} {}", format_shortcut(&binding.shortcut), binding.description);
    }
    println!();

    let mut bpm = bpm;
    lock(&engine)?.start(bpm);
    let mut clock = Some(BeatClockHandle::spawn(
        BeatClock::new(Arc::clone(&time), bpm),
        Arc::clone(&engine),
    )?);

    terminal::enable_raw_mode().context("Failed to enable raw terminal mode")?;
    let result = interactive_loop(&engine, &time, &mut clock, &mut coordinator, &keyboard, watcher.as_ref(), &mut bpm);
    terminal::disable_raw_mode().context("Failed to restore terminal mode")?;

    if let Some(handle) = clock.take() {
        handle.stop();
    }
    result
}

fn lock(engine: &Mutex<RhythmEngine>) -> Result<std::sync::MutexGuard<'_, RhythmEngine>> {
    engine.lock().map_err(|_| anyhow!("Rhythm engine lock poisoned"))
}

fn interactive_loop(
    engine: &Arc<Mutex<RhythmEngine>>,
    time: &Arc<dyn TimeSource>,
    clock: &mut Option<BeatClockHandle>,
    coordinator: &mut LoopCoordinator,
    keyboard: &KeyboardController,
    watcher: Option<&ConfigWatcher>,
    bpm: &mut f64,
) -> Result<()> {
    let frame = Duration::from_millis(16);
    let mut last_frame = Instant::now();
    let mut last_count = 0u64;

    loop {
        if event::poll(frame)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let Some(action) = keyboard.action_for(key.code, key.modifiers) else {
                    continue;
                };
                if action == ControlAction::Quit {
                    break;
                }

                let mut guard = lock(engine)?;
                if let Some(result) = apply_action(action, &mut guard, bpm) {
                    print!("{:?} (combo {})\r\n", result.timing, result.combo);
                }
                drop(guard);

                if let ControlAction::AdjustTempo(_) = action {
                    if let Some(handle) = clock.as_ref() {
                        if let Err(e) = handle.set_bpm(*bpm) {
                            warn!("Beat clock tempo change failed: {}", e);
                        }
                    }
                }

                if action == ControlAction::Start {
                    // The clock thread ends when the engine stops; spawn a fresh one
                    if let Some(old) = clock.take() {
                        old.stop();
                    }
                    *clock = Some(BeatClockHandle::spawn(
                        BeatClock::new(Arc::clone(time), *bpm),
                        Arc::clone(engine),
                    )?);
                    coordinator.restart_track();
                }
            }
        }

        if let Some(watcher) = watcher {
            for event in watcher.recv_all() {
                match event {
                    ConfigEvent::Reloaded(file) => {
                        if let Err(e) = lock(engine)?.apply_config(file.rhythm) {
                            warn!("Rejected tuning: {}", e);
                        }
                    }
                    ConfigEvent::Error(e) => warn!("Config reload failed: {}", e),
                }
            }
        }

        let mut guard = lock(engine)?;
        if let Some(handle) = clock.as_mut() {
            coordinator.poll(&mut guard, handle);
        }
        let now = Instant::now();
        guard.update(now - last_frame);
        last_frame = now;

        let count = guard.global_beat_count();
        if count != last_count {
            last_count = count;
            let snapshot = guard.snapshot();
            print!(
                "{:?}  combo {}  arc {:.2}  phrase {:.2}\r\n",
                snapshot.phase,
                snapshot.combo,
                snapshot.power_arc_intensity,
                snapshot.phrase_progress
            );
        }
    }
    Ok(())
}

fn load_file(path: Option<&PathBuf>) -> Result<RhythmFile> {
    match path {
        Some(path) => RhythmFile::load(path),
        None => Ok(RhythmFile::default()),
    }
}

fn parse_or<T: std::str::FromStr>(arg: Option<&String>, default: T) -> Result<T> {
    match arg {
        Some(value) => value
            .parse()
            .map_err(|_| anyhow!("Invalid number: {}", value)),
        None => Ok(default),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut config_path = None;
    if let Some(pos) = args.iter().position(|a| a == "--config") {
        if pos + 1 >= args.len() {
            eprintln!("Error: --config requires a file path");
            std::process::exit(1);
        }
        config_path = Some(PathBuf::from(args.remove(pos + 1)));
        args.remove(pos);
    }

    if args.is_empty() {
        println!("BARCODE RHYTHM - Beat-synchronised rhythm core");
        println!("Run with --help for usage information");
        return Ok(());
    }

    match args[0].as_str() {
        "--simulate" => {
            let file = load_file(config_path.as_ref())?;
            let bpm = parse_or(args.get(1), file.rhythm.bpm)?;
            let beats = parse_or(args.get(2), 128u64)?;
            run_simulation(&file, bpm, beats)?;
        }
        "--drift" => {
            let file = load_file(config_path.as_ref())?;
            let beats = parse_or(args.get(1), 32usize)?;
            run_drift(&file, beats)?;
        }
        "--play" => {
            let file = load_file(config_path.as_ref())?;
            let bpm = parse_or(args.get(1), file.rhythm.bpm)?;
            info!(bpm, "Starting interactive session");
            run_interactive(file, config_path, bpm)?;
        }
        "--check-config" => {
            let Some(path) = args.get(1) else {
                eprintln!("Error: --check-config requires a file path");
                std::process::exit(1);
            };
            let file = validate_config(path)?;
            println!("{} is valid", path);
            print!("{}", file.to_yaml()?);
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown option: {}", args[0]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
