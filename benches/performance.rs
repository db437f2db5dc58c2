// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Performance benchmarks for the rhythm core
//!
//! Run with: cargo bench
//!
//! These benchmarks measure:
//! - Beat scheduling math
//! - Beat counting through the engine
//! - Input judgement

use barcode_rhythm::config::RhythmConfig;
use barcode_rhythm::rhythm::judge::nearest_beat_distance;
use barcode_rhythm::rhythm::{ActionKind, HitWindows, RhythmEngine};
use barcode_rhythm::timing::{BeatClock, BeatEvent, BeatListener, ManualTimeSource};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

struct Sink(u64);

impl BeatListener for Sink {
    fn handle_beat(&mut self, event: &BeatEvent) {
        self.0 = event.index;
    }
}

/// Benchmark one schedule-and-fire cycle of the beat clock
fn bench_clock_cycle(c: &mut Criterion) {
    let time = Arc::new(ManualTimeSource::new(0.0));
    let mut clock = BeatClock::new(time.clone(), 146.0);
    let mut sink = Sink(0);
    clock.start(146.0);
    clock.schedule_next();

    c.bench_function("clock_fire_into", |b| {
        b.iter(|| {
            time.advance(60_000.0 / 146.0);
            black_box(clock.fire_into(&mut sink))
        })
    });
}

/// Benchmark nearest-beat classification
fn bench_judgement(c: &mut Criterion) {
    let windows = HitWindows::default();
    let interval = 60_000.0 / 146.0;

    c.bench_function("nearest_beat_classify", |b| {
        let mut since = 0.0;
        b.iter(|| {
            since = (since + 7.3) % interval;
            let (distance, _) = nearest_beat_distance(black_box(since), interval);
            black_box(windows.classify(distance))
        })
    });
}

/// Benchmark engine beat counting and input handling
fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");

    for bpm in [90.0, 146.0, 200.0].iter() {
        group.bench_with_input(BenchmarkId::new("on_beat", bpm), bpm, |b, &bpm| {
            let time = Arc::new(ManualTimeSource::new(0.0));
            let mut config = RhythmConfig::default();
            config.bpm = bpm;
            let mut engine = RhythmEngine::new(config, time.clone());
            engine.start(bpm);
            b.iter(|| {
                time.advance(60_000.0 / bpm);
                black_box(engine.on_beat())
            })
        });

        group.bench_with_input(BenchmarkId::new("beat_and_input", bpm), bpm, |b, &bpm| {
            let time = Arc::new(ManualTimeSource::new(0.0));
            let mut config = RhythmConfig::default();
            config.bpm = bpm;
            let mut engine = RhythmEngine::new(config, time.clone());
            engine.start(bpm);
            let interval = 60_000.0 / bpm;
            b.iter(|| {
                time.advance(interval - 20.0);
                engine.on_beat();
                time.advance(20.0);
                black_box(engine.handle_input(ActionKind::Attack))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_clock_cycle, bench_judgement, bench_engine);
criterion_main!(benches);
