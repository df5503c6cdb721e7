use criterion::{Criterion, black_box, criterion_group, criterion_main};
use nes_core::prelude::*;

#[path = "../tests/common/mod.rs"]
mod common;

fn booted(headless: bool) -> Emulator {
    let mut emulator = Emulator::from_bytes(&common::test_rom(), headless)
        .expect("synthetic cartridge loads");
    for _ in 0..6 {
        emulator.step();
    }
    emulator
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");

    for (name, headless) in [("full", false), ("light", true)] {
        let mut emulator = booted(headless);
        group.bench_function(name, |b| {
            b.iter(|| {
                emulator.step();
                black_box(emulator.memory()[common::NMI_COUNTER]);
            })
        });
    }

    group.finish();
}

fn bench_snapshots(c: &mut Criterion) {
    let emulator = booted(true);
    let state = emulator.serialize();

    c.bench_function("serialize", |b| b.iter(|| black_box(emulator.serialize())));
    c.bench_function("backup_restore", |b| {
        let mut target = booted(true);
        b.iter(|| {
            target.backup();
            target.restore();
        })
    });
    c.bench_function("deserialize", |b| {
        let mut target = booted(true);
        b.iter(|| target.deserialize(black_box(&state)))
    });
}

criterion_group!(benches, bench_step, bench_snapshots);
criterion_main!(benches);
