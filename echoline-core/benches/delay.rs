//! Hot-path benchmark for the delay line: one read + one write per sample,
//! the inner loop of the feedback comb filter.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use echoline_core::delay::DelayLine;

fn bench_feedback_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("delay_line");

    group.bench_function("tick_4096", |b| {
        let mut line = DelayLine::new(131_072);
        b.iter(|| {
            for i in 0..4096 {
                line.tick(black_box(i as f32 * 1e-5));
            }
        });
    });

    group.bench_function("comb_4096", |b| {
        let mut line = DelayLine::new(131_072);
        let offset = 441;
        b.iter(|| {
            let mut acc = 0.0f32;
            for i in 0..4096 {
                let y = 0.5 * line.read_back(offset) + black_box(i as f32 * 1e-5);
                line.tick(y);
                acc += y;
            }
            black_box(acc)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_feedback_tick);
criterion_main!(benches);
