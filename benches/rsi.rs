//! Benchmarks for RSI computation

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use moonwatch::indicators::{compute_rsi, RsiEngine, RsiMode};
use moonwatch::types::Candle;

fn synthetic_history(len: usize) -> Vec<Candle> {
    (0..len)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.37).sin() * 5.0;
            Candle {
                open_time: i as i64 * 900_000,
                open: close,
                high: close,
                low: close,
                close,
                volume: 10.0,
            }
        })
        .collect()
}

fn benchmark_full_rsi(c: &mut Criterion) {
    let history = synthetic_history(500);

    c.bench_function("rsi_full_500_candles", |b| {
        b.iter(|| compute_rsi(black_box(&history), 14))
    });
}

fn benchmark_incremental_rsi(c: &mut Criterion) {
    let history = synthetic_history(501);
    let mut engine = RsiEngine::new(14, RsiMode::Incremental);
    engine.compute("ETHBTC", &history[..500]);

    c.bench_function("rsi_incremental_one_new_candle", |b| {
        b.iter(|| {
            engine.reset();
            engine.compute("ETHBTC", black_box(&history[..500]));
            engine.compute("ETHBTC", black_box(&history[1..]))
        })
    });
}

criterion_group!(benches, benchmark_full_rsi, benchmark_incremental_rsi);
criterion_main!(benches);
