use criterion::{black_box, criterion_group, criterion_main, Criterion};
use violation_core::{
    BBox, Detection, EngineConfig, FrameIndex, LineConfig, Point, SignalPhase, ViolationEngine,
    ViolationSide,
};

fn make_frame(n: usize, frame: i64) -> Vec<Detection> {
    (0..n)
        .map(|i| {
            let x = (i % 64) as f64 * 30.0;
            let bottom = 40.0 + frame as f64 * 2.0 + (i / 64) as f64 * 50.0;
            Detection::new(i as i64, BBox::new(x, bottom - 40.0, x + 25.0, bottom))
        })
        .collect()
}

fn engine() -> ViolationEngine {
    ViolationEngine::new(EngineConfig {
        stop_line: Some(LineConfig::new(
            Point::new(0.0, 300.0),
            Point::new(1920.0, 360.0),
            ViolationSide::Below,
        )),
        ..Default::default()
    })
    .expect("valid bench config")
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");

    for n in [10, 100, 1000] {
        group.bench_function(format!("{n}_tracks"), |b| {
            b.iter(|| {
                let mut eng = engine();
                // Warm up with one frame to create the records
                eng.process_frame(SignalPhase::Red, &make_frame(n, 0), FrameIndex(0))
                    .unwrap();
                // Measure a frame against established records
                let frame = make_frame(n, 60);
                black_box(
                    eng.process_frame(SignalPhase::Red, &frame, FrameIndex(1))
                        .unwrap(),
                );
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_engine);
criterion_main!(benches);
