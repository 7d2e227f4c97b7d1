use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use noodles_timeline_core::{
    config::TimelineConfig,
    data::{ControlOffset, Keyframe},
    engine::TimelineEngine,
    inputs::{Inputs, TransportCommand},
    timeline::Timeline,
};

fn build_timeline(uniforms: usize, keys_per_channel: i32) -> Timeline {
    let mut tl = Timeline::with_range(TimelineConfig::default(), 0, 600);
    let step = 600 / keys_per_channel.max(1);
    for u in 0..uniforms {
        let name = format!("u{u}");
        for channel in 0..4 {
            for i in 0..=keys_per_channel {
                let value = ((i as f32) * 0.37 + channel as f32).sin();
                let key = if i % 2 == 0 {
                    Keyframe::new(value).with_out(ControlOffset::new(step as f32 / 3.0, 0.2))
                } else {
                    Keyframe::new(value).with_in(ControlOffset::new(-(step as f32) / 3.0, -0.2))
                };
                tl.add_key_with(&name, channel, i * step, key);
            }
        }
    }
    tl
}

fn bench_cache_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_rebuild");
    for keys in [4, 32, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, &keys| {
            let mut tl = build_timeline(1, keys);
            b.iter(|| {
                tl.invalidate("u0", 0);
                black_box(tl.evaluate("u0", 0, 300))
            });
        });
    }
    group.finish();
}

fn bench_playback_tick(c: &mut Criterion) {
    let mut engine = TimelineEngine::new(TimelineConfig {
        frame_rate_ms: 16,
        ..TimelineConfig::default()
    });
    engine.insert("bench", build_timeline(16, 24));
    engine.update(0.0, Inputs::default().with_command(TransportCommand::Play));
    c.bench_function("playback_tick_16_uniforms", |b| {
        b.iter(|| black_box(engine.update(16.0, Inputs::default()).changes.len()))
    });
}

criterion_group!(benches, bench_cache_rebuild, bench_playback_tick);
criterion_main!(benches);
