use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use glitchframe::{
    composition::{BlendMode, Compositor, Layer},
    effects::{EffectRegistry, Params},
    pipeline::{EffectInstance, EffectStates, Pipeline},
    video::{encoder, Frame},
};

fn criterion_config() -> Criterion {
    match std::env::var("GLITCHFRAME_BENCH_PROFILE").as_deref() {
        Ok("ci") => Criterion::default()
            .warm_up_time(Duration::from_millis(150))
            .measurement_time(Duration::from_millis(400))
            .sample_size(10),
        _ => Criterion::default()
            .warm_up_time(Duration::from_secs(1))
            .measurement_time(Duration::from_secs(3))
            .sample_size(20),
    }
}

fn gradient(width: u32, height: u32) -> Frame {
    let mut frame = Frame::new_transparent(width, height);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            frame.set_pixel(x, y, [r, g, r ^ g, 255]);
        }
    }
    frame
}

fn glitch_chain() -> Vec<EffectInstance> {
    vec![
        EffectInstance::new("fx.channelshift"),
        EffectInstance::new("fx.noise").with_params(Params::new().set("intensity", 0.2f32)),
        EffectInstance::new("fx.vhs").with_mix(0.8),
        EffectInstance::new("fx.echo"),
    ]
}

fn bench_apply_chain(c: &mut Criterion) {
    let registry = EffectRegistry::new();
    let pipeline = Pipeline::new(&registry);
    let chain = glitch_chain();

    let mut group = c.benchmark_group("apply_chain");
    for (width, height) in [(640u32, 360u32), (1280, 720)] {
        let frame = gradient(width, height);
        group.throughput(Throughput::Bytes(u64::from(width) * u64::from(height) * 4));
        group.bench_with_input(BenchmarkId::from_parameter(format!("{width}x{height}")), &frame, |b, frame| {
            let mut index = 0u64;
            b.iter(|| {
                index += 1;
                let result = pipeline
                    .apply_chain(frame, &chain, 42, index, frame.dimensions(), &EffectStates::new())
                    .unwrap();
                black_box(result)
            })
        });
    }
    group.finish();
}

fn bench_composite(c: &mut Criterion) {
    let registry = EffectRegistry::new();
    let compositor = Compositor::new(Pipeline::new(&registry));
    let base = gradient(1280, 720);

    let mut group = c.benchmark_group("render_composite");
    for mode in [BlendMode::Normal, BlendMode::Overlay, BlendMode::Difference] {
        let layers = vec![
            Layer::new(base.clone()),
            Layer::new(base.clone())
                .with_chain(vec![EffectInstance::new("fx.invert")])
                .with_blend_mode(mode)
                .with_opacity(0.6),
        ];
        group.bench_function(mode.as_str(), |b| {
            b.iter(|| black_box(compositor.render_composite(&layers, (1280, 720), 7).unwrap()))
        });
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let frame = gradient(1280, 720);
    c.bench_function("encode_fit_720p", |b| {
        b.iter(|| black_box(encoder::encode_fit(&frame, 512 * 1024, &encoder::DEFAULT_QUALITY_LADDER).unwrap()))
    });
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_apply_chain, bench_composite, bench_encode
}
criterion_main!(benches);
