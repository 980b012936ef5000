//! Equalizer Benchmarks
//!
//! Performance benchmarks for filter design and processing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use spectreq::config::{EqualizerConfig, ParameterSet};
use spectreq::dsp::{fsm_kernel, BandLayout, GraphicEqDesigner, WindowSpec, ZeroPhaseFir};
use spectreq::engine::AudioBuffer;

fn stereo_tone(duration_secs: f64) -> AudioBuffer {
    let left = AudioBuffer::sine_wave(440.0, duration_secs, 44100).samples.remove(0);
    let right = AudioBuffer::sine_wave(880.0, duration_secs, 44100).samples.remove(0);
    AudioBuffer::from_channels(vec![left, right], 44100).unwrap()
}

fn benchmark_fir_synthesis(c: &mut Criterion) {
    let fir = ZeroPhaseFir::new(1024, &WindowSpec::default(), None).unwrap();
    let log_magnitude: Vec<f64> = (0..1024).map(|k| (k as f64 * 0.01).sin()).collect();

    c.bench_function("fir_synthesis_1024_bins", |b| {
        b.iter(|| fir.synthesize(black_box(&log_magnitude)).unwrap())
    });
}

fn benchmark_geq_design(c: &mut Criterion) {
    let designer = GraphicEqDesigner::new(BandLayout::ThirdOct, 48000.0).unwrap();
    let log_gains: Vec<f64> = (0..31).map(|k| (k as f64 * 0.4).cos() * 0.5).collect();
    let cascade = designer.design(&log_gains).unwrap();

    c.bench_function("geq_design_31_bands", |b| {
        b.iter(|| designer.design(black_box(&log_gains)).unwrap())
    });
    c.bench_function("fsm_kernel_8192", |b| {
        b.iter(|| fsm_kernel(black_box(&cascade), 8192).unwrap())
    });
}

fn benchmark_processing(c: &mut Criterion) {
    let input = stereo_tone(5.0);

    for (name, json) in [
        ("fir_stereo_5s", r#"{ "type": "zero_phase_fir", "channel_mode": "stereo" }"#),
        ("geq_exact_5s", r#"{ "type": "graphic", "backend": "exact", "channel_mode": "stereo" }"#),
        ("geq_fsm_5s", r#"{ "type": "graphic", "channel_mode": "midside" }"#),
    ] {
        let eq = EqualizerConfig::from_json_str(json).unwrap().build().unwrap();
        let mut params = ParameterSet::default();
        for (param_name, (rows, cols)) in eq.parameter_size().iter() {
            let row: Vec<f64> = (0..cols).map(|k| (k as f64 * 0.3).sin() * 0.3).collect();
            params.insert(param_name, vec![row; rows]);
        }

        c.bench_function(name, |b| {
            b.iter(|| {
                eq.process(black_box(&input), params.for_equalizer(eq.as_ref()).unwrap())
                    .unwrap()
            })
        });
    }
}

criterion_group!(
    benches,
    benchmark_fir_synthesis,
    benchmark_geq_design,
    benchmark_processing
);
criterion_main!(benches);
