use core_config::SegmentConfig;
use core_frame::{Frame, HEIGHT, WIDTH};
use core_segment::{MorphKernel, dilate, erode, pre_process, segment};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn noisy_frame() -> Box<Frame> {
    let mut frame = Frame::new_boxed();
    // Deterministic pseudo-texture with enough contrast to exercise both
    // threshold branches.
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            frame.row_mut(y)[x] = ((x * 7 + y * 13) % 251) as u8;
        }
    }
    frame
}

fn bench_segment(c: &mut Criterion) {
    let base = noisy_frame();
    c.bench_function("segment_threshold", |b| {
        b.iter(|| {
            let mut frame = base.clone();
            segment(&mut frame, 60, 6);
            black_box(&frame);
        })
    });
}

fn bench_morph(c: &mut Criterion) {
    let mut binary = noisy_frame();
    segment(&mut binary, 60, 6);
    c.bench_function("closing_3x3", |b| {
        b.iter(|| {
            let mut frame = binary.clone();
            dilate(&mut frame, MorphKernel::Three);
            erode(&mut frame, MorphKernel::Three);
            black_box(&frame);
        })
    });
}

fn bench_full_chain(c: &mut Criterion) {
    let base = noisy_frame();
    let cfg = SegmentConfig::default();
    c.bench_function("pre_process_full", |b| {
        b.iter(|| {
            let mut frame = base.clone();
            pre_process(&mut frame, &cfg);
            black_box(&frame);
        })
    });
}

criterion_group!(benches, bench_segment, bench_morph, bench_full_chain);
criterion_main!(benches);
