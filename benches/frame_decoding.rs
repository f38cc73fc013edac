//! Benchmarks for frame extraction and decoding
//!
//! Covers the per-frame work done for every list a meter pushes:
//! - Cutting frames out of a raw stream, in whole and in serial-sized chunks
//! - Decoding each list shape
//! - Serializing the state payload
//!
//! Platform: Cross-platform (synthetic frames from test_utils, CI-safe)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use kraft::codec::{FrameExtractor, decode_frame};
use kraft::test_utils::{MessageBuilder, fixture_frame, fixture_stream};
use kraft::types::Shape;
use std::hint::black_box;

/// A capture of mixed lists with some line noise in between.
fn capture(lists: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for n in 0..lists {
        if n % 10 == 0 {
            bytes.extend(fixture_stream());
        } else {
            let list = MessageBuilder::new(Shape::Minimal).active_power_positive(n as i32);
            bytes.extend(list.build_stream());
        }
        bytes.extend([0x00, 0x55]);
    }
    bytes
}

fn bench_extraction(c: &mut Criterion) {
    let data = capture(100);

    let mut group = c.benchmark_group("frame_extraction");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk in [16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut extractor = FrameExtractor::new();
                let mut frames = 0;
                for part in data.chunks(chunk) {
                    extractor.extend(black_box(part));
                    while let Some(frame) = extractor.next_frame() {
                        frames += black_box(frame).len();
                    }
                }
                frames
            })
        });
    }

    group.finish();
}

fn bench_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_frame");

    for shape in Shape::ALL {
        let frame = MessageBuilder::new(shape).build_frame();
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(format!("{shape:?}")), &frame, |b, f| {
            b.iter(|| decode_frame(black_box(f)))
        });
    }

    group.finish();
}

fn bench_state_payload(c: &mut Criterion) {
    let Ok(message) = decode_frame(&fixture_frame()) else {
        panic!("fixture frame does not decode");
    };

    c.bench_function("state_json", |b| b.iter(|| serde_json::to_vec(black_box(&message))));
}

criterion_group!(benches, bench_extraction, bench_decoding, bench_state_payload);
criterion_main!(benches);
