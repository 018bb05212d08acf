//! Ring buffer throughput on the real-time path
//!
//! Measures the operations a producer and an output callback perform per
//! period, with geometry matching the default audio stream.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use media_stream_receiver::{
    audio::{RenderCallback, SharedBlockBuffer, StartGate},
    BlockRingBuffer, ElementRingBuffer,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

const BLOCK_LEN: usize = 1400;
const CAPACITY: usize = 20;

fn bench_element(c: &mut Criterion) {
    let mut group = c.benchmark_group("element_write_read");

    for chunk in [64usize, 512, 4096] {
        group.throughput(Throughput::Elements(chunk as u64));
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            let mut ring = ElementRingBuffer::<f32>::new(BLOCK_LEN * CAPACITY).unwrap();
            let input = vec![0.5f32; chunk];
            let mut output = vec![0.0f32; chunk];

            b.iter(|| {
                ring.write(black_box(&input)).unwrap();
                ring.read_into(black_box(&mut output)).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("block");
    group.throughput(Throughput::Elements(BLOCK_LEN as u64));

    group.bench_function("overwrite_full", |b| {
        let mut ring = BlockRingBuffer::<f32>::new(CAPACITY, BLOCK_LEN).unwrap();
        let block = vec![0.25f32; BLOCK_LEN];
        for _ in 0..CAPACITY {
            ring.write(&block).unwrap();
        }

        b.iter(|| ring.overwrite(black_box(&block)).unwrap());
    });

    group.bench_function("write_read_into", |b| {
        let mut ring = BlockRingBuffer::<f32>::new(CAPACITY, BLOCK_LEN).unwrap();
        let block = vec![0.25f32; BLOCK_LEN];
        let mut dst = vec![0.0f32; BLOCK_LEN];

        b.iter(|| {
            ring.write(black_box(&block)).unwrap();
            ring.read_into(black_box(&mut dst)).unwrap();
        });
    });

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_callback");

    for period in [256usize, 1024, 4096] {
        group.throughput(Throughput::Elements(period as u64));
        group.bench_with_input(BenchmarkId::from_parameter(period), &period, |b, &period| {
            let buffer = Arc::new(SharedBlockBuffer::new(CAPACITY, BLOCK_LEN).unwrap());
            let mut callback = RenderCallback::new(
                buffer.clone(),
                Arc::new(StartGate::new(0)),
                Arc::new(AtomicBool::new(true)),
            );
            let block = vec![0.1f32; BLOCK_LEN];
            let mut out = vec![0.0f32; period];

            b.iter(|| {
                while buffer.queue_length() < CAPACITY / 2 {
                    buffer.push(&block).unwrap();
                }
                callback.render(black_box(&mut out))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_element, bench_block, bench_render);
criterion_main!(benches);
