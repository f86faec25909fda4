//! Tokenize and decode latency benchmarks.
//!
//! Measures the host-side work around one invoke: encoding text into a
//! fixed-length sequence and decoding the output tensor.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use mobile_ai_core::engine::binder::{bind_input, decode_output};
use mobile_ai_core::engine::{ElementType, Tensor, TensorSpec, Tokenizer, TokenizerPolicy};

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize_latency");

    for (name, policy) in [
        ("gpu_128", TokenizerPolicy::gpu_default()),
        ("fallback_512", TokenizerPolicy::fallback_default()),
    ] {
        let tokenizer = Tokenizer::new(policy);
        for length in [16usize, 256, 4096] {
            let text = "a".repeat(length);
            group.throughput(Throughput::Bytes(length as u64));
            group.bench_with_input(BenchmarkId::new(name, length), &text, |b, t| {
                b.iter(|| tokenizer.encode(black_box(t)))
            });
        }
    }

    group.finish();
}

fn bench_bind(c: &mut Criterion) {
    let tokenizer = Tokenizer::new(TokenizerPolicy::fallback_default());
    let tokens = tokenizer.encode(&"b".repeat(600));
    let mut tensor = Tensor::allocate(TensorSpec::new("input_ids", ElementType::Int32, vec![1, 512]));

    c.bench_function("bind_input_512", |b| {
        b.iter(|| bind_input(black_box(&mut tensor), black_box(&tokens)))
    });
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_latency");

    for vocab in [1_000usize, 32_000] {
        let values: Vec<f32> = (0..vocab * 8).map(|i| (i % 97) as f32 * 0.01).collect();
        let logits = Tensor::from_f32("logits", vec![1, 8, vocab], values);
        group.throughput(Throughput::Elements(vocab as u64));
        group.bench_with_input(BenchmarkId::new("next_token", vocab), &logits, |b, t| {
            b.iter(|| decode_output(black_box(t)))
        });
    }

    let ascii = Tensor::from_i32("ids", vec![64], (0..64).map(|i| 32 + i).collect());
    group.bench_function("ascii_text", |b| b.iter(|| decode_output(black_box(&ascii))));

    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_bind, bench_decode);
criterion_main!(benches);
