//! Benchmarks for the query hot path: Hamming distances and inverted-file
//! scoring across posting-list lengths.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;

use loci::{BinarySignature, HammingWeights, ImageScore, InvertedFile};

fn random_descriptor(rng: &mut StdRng, bits: usize) -> Vec<f32> {
    (0..bits).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect()
}

fn random_file<const B: usize>(rng: &mut StdRng, num_entries: usize) -> InvertedFile<B> {
    let bits = B * 8;
    let mut file = InvertedFile::new();

    let sample: Vec<Vec<f32>> = (0..64).map(|_| random_descriptor(rng, bits)).collect();
    file.compute_hamming_embedding(&sample);

    // ~10 postings per image on average: realistic burstiness.
    let num_images = (num_entries / 10).max(1) as u32;
    for _ in 0..num_entries {
        let image_id = rng.gen_range(0..num_images);
        file.add_entry(image_id, &random_descriptor(rng, bits));
    }
    file.compute_idf_weight(num_images * 100);
    file.sort_entries();
    file
}

fn bench_hamming_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("hamming_distance");
    let mut rng = StdRng::seed_from_u64(42);

    fn signature<const B: usize>(rng: &mut StdRng) -> BinarySignature<B> {
        let mut bytes = [0u8; B];
        rng.fill(&mut bytes[..]);
        BinarySignature::from_bytes(bytes)
    }

    let (a32, b32) = (signature::<4>(&mut rng), signature::<4>(&mut rng));
    group.bench_function("32_bits", |bench| {
        bench.iter(|| black_box(&a32).hamming_distance(black_box(&b32)));
    });

    let (a64, b64) = (signature::<8>(&mut rng), signature::<8>(&mut rng));
    group.bench_function("64_bits", |bench| {
        bench.iter(|| black_box(&a64).hamming_distance(black_box(&b64)));
    });

    let (a128, b128) = (signature::<16>(&mut rng), signature::<16>(&mut rng));
    group.bench_function("128_bits", |bench| {
        bench.iter(|| black_box(&a128).hamming_distance(black_box(&b128)));
    });

    group.finish();
}

fn bench_score_feature(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_feature_64_bits");
    let weights = HammingWeights::gaussian(64);

    for num_entries in [100usize, 1_000, 10_000] {
        let mut rng = StdRng::seed_from_u64(7);
        let file = random_file::<8>(&mut rng, num_entries);
        let query = random_descriptor(&mut rng, 64);
        let mut scores: Vec<ImageScore> = Vec::with_capacity(num_entries);

        group.throughput(Throughput::Elements(num_entries as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_entries),
            &num_entries,
            |bench, _| {
                bench.iter(|| {
                    file.score_feature(black_box(&query), &weights, &mut scores);
                    black_box(scores.len())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_hamming_distance, bench_score_feature);
criterion_main!(benches);
