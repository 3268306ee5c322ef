/// Benchmarks for the storage-side chunk folds.
use activestorage::models::{DType, RawBlock};
use activestorage::operation::Reduction;
use activestorage::operations;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn criterion_benchmark(c: &mut Criterion) {
    for size_k in [64, 256, 1024] {
        let size = size_k * 1024;
        let data: Vec<i64> = (0_i64..size).map(|i| i % 256).collect::<Vec<i64>>();
        let block =
            RawBlock::from_elements::<i64>(DType::Int64, vec![size as usize], &data).unwrap();
        for operation in [Reduction::Min, Reduction::Max, Reduction::Mean] {
            let name = format!("{}({})", operation, size);
            c.bench_function(&name, |b| {
                b.iter(|| {
                    operations::reduce_chunk(black_box(&block), operation).unwrap();
                })
            });
        }
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
