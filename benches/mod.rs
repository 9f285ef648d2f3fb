use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    window_bench::bench_in_order_commits,
    window_bench::bench_reverse_commits,
    window_bench::bench_concurrent_pipeline,
);
criterion_main!(benches);
