// SPDX-License-Identifier: MIT OR Apache-2.0
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use weftend_examiner::{capture, detect, mint, probe, Limits, Profile};

fn make_fixture(files: usize) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), b"<html><body>hi</body></html>").unwrap();
    for i in 0..files {
        std::fs::write(dir.path().join(format!("asset_{i}.css")), b"body { color: black; }").unwrap();
    }
    dir
}

fn bench_capture_to_mint(c: &mut Criterion) {
    let small = make_fixture(5);
    let large = make_fixture(200);
    let limits = Limits::default();

    let mut group = c.benchmark_group("capture_to_mint");
    group.bench_function("5_files", |b| {
        b.iter(|| {
            let tree = capture(black_box(small.path()), &limits);
            let observations = detect(&tree, small.path(), &limits);
            let probes = probe(&observations, small.path(), None, &limits);
            black_box(mint(Profile::Web, &tree, observations, probes, limits, "sha256:policy"))
        });
    });
    group.bench_function("200_files", |b| {
        b.iter(|| {
            let tree = capture(black_box(large.path()), &limits);
            let observations = detect(&tree, large.path(), &limits);
            let probes = probe(&observations, large.path(), None, &limits);
            black_box(mint(Profile::Web, &tree, observations, probes, limits, "sha256:policy"))
        });
    });
    group.finish();
}

criterion_group!(benches, bench_capture_to_mint);
criterion_main!(benches);
