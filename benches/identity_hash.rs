//! Benchmarks for identity hashing.
//!
//! Benchmark targets:
//! - Single hash of a typical record: <2µs
//! - Assigning hashes to a 1,000 record upload: <5ms

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tidemark::models::Glucose;
use tidemark::services::deduplicator::assign_data_set_data_identity_hashes;
use tidemark::{Data, IdentityFieldsVersion, generate_identity_hash};

fn upload(size: usize) -> Data {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..size)
        .map(|i| {
            let minutes = i64::try_from(i).unwrap() * 5;
            let mut glucose = Glucose::cbg("mg/dL", 80.0 + (i % 120) as f64);
            glucose.base.user_id = Some("user-1".to_string());
            glucose.base.device_id = Some("device-1".to_string());
            glucose.base.data_set_id = Some("upload-1".to_string());
            glucose.base.time = Some(start + Duration::minutes(minutes));
            Box::new(glucose) as Box<dyn tidemark::Datum>
        })
        .collect()
}

fn bench_generate(c: &mut Criterion) {
    let fields = [
        "user-1",
        "device-1",
        "2024-01-01T00:00:00.000Z",
        "cbg",
        "mg/dL",
        "112",
    ];
    c.bench_function("generate_identity_hash", |b| {
        b.iter(|| generate_identity_hash(black_box(&fields)).unwrap());
    });
}

fn bench_assign(c: &mut Criterion) {
    let mut group = c.benchmark_group("assign_identity_hashes");
    for size in [100, 1_000, 10_000] {
        for version in [
            IdentityFieldsVersion::Platform,
            IdentityFieldsVersion::Legacy,
            IdentityFieldsVersion::DataSetId,
        ] {
            group.bench_with_input(
                BenchmarkId::new(version.as_str(), size),
                &size,
                |b, &size| {
                    b.iter_batched_ref(
                        || upload(size),
                        |data| assign_data_set_data_identity_hashes(data, version).unwrap(),
                        criterion::BatchSize::LargeInput,
                    );
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_generate, bench_assign);
criterion_main!(benches);
