use std::f32::consts::FRAC_PI_2;

use bevy::math::{
    Mat4,
    Vec3,
};
use criterion::{
    BenchmarkId,
    criterion_group,
    criterion_main,
    Criterion,
    Throughput,
};

use bevy_splat_stream::{
    gaussian::{
        packed::pack_all,
        rand::random_raw_buffer,
    },
    sort::CullMargin,
    RawLayout,
    VisibilitySorter,
};


const SPLAT_COUNTS: [usize; 4] = [
    1000,
    10000,
    84_348,
    1_244_819,
];

fn pack_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack raw splats");
    for count in SPLAT_COUNTS.iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(
            BenchmarkId::new("pack_all", count),
            &count,
            |b, &count| {
                let buffer = random_raw_buffer(*count);

                b.iter(|| pack_all(RawLayout::FULL, &buffer));
            },
        );
    }
}

fn sort_benchmark(c: &mut Criterion) {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 30.0), Vec3::ZERO, Vec3::Y);
    let projection = Mat4::perspective_rh_gl(FRAC_PI_2, 16.0 / 9.0, 0.1, 100.0);

    let mut group = c.benchmark_group("visibility sort");
    for count in SPLAT_COUNTS.iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(
            BenchmarkId::new("sort_now", count),
            &count,
            |b, &count| {
                let records = pack_all(RawLayout::FULL, &random_raw_buffer(*count));
                let mut sorter = VisibilitySorter::new(0.1, CullMargin::default());

                b.iter(|| sorter.sort_now(&records, &view, &projection));
            },
        );
    }
}

criterion_group!{
    name = sort_benches;
    config = Criterion::default().sample_size(10);
    targets = pack_benchmark, sort_benchmark
}
criterion_main!(sort_benches);
