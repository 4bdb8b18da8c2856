use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::{Matrix3, Point2};
use planar_locate_core::{
    estimate_homography, estimate_homography_ransac, Homography, PointCorrespondence,
    RansacParams,
};

fn scene_correspondences(outlier_every: usize) -> Vec<PointCorrespondence> {
    let h = Homography::new(Matrix3::new(
        1.1, 0.2, 35.0, //
        -0.15, 0.95, 60.0, //
        0.0003, 0.0002, 1.0,
    ));
    (0..200)
        .map(|i| {
            let p = Point2::new((i % 20) as f32 * 17.0, (i / 20) as f32 * 23.0);
            let mut q = h.apply(p);
            if outlier_every > 0 && i % outlier_every == 0 {
                q.x += 80.0 + (i % 7) as f32 * 11.0;
                q.y -= 50.0;
            }
            PointCorrespondence::new(p, q)
        })
        .collect()
}

fn homography_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("homography");

    let clean = scene_correspondences(0);
    let (src, dst): (Vec<_>, Vec<_>) = clean.iter().map(|c| (c.source, c.target)).unzip();
    group.bench_function("dlt_200", |b| {
        b.iter(|| estimate_homography(black_box(&src), black_box(&dst)))
    });

    let noisy = scene_correspondences(3);
    let params = RansacParams::default();
    group.bench_function("ransac_200_third_outliers", |b| {
        b.iter(|| estimate_homography_ransac(black_box(&noisy), &params))
    });

    group.finish();
}

criterion_group!(benches, homography_benchmark);
criterion_main!(benches);
