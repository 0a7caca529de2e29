use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fpid_core::{ExtractorConfig, Image};
use fpid_fast::preprocessing::ImagePreprocessing;
use fpid_fast::refinement::KeypointRefinement;
use fpid_fast::FastDetector;

/// Ridge-like benchmark image: oriented sinusoid with a few breaks
fn create_ridge_image(width: usize, height: usize) -> Image {
    Image::from_fn(width, height, |x, y| {
        let (fx, fy) = (x as f32, y as f32);
        let phase = (fx * 0.8 + fy * 0.6) * 0.55 + ((fx - fy) * 0.05).sin() * 2.0;
        let broken = (x / 23 + y / 31) % 5 == 0;
        let v = if broken { 0.0 } else { phase.sin() };
        (128.0 + v * 100.0) as u8
    })
}

fn create_test_config() -> ExtractorConfig {
    ExtractorConfig {
        clahe_preprocessing: false,
        ..ExtractorConfig::default()
    }
}

/// Benchmark full detection pipeline
fn bench_full_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_detection");
    let detector = FastDetector::new(create_test_config()).unwrap();

    for &(width, height) in &[(96, 103), (192, 206), (288, 309)] {
        let img = create_ridge_image(width, height);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", width, height)),
            &img,
            |b, img| b.iter(|| black_box(detector.detect_keypoints(black_box(img)).unwrap())),
        );
    }

    group.finish();
}

/// Benchmark individual pipeline stages
fn bench_pipeline_stages(c: &mut Criterion) {
    let detector = FastDetector::new(create_test_config()).unwrap();
    let img = create_ridge_image(192, 206);
    let mut group = c.benchmark_group("pipeline_stages");

    group.bench_function("clahe", |b| {
        b.iter(|| black_box(ImagePreprocessing::apply_clahe(black_box(&img))))
    });

    group.bench_function("segment_test", |b| {
        b.iter(|| black_box(detector.detect_corners(black_box(&img)).unwrap()))
    });

    let corners = detector.detect_corners(&img).unwrap();
    group.bench_function("non_maximum_suppression", |b| {
        b.iter(|| black_box(KeypointRefinement::non_maximum_suppression(black_box(&corners), 3.0)))
    });

    group.finish();
}

criterion_group!(benches, bench_full_detection, bench_pipeline_stages);
criterion_main!(benches);
