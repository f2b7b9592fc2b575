use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use imaging_eval::metrics::{
    calculate_case_map, calculate_iou, PixelOverlap, DEFAULT_IOU_THRESHOLDS,
};
use imaging_eval::types::BoundingBox;

fn grid_boxes(count: usize, spacing: i64) -> Vec<BoundingBox> {
    (0..count as i64)
        .map(|i| {
            let offset = i * spacing;
            BoundingBox::from_corners(offset, offset, offset + 49, offset + 49)
        })
        .collect()
}

fn bench_iou_calculation(c: &mut Criterion) {
    let bbox1 = BoundingBox::from_corners(10, 10, 59, 59);
    let bbox2 = BoundingBox::from_corners(30, 30, 79, 79);

    c.bench_function("iou_single", |b| {
        b.iter(|| calculate_iou(black_box(&bbox1), black_box(&bbox2)));
    });
}

fn bench_iou_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("iou_matrix");

    for size in [10, 50, 100, 500].iter() {
        let boxes = grid_boxes(*size, 2);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                for i in 0..boxes.len() {
                    for j in 0..boxes.len() {
                        black_box(calculate_iou(&boxes[i], &boxes[j]));
                    }
                }
            });
        });
    }
    group.finish();
}

fn bench_pixel_overlap(c: &mut Criterion) {
    let mut group = c.benchmark_group("pixel_overlap");

    for size in [1, 10, 50].iter() {
        let gts = grid_boxes(*size, 20);
        let preds = grid_boxes(*size, 22);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| PixelOverlap::measure(black_box(&gts), black_box(&preds)));
        });
    }
    group.finish();
}

fn bench_case_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("case_map");

    for cases in [10, 100, 1000].iter() {
        let gts = grid_boxes(5, 60);
        let preds = grid_boxes(6, 61);

        group.bench_with_input(BenchmarkId::from_parameter(cases), cases, |b, &cases| {
            b.iter(|| {
                let pairs = (0..cases).map(|_| (gts.as_slice(), preds.as_slice()));
                calculate_case_map(black_box(pairs), &DEFAULT_IOU_THRESHOLDS)
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_iou_calculation,
    bench_iou_matrix,
    bench_pixel_overlap,
    bench_case_map
);
criterion_main!(benches);
