//! Benchmarks de la normalisation (reprojection TWD97 + encodage EWKB)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use citygeo::normalize::{reduce_polygons_to_2d, unify_polygons};
use citygeo::{Coord, Dataset, FieldDef, FieldKind, GeometryType, Normalizer, Schema, Shape, Value};

fn polygon_dataset(rows: usize) -> Dataset {
    let schema = Schema::new(vec![
        FieldDef::new("id", FieldKind::Integer),
        FieldDef::new("geometry", FieldKind::Shape),
    ])
    .unwrap();
    let mut ds = Dataset::new(schema);
    for i in 0..rows {
        let x = 300000.0 + (i % 100) as f64 * 20.0;
        let y = 2770000.0 + (i / 100) as f64 * 20.0;
        let ring = vec![
            Coord::xyz(x, y, 5.0),
            Coord::xyz(x + 10.0, y, 5.0),
            Coord::xyz(x + 10.0, y + 10.0, 5.0),
            Coord::xyz(x, y + 10.0, 5.0),
            Coord::xyz(x, y, 5.0),
        ];
        ds.push(vec![
            Value::Integer(i as i64),
            Value::Shape(Shape::Polygon(vec![ring])),
        ])
        .unwrap();
    }
    ds
}

fn bench_canonicalize(c: &mut Criterion) {
    let normalizer = Normalizer::new(3826, GeometryType::MultiPolygon).unwrap();

    let mut group = c.benchmark_group("canonicalize");
    for rows in [1_000usize, 10_000] {
        let dataset = polygon_dataset(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &dataset, |b, ds| {
            b.iter(|| {
                let mut ds = ds.clone();
                unify_polygons(&mut ds).unwrap();
                reduce_polygons_to_2d(&mut ds).unwrap();
                let report = normalizer.canonicalize(black_box(&mut ds)).unwrap();
                black_box(report)
            })
        });
    }
    group.finish();
}

fn bench_points(c: &mut Criterion) {
    let schema = Schema::new(vec![
        FieldDef::new("x", FieldKind::Text),
        FieldDef::new("y", FieldKind::Text),
    ])
    .unwrap();
    let mut dataset = Dataset::new(schema);
    for i in 0..10_000 {
        dataset
            .push(vec![
                Value::Text(format!("{}", 250000.0 + i as f64)),
                Value::Text(format!("{}", 2770000.0 + i as f64)),
            ])
            .unwrap();
    }
    let normalizer = Normalizer::new(3826, GeometryType::Point).unwrap();

    c.bench_function("points_from_xy_10k", |b| {
        b.iter(|| {
            let mut ds = dataset.clone();
            black_box(normalizer.points_from_xy(&mut ds, "x", "y", true).unwrap())
        })
    });
}

criterion_group!(benches, bench_canonicalize, bench_points);
criterion_main!(benches);
