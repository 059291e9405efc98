//! Scénarios de chargement contre le puits en mémoire

use citygeo::{
    encode, Coord, Dataset, FieldDef, FieldKind, GeometryType, Schema, Shape, Value,
    CANONICAL_COLUMN,
};
use city_etl::load::{MemoryTable, WritePlan};
use city_etl::{
    save_dataset, save_geo_dataset, ConfigError, EtlError, LoadDirective, MemorySink, Sink,
    SinkError,
};

fn stations(names: &[&str]) -> Dataset {
    let mut ds = Dataset::new(
        Schema::new(vec![
            FieldDef::new("name", FieldKind::Text),
            FieldDef::new(CANONICAL_COLUMN, FieldKind::Geometry(GeometryType::Point)),
        ])
        .unwrap(),
    );
    for (i, name) in names.iter().enumerate() {
        let geom = encode(
            &Shape::Point(Coord::xy(121.5 + i as f64 * 0.01, 25.0)),
            GeometryType::Point,
            4326,
        )
        .unwrap();
        ds.push(vec![Value::from(*name), Value::Geometry(geom)]).unwrap();
    }
    ds
}

fn names(sink: &MemorySink, table: &str) -> Vec<String> {
    sink.table(table)
        .and_then(|t| t.column("name"))
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect()
}

async fn seeded(current: &[&str], history: &[&str]) -> MemorySink {
    let mut sink = MemorySink::new();
    let seed = LoadDirective::new("append", "cur").with_geometry_type("Point");
    save_geo_dataset(&mut sink, &stations(current), &seed).await.unwrap();
    let seed = LoadDirective::new("append", "hist").with_geometry_type("Point");
    save_geo_dataset(&mut sink, &stations(history), &seed).await.unwrap();
    sink
}

#[tokio::test]
async fn replace_swaps_current_rows() {
    let mut sink = seeded(&["a", "b", "c"], &[]).await;
    assert_eq!(sink.row_count("cur"), 3);

    let directive = LoadDirective::new("replace", "cur").with_geometry_type("Point");
    let report = save_geo_dataset(&mut sink, &stations(&["d", "e"]), &directive)
        .await
        .unwrap();

    assert_eq!(report.rows_written, 2);
    assert_eq!(names(&sink, "cur"), vec!["d", "e"]);
}

#[tokio::test]
async fn current_history_appends_history() {
    let mut sink = seeded(&["a", "b", "c"], &["x", "y", "z", "w"]).await;

    let directive = LoadDirective::new("current+history", "cur")
        .with_history("hist")
        .with_geometry_type("Point");
    let report = save_geo_dataset(&mut sink, &stations(&["d", "e"]), &directive)
        .await
        .unwrap();

    assert_eq!(report.tables, vec!["cur".to_string(), "hist".to_string()]);
    assert_eq!(report.rows_written, 4);
    assert_eq!(sink.row_count("cur"), 2);
    assert_eq!(sink.row_count("hist"), 6);
    assert_eq!(names(&sink, "hist")[4..], ["d".to_string(), "e".to_string()]);
}

#[tokio::test]
async fn append_keeps_existing_rows() {
    let mut sink = seeded(&["a"], &[]).await;
    let directive = LoadDirective::new("append", "cur").with_geometry_type("Point");
    save_geo_dataset(&mut sink, &stations(&["b"]), &directive)
        .await
        .unwrap();
    assert_eq!(names(&sink, "cur"), vec!["a", "b"]);
    assert_eq!(sink.row_count("hist"), 0);
}

#[tokio::test]
async fn unknown_geometry_type_rejected_before_write() {
    let mut sink = MemorySink::new();
    let directive = LoadDirective::new("replace", "cur").with_geometry_type("Circle");
    let err = save_geo_dataset(&mut sink, &stations(&["a"]), &directive)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EtlError::Config(ConfigError::InvalidGeometryType(ref t)) if t == "Circle"
    ));
    assert_eq!(sink.executions(), 0);
}

#[tokio::test]
async fn empty_history_table_rejected_before_write() {
    let mut sink = seeded(&["a"], &[]).await;
    let before = sink.executions();
    let directive = LoadDirective::new("current+history", "cur")
        .with_history("")
        .with_geometry_type("Point");
    let err = save_geo_dataset(&mut sink, &stations(&["b"]), &directive)
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::Config(ConfigError::MissingHistoryTable)));
    assert_eq!(sink.executions(), before);
    assert_eq!(names(&sink, "cur"), vec!["a"]);
}

#[tokio::test]
async fn unknown_load_behavior_rejected() {
    let mut sink = MemorySink::new();
    let directive = LoadDirective::new("upsert", "cur").with_geometry_type("Point");
    let err = save_geo_dataset(&mut sink, &stations(&["a"]), &directive)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EtlError::Config(ConfigError::UnknownLoadBehavior(_))
    ));
    assert_eq!(sink.executions(), 0);
}

#[tokio::test]
async fn mismatched_row_geometry_rejected() {
    let mut ds = stations(&["a"]);
    let line = encode(
        &Shape::LineString(vec![Coord::xy(121.5, 25.0), Coord::xy(121.6, 25.1)]),
        GeometryType::LineString,
        4326,
    )
    .unwrap();
    ds.push(vec![Value::from("b"), Value::Geometry(line)]).unwrap();

    let mut sink = MemorySink::new();
    let directive = LoadDirective::new("append", "cur").with_geometry_type("Point");
    let err = save_geo_dataset(&mut sink, &ds, &directive).await.unwrap_err();
    assert!(matches!(
        err,
        EtlError::Config(ConfigError::GeometryTypeMismatch { row: 1, .. })
    ));
}

#[tokio::test]
async fn plain_save_without_geometry() {
    let mut ds = Dataset::new(
        Schema::new(vec![
            FieldDef::new("county", FieldKind::Text),
            FieldDef::new("stations", FieldKind::Integer),
        ])
        .unwrap(),
    );
    ds.push(vec![Value::from("Taipei"), Value::Integer(1500)])
        .unwrap();

    let mut sink = MemorySink::new();
    save_dataset(&mut sink, &ds, &LoadDirective::new("replace", "stats"))
        .await
        .unwrap();
    assert_eq!(sink.row_count("stats"), 1);

    let err = save_dataset(&mut sink, &stations(&["a"]), &LoadDirective::new("append", "cur"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EtlError::Config(ConfigError::GeometryOnPlainPath(_))
    ));
}

#[tokio::test]
async fn failed_history_insert_leaves_tables_untouched() {
    let mut sink = seeded(&["a", "b", "c"], &["x"]).await;
    sink.fail_on_insert("hist");

    let directive = LoadDirective::new("current+history", "cur")
        .with_history("hist")
        .with_geometry_type("Point");
    let err = save_geo_dataset(&mut sink, &stations(&["d"]), &directive)
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::Load(SinkError::Failed(_))));
    assert_eq!(names(&sink, "cur"), vec!["a", "b", "c"]);
    assert_eq!(names(&sink, "hist"), vec!["x"]);
}

#[tokio::test]
async fn sink_rejects_unknown_column() {
    let mut sink = MemorySink::new().with_table("cur", MemoryTable::default());
    let ds = stations(&["a"]);
    let directive = LoadDirective::new("append", "cur").validate().unwrap();
    let plan = WritePlan::build(&directive, &ds);

    let err = sink.execute(&plan).await.unwrap_err();
    assert!(matches!(err, SinkError::UnknownColumn { .. }));
    assert_eq!(sink.row_count("cur"), 0);
}
