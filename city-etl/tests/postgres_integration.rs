//! Tests d'intégration PostgreSQL/PostGIS
//!
//! Ces tests nécessitent une base PostGIS disponible.
//! Configuration via variables d'environnement:
//! - PGHOST, PGPORT, PGUSER, PGPASSWORD, PGDATABASE
//!
//! Exécution:
//! ```bash
//! docker run -d --name postgis-test -e POSTGRES_PASSWORD=test -p 5433:5432 postgis/postgis
//! PGPASSWORD=test cargo test --test postgres_integration -- --ignored
//! ```

use anyhow::Result;
use citygeo::{
    encode, Coord, Dataset, FieldDef, FieldKind, GeometryType, Schema, Shape, Value,
    CANONICAL_COLUMN,
};
use city_etl::load::test_connection;
use city_etl::{create_pool, save_geo_dataset, DatabaseConfig, LoadDirective, PostgresSink};
use deadpool_postgres::Pool;

async fn setup(tables: &[&str]) -> Result<Pool> {
    let pool = create_pool(&DatabaseConfig::from_env()?)?;
    test_connection(&pool).await?;
    let client = pool.get().await?;
    client
        .batch_execute("CREATE EXTENSION IF NOT EXISTS postgis")
        .await?;
    for table in tables {
        client
            .batch_execute(&format!("DROP TABLE IF EXISTS {table}"))
            .await?;
    }
    Ok(pool)
}

fn hospitals(names: &[&str]) -> Dataset {
    let mut ds = Dataset::new(
        Schema::new(vec![
            FieldDef::new("name", FieldKind::Text),
            FieldDef::new("lng", FieldKind::Float),
            FieldDef::new(CANONICAL_COLUMN, FieldKind::Geometry(GeometryType::Point)),
        ])
        .unwrap(),
    );
    for name in names {
        let geom = encode(
            &Shape::Point(Coord::xy(121.519, 25.040)),
            GeometryType::Point,
            4326,
        )
        .unwrap();
        ds.push(vec![Value::from(*name), Value::Float(121.519), Value::Geometry(geom)])
            .unwrap();
    }
    ds.push(vec![Value::from("sans géométrie"), Value::Null, Value::Null])
        .unwrap();
    ds
}

async fn count(pool: &Pool, table: &str) -> Result<i64> {
    let client = pool.get().await?;
    let row = client
        .query_one(&format!("SELECT count(*) FROM {table}"), &[])
        .await?;
    Ok(row.get(0))
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_current_history_roundtrip() -> Result<()> {
    let pool = setup(&["it_hospital", "it_hospital_history"]).await?;
    let mut sink = PostgresSink::new(pool.clone());
    let directive = LoadDirective::new("current+history", "it_hospital")
        .with_history("it_hospital_history")
        .with_geometry_type("Point");

    save_geo_dataset(&mut sink, &hospitals(&["a", "b"]), &directive).await?;
    save_geo_dataset(&mut sink, &hospitals(&["c"]), &directive).await?;

    assert_eq!(count(&pool, "it_hospital").await?, 2);
    assert_eq!(count(&pool, "it_hospital_history").await?, 5);

    let client = pool.get().await?;
    let row = client
        .query_one(
            "SELECT ST_SRID(wkb_geometry), GeometryType(wkb_geometry), ST_X(wkb_geometry) \
             FROM it_hospital WHERE wkb_geometry IS NOT NULL",
            &[],
        )
        .await?;
    let srid: i32 = row.get(0);
    let kind: String = row.get(1);
    let x: f64 = row.get(2);
    assert_eq!(srid, 4326);
    assert_eq!(kind, "POINT");
    assert!((x - 121.519).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_failed_copy_rolls_back_truncate() -> Result<()> {
    let pool = setup(&["it_rollback"]).await?;
    let mut sink = PostgresSink::new(pool.clone());
    let directive = LoadDirective::new("replace", "it_rollback").with_geometry_type("Point");
    save_geo_dataset(&mut sink, &hospitals(&["a", "b"]), &directive).await?;

    // colonne inconnue de la table : le COPY échoue après le TRUNCATE
    let mut ds = hospitals(&["c"]);
    ds.set_column(
        FieldDef::new("extra", FieldKind::Integer),
        vec![Value::Integer(1); ds.len()],
    )?;
    assert!(save_geo_dataset(&mut sink, &ds, &directive).await.is_err());

    assert_eq!(count(&pool, "it_rollback").await?, 3);
    Ok(())
}
