//! Export d'un dataset normalisé en GeoJSON (sans base de données)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use citygeo::{Dataset, Value, CANONICAL_COLUMN, TARGET_SRID};
use geozero::geojson::GeoJsonWriter;
use geozero::wkb::Ewkb;
use geozero::GeozeroGeometry;
use serde_json::{Map, Value as Json};

/// Exporte un dataset en FeatureCollection
///
/// La colonne `wkb_geometry` devient la géométrie de chaque feature ; les
/// autres colonnes deviennent ses propriétés.
pub fn export_to_geojson(dataset: &Dataset, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    write_feature_collection(&mut writer, dataset)?;
    writer.flush()?;
    Ok(())
}

pub fn write_feature_collection<W: Write>(writer: &mut W, dataset: &Dataset) -> Result<()> {
    write!(
        writer,
        r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::{}"}}}},"features":["#,
        TARGET_SRID
    )?;

    let names: Vec<&str> = dataset.schema().names().collect();
    for (i, row) in dataset.rows().iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(writer, &names, row)?;
    }

    write!(writer, "]}}")?;
    Ok(())
}

fn write_feature<W: Write>(writer: &mut W, names: &[&str], row: &[Value]) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","geometry":"#)?;

    let mut properties = Map::new();
    let mut geometry_written = false;
    for (name, value) in names.iter().zip(row) {
        match value {
            Value::Geometry(g) if *name == CANONICAL_COLUMN => {
                let mut geom_buf = Vec::new();
                let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
                Ewkb(&g.ewkb).process_geom(&mut geom_writer)?;
                writer.write_all(&geom_buf)?;
                geometry_written = true;
            }
            _ if *name == CANONICAL_COLUMN => {}
            other => {
                properties.insert(name.to_string(), property(other));
            }
        }
    }
    if !geometry_written {
        write!(writer, "null")?;
    }

    write!(writer, r#","properties":"#)?;
    serde_json::to_writer(&mut *writer, &properties)?;
    write!(writer, "}}")?;
    Ok(())
}

fn property(value: &Value) -> Json {
    match value {
        Value::Null | Value::Shape(_) => Json::Null,
        Value::Text(s) => Json::String(s.clone()),
        Value::Integer(v) => Json::from(*v),
        Value::Float(v) => serde_json::Number::from_f64(*v).map_or(Json::Null, Json::Number),
        Value::Boolean(v) => Json::Bool(*v),
        Value::Timestamp(t) => Json::String(t.to_rfc3339()),
        Value::Geometry(g) => Json::String(g.to_hex()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citygeo::{encode, Coord, FieldDef, FieldKind, GeometryType, Schema, Shape};

    fn dataset() -> Dataset {
        let mut ds = Dataset::new(
            Schema::new(vec![
                FieldDef::new("name", FieldKind::Text),
                FieldDef::new("bike_capacity", FieldKind::Integer),
                FieldDef::new(CANONICAL_COLUMN, FieldKind::Geometry(GeometryType::Point)),
            ])
            .unwrap(),
        );
        let geom = encode(
            &Shape::Point(Coord::xy(121.5, 25.0)),
            GeometryType::Point,
            4326,
        )
        .unwrap();
        ds.push(vec![Value::from("捷運\"站\""), Value::Integer(20), Value::Geometry(geom)])
            .unwrap();
        ds.push(vec![Value::from("b"), Value::Null, Value::Null]).unwrap();
        ds
    }

    #[test]
    fn test_feature_collection_is_valid_geojson() {
        let mut buf = Vec::new();
        write_feature_collection(&mut buf, &dataset()).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let parsed: geojson::GeoJson = text.parse().unwrap();
        let collection = geojson::FeatureCollection::try_from(parsed).unwrap();
        assert_eq!(collection.features.len(), 2);

        let first = &collection.features[0];
        assert_eq!(
            first.geometry.as_ref().map(|g| g.value.clone()),
            Some(geojson::Value::Point(vec![121.5, 25.0]))
        );
        assert_eq!(first.property("name"), Some(&Json::from("捷運\"站\"")));
        assert_eq!(first.property("bike_capacity"), Some(&Json::from(20)));
        assert!(first.property(CANONICAL_COLUMN).is_none());
        assert!(collection.features[1].geometry.is_none());
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");
        export_to_geojson(&dataset(), &path).unwrap();
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .starts_with(r#"{"type":"FeatureCollection""#));
    }
}
