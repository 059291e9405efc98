//! Trottoirs de Taipei (GeoJSON en TWD97 / TM2, polygones 3D)

use chrono::{DateTime, FixedOffset, SubsecRound};
use citygeo::normalize::{reduce_polygons_to_2d, unify_polygons};
use citygeo::{
    Dataset, FieldDef, FieldKind, GeometryType, NormalizeReport, Normalizer, Schema, Value,
    CANONICAL_COLUMN,
};

use crate::error::Result;
use crate::time::now_taipei;

/// Champs lus dans les propriétés du GeoJSON
pub fn source_fields() -> Vec<FieldDef> {
    vec![
        FieldDef::new("objectid", FieldKind::Text),
        FieldDef::new("town_n", FieldKind::Text),
        FieldDef::new("name_road", FieldKind::Text),
        FieldDef::new("pstart", FieldKind::Text),
        FieldDef::new("pend", FieldKind::Text),
        FieldDef::new("sw_leng_itemvalue", FieldKind::Float),
        FieldDef::new("sw_wth_itemvalue", FieldKind::Float),
        FieldDef::new("shape_ar_itemvalue", FieldKind::Float),
    ]
}

const COLUMN_MAP: &[(&str, &str)] = &[
    ("objectid", "id"),
    ("town_n", "dist"),
    ("name_road", "name"),
    ("pstart", "start_road"),
    ("pend", "end_road"),
    ("sw_leng_itemvalue", "length"),
    ("sw_wth_itemvalue", "width"),
    ("shape_ar_itemvalue", "area"),
];

/// Colonnes publiées, dans l'ordre
pub fn ready_schema() -> citygeo::Result<Schema> {
    Schema::new(vec![
        FieldDef::new("data_time", FieldKind::Timestamp),
        FieldDef::new("id", FieldKind::Text),
        FieldDef::new("dist", FieldKind::Text),
        FieldDef::new("name", FieldKind::Text),
        FieldDef::new("start_road", FieldKind::Text),
        FieldDef::new("end_road", FieldKind::Text),
        FieldDef::new("length", FieldKind::Float),
        FieldDef::new("width", FieldKind::Float),
        FieldDef::new("area", FieldKind::Float),
        FieldDef::new(
            CANONICAL_COLUMN,
            FieldKind::Geometry(GeometryType::MultiPolygon),
        ),
    ])
}

/// Le dataset d'entrée porte `source_fields()` et la colonne brute `geometry`
///
/// Sans date de publication, `data_time` vaut l'heure d'extraction.
pub fn transform(
    mut data: Dataset,
    data_time: Option<DateTime<FixedOffset>>,
    from_crs: u32,
) -> Result<(Dataset, NormalizeReport)> {
    let data_time = data_time.unwrap_or_else(|| now_taipei().trunc_subsecs(0));
    let times = vec![Value::Timestamp(data_time); data.len()];
    data.set_column(FieldDef::new("data_time", FieldKind::Timestamp), times)?;

    unify_polygons(&mut data)?;
    reduce_polygons_to_2d(&mut data)?;
    let normalizer = Normalizer::new(from_crs, GeometryType::MultiPolygon)?;
    let report = normalizer.canonicalize(&mut data)?;

    data.rename_columns(COLUMN_MAP)?;
    Ok((data.conform(&ready_schema()?)?, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::parse_feature_collection;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"OBJECTID": 11, "Town_n": "大安區", "Name_road": "復興南路",
                               "SW_LENG_ItemValue": "120.5", "SW_WTH_ItemValue": 2.5},
                "geometry": {"type": "Polygon", "coordinates": [[
                    [304000, 2768000, 10], [304010, 2768000, 10],
                    [304010, 2768010, 10], [304000, 2768000, 10]
                ]]}
            },
            {
                "type": "Feature",
                "properties": {"OBJECTID": 12},
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn test_transform() {
        let raw = parse_feature_collection(SAMPLE, "sample", &source_fields()).unwrap();
        let (data, report) = transform(raw, None, 3826).unwrap();

        assert_eq!(data.schema(), &ready_schema().unwrap());
        assert_eq!(report.encoded, 1);
        assert_eq!(report.missing, 1);
        assert_eq!(data.value(0, "id"), Some(&Value::from("11")));
        assert_eq!(data.value(0, "length"), Some(&Value::Float(120.5)));
        assert_eq!(data.value(0, "area"), Some(&Value::Null));
        match data.value(0, CANONICAL_COLUMN) {
            Some(Value::Geometry(g)) => {
                assert_eq!(g.geometry_type, GeometryType::MultiPolygon);
                assert_eq!(g.srid, 4326);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(data.value(1, CANONICAL_COLUMN), Some(&Value::Null));
    }
}
