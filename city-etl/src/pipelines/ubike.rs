//! Stations YouBike de Taipei et New Taipei (TDX)

use citygeo::{
    Dataset, FieldDef, FieldKind, GeometryType, NormalizeReport, Normalizer, Schema, Value,
    CANONICAL_COLUMN,
};
use serde_json::Value as Json;

use crate::error::Result;
use crate::fetch::{json_value, text_of, Record};

const NAME_PREFIX: &str = "YouBike2.0_";

/// Capacité retenue quand la source n'est pas numérique
const UNKNOWN_CAPACITY: i64 = -1;

/// Colonnes publiées, dans l'ordre
pub fn ready_schema() -> citygeo::Result<Schema> {
    Schema::new(vec![
        FieldDef::new("data_time", FieldKind::Timestamp),
        FieldDef::new("county", FieldKind::Text),
        FieldDef::new("station_uid", FieldKind::Text),
        FieldDef::new("station_id", FieldKind::Text),
        FieldDef::new("authority_id", FieldKind::Text),
        FieldDef::new("name", FieldKind::Text),
        FieldDef::new("service_type", FieldKind::Text),
        FieldDef::new("bike_capacity", FieldKind::Integer),
        FieldDef::new("addr", FieldKind::Text),
        FieldDef::new("lng", FieldKind::Float),
        FieldDef::new("lat", FieldKind::Float),
        FieldDef::new(CANONICAL_COLUMN, FieldKind::Geometry(GeometryType::Point)),
        FieldDef::new("tdx_update_time", FieldKind::Timestamp),
    ])
}

/// Code de service TDX -> libellé
pub fn service_type_name(code: &Json) -> Option<&'static str> {
    let code = match code {
        Json::Number(n) => n.as_i64()?,
        Json::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    match code {
        1 => Some("UBike1.0"),
        2 => Some("UBike2.0"),
        3 => Some("TBike"),
        4 => Some("PBike"),
        5 => Some("KBike"),
        _ => None,
    }
}

fn capacity(raw: Option<&Json>) -> i64 {
    match raw.map(|v| json_value(v, FieldKind::Float)) {
        Some(Value::Float(f)) => f as i64,
        _ => UNKNOWN_CAPACITY,
    }
}

fn station_row(county: &str, record: &Record) -> Vec<(&'static str, Value)> {
    let zh = |key: &str| text_of(record.get(key).and_then(|v| v.get("Zh_tw")));
    let name = match zh("StationName") {
        Value::Text(s) => Value::Text(s.replace(NAME_PREFIX, "")),
        other => other,
    };
    let position = record.get("StationPosition");
    let coord = |key: &str| {
        position
            .and_then(|p| p.get(key))
            .map_or(Value::Null, |v| json_value(v, FieldKind::Float))
    };
    let time = |key: &str| {
        record
            .get(key)
            .map_or(Value::Null, |v| json_value(v, FieldKind::Timestamp))
    };

    vec![
        ("data_time", time("SrcUpdateTime")),
        ("county", Value::from(county)),
        ("station_uid", text_of(record.get("StationUID"))),
        ("station_id", text_of(record.get("StationID"))),
        ("authority_id", text_of(record.get("AuthorityID"))),
        ("name", name),
        (
            "service_type",
            record
                .get("ServiceType")
                .and_then(service_type_name)
                .map_or(Value::Null, Value::from),
        ),
        ("bike_capacity", Value::Integer(capacity(record.get("BikesCapacity")))),
        ("addr", zh("StationAddress")),
        ("lng", coord("PositionLon")),
        ("lat", coord("PositionLat")),
        ("tdx_update_time", time("UpdateTime")),
    ]
}

/// Fusionne les stations de chaque ville puis construit les points
///
/// Les colonnes lng / lat gardent les valeurs sources.
pub fn transform(
    counties: &[(String, Vec<Record>)],
    from_crs: u32,
) -> Result<(Dataset, NormalizeReport)> {
    let mut data = Dataset::new(ready_schema()?);
    for (county, records) in counties {
        for record in records {
            data.push_named(station_row(county, record))?;
        }
    }

    let normalizer = Normalizer::new(from_crs, GeometryType::Point)?;
    let report = normalizer.points_from_xy(&mut data, "lng", "lat", false)?;
    Ok((data, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn station(uid: &str, capacity: Json, service: Json) -> Record {
        json!({
            "StationUID": uid,
            "StationID": "500101001",
            "AuthorityID": "TPE",
            "StationName": {"Zh_tw": "YouBike2.0_捷運科技大樓站", "En": "MRT Technology Bldg."},
            "StationPosition": {"PositionLon": 121.5436, "PositionLat": 25.02605, "GeoHash": "wsqqmpvx8"},
            "StationAddress": {"Zh_tw": "復興南路二段235號前"},
            "BikesCapacity": capacity,
            "ServiceType": service,
            "SrcUpdateTime": "2024-05-12T10:30:00+08:00",
            "UpdateTime": "2024-05-12T10:31:05+08:00"
        })
        .as_object()
        .cloned()
        .unwrap_or_default()
    }

    #[test]
    fn test_service_type_map() {
        assert_eq!(service_type_name(&json!(2)), Some("UBike2.0"));
        assert_eq!(service_type_name(&json!("5")), Some("KBike"));
        assert_eq!(service_type_name(&json!(9)), None);
    }

    #[test]
    fn test_transform() {
        let counties = vec![
            ("Taipei".to_string(), vec![station("TPE500101001", json!(28), json!(2))]),
            ("New Taipei".to_string(), vec![station("NWT1", json!("n/a"), json!(1))]),
        ];
        let (data, report) = transform(&counties, 4326).unwrap();

        assert_eq!(data.schema(), &ready_schema().unwrap());
        assert_eq!(data.len(), 2);
        assert_eq!(report.encoded, 2);
        assert_eq!(data.value(0, "name"), Some(&Value::from("捷運科技大樓站")));
        assert_eq!(data.value(0, "service_type"), Some(&Value::from("UBike2.0")));
        assert_eq!(data.value(0, "bike_capacity"), Some(&Value::Integer(28)));
        assert_eq!(data.value(1, "bike_capacity"), Some(&Value::Integer(-1)));
        assert_eq!(data.value(1, "county"), Some(&Value::from("New Taipei")));
        assert_eq!(data.value(0, "lng"), Some(&Value::Float(121.5436)));
        assert!(matches!(data.value(1, "tdx_update_time"), Some(Value::Timestamp(_))));
    }
}
