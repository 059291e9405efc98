//! Hôpitaux de Taipei (data.taipei, points WGS84)

use chrono::{DateTime, FixedOffset};
use citygeo::{
    Dataset, FieldDef, FieldKind, GeometryType, NormalizeReport, Normalizer, Schema, Value,
    CANONICAL_COLUMN,
};

use crate::error::Result;
use crate::fetch::{json_value, Record};

/// Colonnes publiées, dans l'ordre
pub fn ready_schema() -> citygeo::Result<Schema> {
    Schema::new(vec![
        FieldDef::new("data_time", FieldKind::Timestamp),
        FieldDef::new("name", FieldKind::Text),
        FieldDef::new("addr", FieldKind::Text),
        FieldDef::new("lng", FieldKind::Float),
        FieldDef::new("lat", FieldKind::Float),
        FieldDef::new(CANONICAL_COLUMN, FieldKind::Geometry(GeometryType::Point)),
    ])
}

/// Champs source -> colonne, type
const SOURCE_FIELDS: &[(&str, &str, FieldKind)] = &[
    ("機構名稱", "name", FieldKind::Text),
    ("地址", "addr", FieldKind::Text),
    ("x", "lng", FieldKind::Text),
    ("y", "lat", FieldKind::Text),
];

pub fn transform(
    records: &[Record],
    data_time: Option<DateTime<FixedOffset>>,
    from_crs: u32,
) -> Result<(Dataset, NormalizeReport)> {
    let mut fields: Vec<FieldDef> = SOURCE_FIELDS
        .iter()
        .map(|(_, column, kind)| FieldDef::new(column, *kind))
        .collect();
    fields.push(FieldDef::new("data_time", FieldKind::Timestamp));
    let mut data = Dataset::new(Schema::new(fields)?);

    for record in records {
        let mut row: Vec<Value> = SOURCE_FIELDS
            .iter()
            .map(|(source, _, kind)| {
                find_key(record, source).map_or(Value::Null, |v| json_value(v, *kind))
            })
            .collect();
        row.push(data_time.into());
        data.push(row)?;
    }

    let normalizer = Normalizer::new(from_crs, GeometryType::Point)?;
    let report = normalizer.points_from_xy(&mut data, "lng", "lat", true)?;
    Ok((data.conform(&ready_schema()?)?, report))
}

/// Clé insensible à la casse
fn find_key<'r>(record: &'r Record, key: &str) -> Option<&'r serde_json::Value> {
    record
        .iter()
        .find(|(k, _)| k.to_lowercase() == key.to_lowercase())
        .map(|(_, v)| v)
}
