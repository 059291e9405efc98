//! Permis de construire de Taipei (XML data.taipei, sans géométrie)

use chrono::{DateTime, FixedOffset};
use citygeo::{Dataset, FieldDef, FieldKind, Schema, Value};

use crate::error::Result;
use crate::fetch::permit_xml::{ADDRESS_TAG, LAND_UNITS_TAG};
use crate::fetch::{json_value, Record};
use crate::time::parse_roc_timestamp;

const ISSUE_DATE_TAG: &str = "發照日期";

/// Balise source -> colonne, type
const SOURCE_FIELDS: &[(&str, &str, FieldKind)] = &[
    ("執照號碼", "permit_no", FieldKind::Text),
    ("起造人", "owner", FieldKind::Text),
    ("設計人", "designer", FieldKind::Text),
    (ADDRESS_TAG, "address", FieldKind::Text),
    (LAND_UNITS_TAG, "land_lot", FieldKind::Text),
    ("使用分區", "zoning", FieldKind::Text),
    ("地上層數", "floors_above", FieldKind::Integer),
    ("地下層數", "floors_below", FieldKind::Integer),
    ("棟數", "buildings", FieldKind::Integer),
    ("基地面積", "site_area", FieldKind::Float),
    ("總樓地板面積", "floor_area", FieldKind::Float),
];

/// Colonnes publiées, dans l'ordre
pub fn ready_schema() -> citygeo::Result<Schema> {
    let mut fields = vec![
        FieldDef::new("data_time", FieldKind::Timestamp),
        FieldDef::new("issue_date", FieldKind::Timestamp),
        FieldDef::new("epoch_time", FieldKind::Float),
    ];
    fields.extend(
        SOURCE_FIELDS
            .iter()
            .map(|(_, column, kind)| FieldDef::new(column, *kind)),
    );
    Schema::new(fields)
}

/// Un enregistrement par parcelle ; la date de délivrance est au calendrier ROC
pub fn transform(records: &[Record], data_time: Option<DateTime<FixedOffset>>) -> Result<Dataset> {
    let mut data = Dataset::new(ready_schema()?);

    for record in records {
        let issue_date = record
            .get(ISSUE_DATE_TAG)
            .and_then(|v| v.as_str())
            .and_then(parse_roc_timestamp);
        let epoch_time = issue_date.map(|d| d.timestamp() as f64);

        let mut row: Vec<Value> = vec![data_time.into(), issue_date.into(), epoch_time.into()];
        row.extend(SOURCE_FIELDS.iter().map(|(tag, _, kind)| {
            record
                .get(*tag)
                .map_or(Value::Null, |v| json_value(v, *kind))
        }));
        data.push(row)?;
    }
    Ok(data)
}
