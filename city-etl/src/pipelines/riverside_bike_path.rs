//! Pistes cyclables des berges (KML data.taipei, lignes 3D WGS84)
//!
//! Le numéro, la longueur et la durée de parcours sont extraits du texte
//! HTML de la description de chaque placemark.

use chrono::{DateTime, FixedOffset};
use citygeo::normalize::unify_lines;
use citygeo::{
    Dataset, FieldDef, FieldKind, GeometryType, NormalizeReport, Normalizer, Schema, Value,
    CANONICAL_COLUMN,
};
use regex::Regex;

use crate::error::Result;

/// Durée de parcours en minutes, ex. `（約12分鐘）`
const COST_TIME_PATTERN: &str = "（約(.*?)分鐘）";

/// Colonnes publiées, dans l'ordre
pub fn ready_schema() -> citygeo::Result<Schema> {
    Schema::new(vec![
        FieldDef::new("data_time", FieldKind::Timestamp),
        FieldDef::new("item", FieldKind::Integer),
        FieldDef::new("route", FieldKind::Text),
        FieldDef::new("name", FieldKind::Text),
        FieldDef::new("length", FieldKind::Float),
        FieldDef::new("cost_time", FieldKind::Float),
        FieldDef::new("description", FieldKind::Text),
        FieldDef::new(
            CANONICAL_COLUMN,
            FieldKind::Geometry(GeometryType::MultiLineStringZ),
        ),
    ])
}

/// Texte entre `marker` et le `<br>` suivant
fn between<'a>(description: &'a str, marker: &str) -> Option<&'a str> {
    let (_, rest) = description.split_once(marker)?;
    Some(rest.split("<br>").next().unwrap_or(rest).trim())
}

/// Le dataset d'entrée porte `name`, `description` et la colonne brute `geometry`
pub fn transform(
    mut data: Dataset,
    data_time: Option<DateTime<FixedOffset>>,
    from_crs: u32,
) -> Result<(Dataset, NormalizeReport)> {
    let cost_time = Regex::new(COST_TIME_PATTERN)?;

    let descriptions: Vec<Option<String>> = data
        .column("description")?
        .map(|v| v.as_str().map(str::to_string))
        .collect();
    let parse = |marker: &str, kind: FieldKind| -> Vec<Value> {
        descriptions
            .iter()
            .map(|d| {
                let text = d.as_deref().and_then(|d| between(d, marker));
                match kind {
                    FieldKind::Integer => Value::from(text.and_then(|t| t.parse::<i64>().ok())),
                    _ => Value::from(text.and_then(|t| t.parse::<f64>().ok())),
                }
            })
            .collect()
    };
    let items = parse("fid:", FieldKind::Integer);
    let lengths = parse("length(M):", FieldKind::Float);
    let cost_times: Vec<Value> = descriptions
        .iter()
        .map(|d| {
            let minutes = d
                .as_deref()
                .and_then(|d| cost_time.captures(d))
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().trim().parse::<f64>().ok());
            Value::from(minutes)
        })
        .collect();

    let rows = data.len();
    data.set_column(FieldDef::new("item", FieldKind::Integer), items)?;
    data.set_column(
        FieldDef::new("route", FieldKind::Text),
        vec![Value::from(""); rows],
    )?;
    data.set_column(FieldDef::new("length", FieldKind::Float), lengths)?;
    data.set_column(FieldDef::new("cost_time", FieldKind::Float), cost_times)?;
    data.set_column(
        FieldDef::new("data_time", FieldKind::Timestamp),
        vec![Value::from(data_time); rows],
    )?;

    unify_lines(&mut data)?;
    let normalizer = Normalizer::new(from_crs, GeometryType::MultiLineStringZ)?;
    let report = normalizer.canonicalize(&mut data)?;
    Ok((data.conform(&ready_schema()?)?, report))
}
