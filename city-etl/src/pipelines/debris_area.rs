//! Zones à risque de coulées de débris (shapefile zippé, TWD97 / TM2)

use citygeo::normalize::unify_polygons;
use citygeo::{
    Dataset, FieldDef, FieldKind, GeometryType, NormalizeReport, Normalizer, Schema,
    CANONICAL_COLUMN,
};

use crate::error::Result;

/// Champs lus dans la table attributaire, publiés sous le même nom
const FIELDS: &[(&str, FieldKind)] = &[
    ("id", FieldKind::Text),
    ("debrisno", FieldKind::Text),
    ("county", FieldKind::Text),
    ("town", FieldKind::Text),
    ("vill", FieldKind::Text),
    ("overflowno", FieldKind::Text),
    ("overflow_x", FieldKind::Float),
    ("overflow_y", FieldKind::Float),
    ("address", FieldKind::Text),
    ("total_res", FieldKind::Integer),
    ("res_class", FieldKind::Text),
    ("risk", FieldKind::Text),
    ("dbno_old", FieldKind::Text),
];

pub fn source_fields() -> Vec<FieldDef> {
    FIELDS
        .iter()
        .map(|(name, kind)| FieldDef::new(name, *kind))
        .collect()
}

/// Colonnes publiées, dans l'ordre
pub fn ready_schema() -> citygeo::Result<Schema> {
    let mut fields = source_fields();
    fields.push(FieldDef::new(
        CANONICAL_COLUMN,
        FieldKind::Geometry(GeometryType::MultiPolygon),
    ));
    Schema::new(fields)
}

/// Le dataset d'entrée porte `source_fields()` et la colonne brute `geometry`
pub fn transform(mut data: Dataset, from_crs: u32) -> Result<(Dataset, NormalizeReport)> {
    unify_polygons(&mut data)?;
    let normalizer = Normalizer::new(from_crs, GeometryType::MultiPolygon)?;
    let report = normalizer.canonicalize(&mut data)?;
    Ok((data.conform(&ready_schema()?)?, report))
}
